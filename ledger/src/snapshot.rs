//! Cluster snapshots — account state captured at a block boundary.
//!
//! Snapshots are what cross-cluster attestation validates against: a
//! trusted peer re-checks an outbound instruction's preconditions at the
//! referenced `height` without replaying the origin cluster's history. The
//! snapshot hash is computed deterministically from account state so any
//! holder can verify integrity.

use serde::{Deserialize, Serialize};

use lattice_crypto::blake2b_256_multi;
use lattice_store::AccountRecord;
use lattice_types::{AccountAddress, ClusterId, PublicKey, Timestamp};

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u32 = 1;

/// The state of one account captured in a snapshot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSnapshot {
    pub address: AccountAddress,
    pub public_key: PublicKey,
    pub balance: u128,
    pub nonce: u64,
}

impl From<&AccountRecord> for AccountSnapshot {
    fn from(record: &AccountRecord) -> Self {
        Self {
            address: record.address.clone(),
            public_key: record.public_key,
            balance: record.balance,
            nonce: record.nonce,
        }
    }
}

/// A point-in-time capture of all account state in a cluster.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClusterSnapshot {
    /// Blake2b-256 over cluster id, height, and account entries.
    pub hash: [u8; 32],
    pub cluster_id: ClusterId,
    /// Finalized block height this snapshot captures.
    pub height: u64,
    pub created_at: Timestamp,
    /// Entries ordered by address; ordering is part of the hash input.
    pub accounts: Vec<AccountSnapshot>,
    pub version: u32,
}

impl ClusterSnapshot {
    /// Build a snapshot from address-ordered account records.
    pub fn create(cluster_id: ClusterId, height: u64, accounts: Vec<AccountSnapshot>) -> Self {
        let mut snapshot = Self {
            hash: [0u8; 32],
            cluster_id,
            height,
            created_at: Timestamp::now(),
            accounts,
            version: SNAPSHOT_VERSION,
        };
        snapshot.hash = snapshot.compute_hash();
        snapshot
    }

    /// The deterministic hash: depends on cluster id, height, and account
    /// entries — not on `created_at`, so two nodes snapshotting the same
    /// state agree.
    fn compute_hash(&self) -> [u8; 32] {
        let mut parts: Vec<Vec<u8>> = Vec::with_capacity(self.accounts.len() * 4 + 2);
        parts.push(self.cluster_id.as_str().as_bytes().to_vec());
        parts.push(self.height.to_le_bytes().to_vec());
        for account in &self.accounts {
            parts.push(account.address.as_str().as_bytes().to_vec());
            parts.push(account.public_key.as_bytes().to_vec());
            parts.push(account.balance.to_le_bytes().to_vec());
            parts.push(account.nonce.to_le_bytes().to_vec());
        }
        let refs: Vec<&[u8]> = parts.iter().map(|p| p.as_slice()).collect();
        blake2b_256_multi(&refs)
    }

    /// Verify the stored hash against the account data.
    pub fn verify(&self) -> bool {
        self.hash == self.compute_hash()
    }

    /// Look up one account's captured state.
    pub fn account(&self, address: &AccountAddress) -> Option<&AccountSnapshot> {
        self.accounts.iter().find(|a| &a.address == address)
    }

    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }

    /// Serialize to bytes for storage or gossip.
    pub fn to_bytes(&self) -> Vec<u8> {
        bincode::serialize(self).expect("snapshot serialization cannot fail")
    }

    /// Deserialize from bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, crate::LedgerError> {
        bincode::deserialize(bytes).map_err(|e| crate::LedgerError::SnapshotDecode(e.to_string()))
    }
}
