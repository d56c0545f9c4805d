//! The `Ledger` — one cluster's view over its storage backend.

use std::sync::Arc;

use lattice_store::{
    AccountRecord, CommitBatch, CommittedInstruction, LedgerStore, StoreError,
};
use lattice_types::{AccountAddress, ClusterId, InstructionId};

use crate::snapshot::{AccountSnapshot, ClusterSnapshot};
use crate::LedgerError;

/// Summary statistics for a cluster's ledger.
#[derive(Clone, Debug)]
pub struct LedgerSummary {
    pub accounts: u64,
    pub instructions: u64,
    pub latest_snapshot_height: Option<u64>,
}

/// One cluster's authoritative state.
///
/// Cheap to clone and share; all mutation funnels through [`commit`], which
/// only the pipeline's Process stage calls.
///
/// [`commit`]: Ledger::commit
#[derive(Clone)]
pub struct Ledger {
    cluster_id: ClusterId,
    store: Arc<dyn LedgerStore>,
}

impl Ledger {
    pub fn new(cluster_id: ClusterId, store: Arc<dyn LedgerStore>) -> Self {
        Self { cluster_id, store }
    }

    pub fn cluster_id(&self) -> &ClusterId {
        &self.cluster_id
    }

    // ── Reads ───────────────────────────────────────────────────────────

    pub fn account(&self, address: &AccountAddress) -> Result<AccountRecord, StoreError> {
        self.store.get_account(address)
    }

    pub fn account_exists(&self, address: &AccountAddress) -> Result<bool, StoreError> {
        self.store.account_exists(address)
    }

    pub fn is_committed(&self, id: &InstructionId) -> Result<bool, StoreError> {
        self.store.is_committed(id)
    }

    pub fn committed_instruction(
        &self,
        id: &InstructionId,
    ) -> Result<CommittedInstruction, StoreError> {
        self.store.get_instruction(id)
    }

    pub fn account_log(&self, address: &AccountAddress) -> Result<Vec<InstructionId>, StoreError> {
        self.store.account_log(address)
    }

    pub fn summary(&self) -> Result<LedgerSummary, StoreError> {
        Ok(LedgerSummary {
            accounts: self.store.account_count()?,
            instructions: self.store.instruction_count()?,
            latest_snapshot_height: self.store.latest_snapshot_height()?,
        })
    }

    // ── Writes (pipeline Process stage only) ────────────────────────────

    /// Seed an account at genesis / bootstrap, before any round runs.
    pub fn seed_account(&self, record: &AccountRecord) -> Result<(), StoreError> {
        self.store.put_account(record)
    }

    /// Apply one committed instruction's effects atomically.
    pub fn commit(&self, batch: &CommitBatch) -> Result<(), StoreError> {
        self.store.apply_commit(batch)
    }

    // ── Snapshots ───────────────────────────────────────────────────────

    /// Capture the current account state at `height` and persist it.
    pub fn take_snapshot(&self, height: u64) -> Result<ClusterSnapshot, LedgerError> {
        let accounts: Vec<AccountSnapshot> = self
            .store
            .iter_accounts()?
            .iter()
            .map(AccountSnapshot::from)
            .collect();
        let snapshot = ClusterSnapshot::create(self.cluster_id.clone(), height, accounts);
        self.store.put_snapshot(height, &snapshot.to_bytes())?;
        tracing::debug!(
            cluster = %self.cluster_id,
            height,
            accounts = snapshot.account_count(),
            "ledger snapshot taken"
        );
        Ok(snapshot)
    }

    /// Load and verify the snapshot at `height`.
    pub fn snapshot_at(&self, height: u64) -> Result<ClusterSnapshot, LedgerError> {
        let bytes = self.store.get_snapshot(height)?;
        let snapshot = ClusterSnapshot::from_bytes(&bytes)?;
        if !snapshot.verify() {
            return Err(LedgerError::SnapshotCorrupt { height });
        }
        Ok(snapshot)
    }

    pub fn latest_snapshot_height(&self) -> Result<Option<u64>, StoreError> {
        self.store.latest_snapshot_height()
    }
}
