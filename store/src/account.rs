//! Account storage trait.

use crate::StoreError;
use lattice_types::{AccountAddress, PublicKey};
use serde::{Deserialize, Serialize};

/// Per-account state stored in the ledger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRecord {
    pub address: AccountAddress,
    /// Key that instruction signatures from this account verify against.
    pub public_key: PublicKey,
    pub balance: u128,
    /// Strictly increasing; exactly +1 per committed instruction from this
    /// account. Instructions carry `nonce + 1`.
    pub nonce: u64,
}

impl AccountRecord {
    pub fn new(address: AccountAddress, public_key: PublicKey, balance: u128) -> Self {
        Self {
            address,
            public_key,
            balance,
            nonce: 0,
        }
    }
}

/// Trait for account storage operations.
pub trait AccountStore {
    fn get_account(&self, address: &AccountAddress) -> Result<AccountRecord, StoreError>;
    fn put_account(&self, record: &AccountRecord) -> Result<(), StoreError>;
    fn account_exists(&self, address: &AccountAddress) -> Result<bool, StoreError>;
    fn account_count(&self) -> Result<u64, StoreError>;
    /// All accounts ordered by address (deterministic snapshot input).
    fn iter_accounts(&self) -> Result<Vec<AccountRecord>, StoreError>;
}
