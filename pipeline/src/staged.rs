//! Copy-on-write account staging for the Process stage.
//!
//! Handlers mutate staged copies; nothing touches the ledger until the
//! pipeline turns the staging area into one atomic commit batch. A handler
//! error throws the whole staging area away, which is what makes invariant
//! "no partial application" free.

use std::collections::HashMap;

use lattice_crypto::decode_address;
use lattice_ledger::Ledger;
use lattice_store::AccountRecord;
use lattice_types::AccountAddress;

use crate::PipelineError;

/// Staged account mutations layered over the ledger.
pub struct StagedAccounts<'a> {
    ledger: &'a Ledger,
    staged: HashMap<AccountAddress, AccountRecord>,
}

impl<'a> StagedAccounts<'a> {
    pub fn new(ledger: &'a Ledger) -> Self {
        Self {
            ledger,
            staged: HashMap::new(),
        }
    }

    /// Load an account into staging (no-op if already staged).
    ///
    /// Unknown accounts materialize with zero balance and the public key
    /// recovered from the address — valid lattice addresses encode it.
    fn load(&mut self, address: &AccountAddress) -> Result<(), PipelineError> {
        if self.staged.contains_key(address) {
            return Ok(());
        }
        let record = if self.ledger.account_exists(address)? {
            self.ledger.account(address)?
        } else {
            let public_key = decode_address(address.as_str()).ok_or_else(|| {
                PipelineError::Validation(format!("address {address} does not decode to a key"))
            })?;
            AccountRecord::new(address.clone(), public_key, 0)
        };
        self.staged.insert(address.clone(), record);
        Ok(())
    }

    /// Read an account's staged state.
    pub fn get(&mut self, address: &AccountAddress) -> Result<&AccountRecord, PipelineError> {
        self.load(address)?;
        Ok(self.staged.get(address).expect("loaded above"))
    }

    /// Move `amount` out of an account, failing on insufficient balance.
    pub fn debit(
        &mut self,
        address: &AccountAddress,
        amount: u128,
    ) -> Result<(), PipelineError> {
        self.load(address)?;
        let record = self.staged.get_mut(address).expect("loaded above");
        if record.balance < amount {
            return Err(PipelineError::InsufficientFunds {
                required: amount,
                available: record.balance,
            });
        }
        record.balance -= amount;
        Ok(())
    }

    /// Move `amount` into an account, creating it if needed.
    pub fn credit(
        &mut self,
        address: &AccountAddress,
        amount: u128,
    ) -> Result<(), PipelineError> {
        self.load(address)?;
        let record = self.staged.get_mut(address).expect("loaded above");
        record.balance = record.balance.saturating_add(amount);
        Ok(())
    }

    /// Bump an account's nonce by exactly one.
    pub fn increment_nonce(&mut self, address: &AccountAddress) -> Result<(), PipelineError> {
        self.load(address)?;
        let record = self.staged.get_mut(address).expect("loaded above");
        record.nonce += 1;
        Ok(())
    }

    /// Consume staging into the records for the commit batch.
    pub fn into_records(self) -> Vec<AccountRecord> {
        self.staged.into_values().collect()
    }
}
