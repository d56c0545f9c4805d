//! Thread-safe in-memory storage backend.
//!
//! All maps live behind one mutex so `apply_commit` is trivially atomic:
//! account updates and the log append happen inside a single critical
//! section.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use lattice_types::{AccountAddress, InstructionId};

use crate::account::{AccountRecord, AccountStore};
use crate::commit::CommitBatch;
use crate::instruction::{CommittedInstruction, InstructionStore};
use crate::snapshot::SnapshotStore;
use crate::{LedgerStore, StoreError};

#[derive(Default)]
struct Inner {
    accounts: BTreeMap<AccountAddress, AccountRecord>,
    instructions: HashMap<InstructionId, CommittedInstruction>,
    account_logs: HashMap<AccountAddress, Vec<InstructionId>>,
    snapshots: BTreeMap<u64, Vec<u8>>,
}

/// In-memory [`LedgerStore`] backend.
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // A poisoned mutex means a writer panicked mid-section; the data is
        // a consistent pre- or post-commit state either way.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl AccountStore for MemoryStore {
    fn get_account(&self, address: &AccountAddress) -> Result<AccountRecord, StoreError> {
        self.lock()
            .accounts
            .get(address)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(address.to_string()))
    }

    fn put_account(&self, record: &AccountRecord) -> Result<(), StoreError> {
        self.lock()
            .accounts
            .insert(record.address.clone(), record.clone());
        Ok(())
    }

    fn account_exists(&self, address: &AccountAddress) -> Result<bool, StoreError> {
        Ok(self.lock().accounts.contains_key(address))
    }

    fn account_count(&self) -> Result<u64, StoreError> {
        Ok(self.lock().accounts.len() as u64)
    }

    fn iter_accounts(&self) -> Result<Vec<AccountRecord>, StoreError> {
        Ok(self.lock().accounts.values().cloned().collect())
    }
}

impl InstructionStore for MemoryStore {
    fn put_instruction(&self, record: &CommittedInstruction) -> Result<(), StoreError> {
        let mut inner = self.lock();
        inner.instructions.insert(record.id, record.clone());
        inner
            .account_logs
            .entry(record.account.clone())
            .or_default()
            .push(record.id);
        Ok(())
    }

    fn get_instruction(&self, id: &InstructionId) -> Result<CommittedInstruction, StoreError> {
        self.lock()
            .instructions
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    fn is_committed(&self, id: &InstructionId) -> Result<bool, StoreError> {
        Ok(self.lock().instructions.contains_key(id))
    }

    fn account_log(&self, address: &AccountAddress) -> Result<Vec<InstructionId>, StoreError> {
        Ok(self
            .lock()
            .account_logs
            .get(address)
            .cloned()
            .unwrap_or_default())
    }

    fn instruction_count(&self) -> Result<u64, StoreError> {
        Ok(self.lock().instructions.len() as u64)
    }
}

impl SnapshotStore for MemoryStore {
    fn put_snapshot(&self, height: u64, bytes: &[u8]) -> Result<(), StoreError> {
        self.lock().snapshots.insert(height, bytes.to_vec());
        Ok(())
    }

    fn get_snapshot(&self, height: u64) -> Result<Vec<u8>, StoreError> {
        self.lock()
            .snapshots
            .get(&height)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("snapshot at height {height}")))
    }

    fn has_snapshot(&self, height: u64) -> Result<bool, StoreError> {
        Ok(self.lock().snapshots.contains_key(&height))
    }

    fn latest_snapshot_height(&self) -> Result<Option<u64>, StoreError> {
        Ok(self.lock().snapshots.keys().next_back().copied())
    }
}

impl LedgerStore for MemoryStore {
    fn apply_commit(&self, batch: &CommitBatch) -> Result<(), StoreError> {
        let mut inner = self.lock();
        for record in &batch.accounts {
            inner
                .accounts
                .insert(record.address.clone(), record.clone());
        }
        inner
            .instructions
            .insert(batch.instruction.id, batch.instruction.clone());
        inner
            .account_logs
            .entry(batch.instruction.account.clone())
            .or_default()
            .push(batch.instruction.id);
        Ok(())
    }
}
