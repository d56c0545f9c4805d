//! Abstract storage traits for the lattice protocol.
//!
//! Every storage backend implements these traits; the rest of the workspace
//! depends only on the traits. The in-memory backend in [`memory`] is the
//! default — a durable backend plugs in behind the same interface.

pub mod account;
pub mod commit;
pub mod error;
pub mod instruction;
pub mod memory;
pub mod snapshot;

pub use account::{AccountRecord, AccountStore};
pub use commit::CommitBatch;
pub use error::StoreError;
pub use instruction::{CommittedInstruction, InstructionStore};
pub use memory::MemoryStore;
pub use snapshot::SnapshotStore;

/// The full storage surface a cluster's ledger runs against.
///
/// `apply_commit` is the single mutation entry point used by the pipeline's
/// Process stage; it must apply the whole batch atomically so partial
/// application is never observable.
pub trait LedgerStore: AccountStore + InstructionStore + SnapshotStore + Send + Sync {
    fn apply_commit(&self, batch: &CommitBatch) -> Result<(), StoreError>;
}
