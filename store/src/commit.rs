//! Atomic commit batches.

use crate::account::AccountRecord;
use crate::instruction::CommittedInstruction;
use serde::{Deserialize, Serialize};

/// Everything one committed instruction changes, applied as a unit.
///
/// The Process stage stages account mutations here instead of writing them
/// through one at a time; `LedgerStore::apply_commit` then applies the whole
/// batch inside a single critical section. A reader can observe the state
/// before the batch or after it, never in between.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CommitBatch {
    /// Updated account records (sender, receiver, …).
    pub accounts: Vec<AccountRecord>,
    /// The instruction being appended to the log.
    pub instruction: CommittedInstruction,
}
