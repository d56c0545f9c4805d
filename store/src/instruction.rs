//! Committed-instruction log storage trait.

use crate::StoreError;
use lattice_types::{AccountAddress, InstructionId, Timestamp};
use serde::{Deserialize, Serialize};

/// A committed instruction as recorded in the log.
///
/// The full instruction body is kept as opaque serialized bytes; the fields
/// here are what status queries and dedup need without deserializing.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CommittedInstruction {
    pub id: InstructionId,
    pub account: AccountAddress,
    /// Block height at which the instruction committed.
    pub height: u64,
    pub fee: u128,
    pub committed_at: Timestamp,
    pub body: Vec<u8>,
}

/// Trait for the committed-instruction log.
///
/// The set of stored ids doubles as the per-cluster dedup set: an id present
/// here is `Committed` and must never be reprocessed.
pub trait InstructionStore {
    fn put_instruction(&self, record: &CommittedInstruction) -> Result<(), StoreError>;
    fn get_instruction(&self, id: &InstructionId) -> Result<CommittedInstruction, StoreError>;
    fn is_committed(&self, id: &InstructionId) -> Result<bool, StoreError>;
    /// Ids committed by one account, in commit order.
    fn account_log(&self, address: &AccountAddress) -> Result<Vec<InstructionId>, StoreError>;
    fn instruction_count(&self) -> Result<u64, StoreError>;
}
