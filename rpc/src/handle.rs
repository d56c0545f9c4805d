//! The node-facing trait the RPC server calls into.

use lattice_instructions::Instruction;
use lattice_types::{AccountAddress, ClusterId, InstructionId, InstructionStatus};
use serde::{Deserialize, Serialize};

/// Synchronous submission verdict. Consensus finality arrives later via
/// status queries.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SubmitReceipt {
    pub id: InstructionId,
    /// The fee the pipeline will charge at commit.
    pub fee: u128,
}

/// Read model for account queries.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AccountView {
    pub address: String,
    pub balance: u128,
    pub nonce: u64,
}

/// What the RPC layer needs from the node.
///
/// Rejections surface as `Err(reason)` — the synchronous half of the
/// submission contract.
pub trait NodeHandle: Send + Sync {
    fn submit(
        &self,
        cluster: &ClusterId,
        instruction: Instruction,
    ) -> Result<SubmitReceipt, String>;

    fn instruction_status(
        &self,
        cluster: &ClusterId,
        id: &InstructionId,
    ) -> Option<InstructionStatus>;

    fn account(&self, cluster: &ClusterId, address: &AccountAddress) -> Option<AccountView>;
}
