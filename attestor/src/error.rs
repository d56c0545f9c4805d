use lattice_types::{ClusterId, InstructionId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AttestorError {
    #[error("no attestation round open for instruction {0}")]
    UnknownRound(InstructionId),

    #[error("instruction {0} already finalized cross-cluster")]
    AlreadyFinalized(InstructionId),

    #[error("attestation round for instruction {0} already open")]
    DuplicateRound(InstructionId),

    #[error("cluster {0} is not a trusted peer")]
    UnknownPeer(ClusterId),

    #[error("attestation signature from {0} does not verify")]
    InvalidSignature(ClusterId),

    #[error("round for instruction {0} is no longer collecting")]
    NotWithdrawable(InstructionId),

    #[error("snapshot precondition failed: {0}")]
    PreconditionFailed(String),
}
