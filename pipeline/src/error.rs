use lattice_instructions::InstructionError;
use lattice_store::StoreError;
use lattice_types::InstructionId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// Structural failure surfaced by the instructions crate.
    #[error(transparent)]
    Structure(#[from] InstructionError),

    /// Handler- or account-level validation failure.
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("signature does not verify against the sender account key")]
    BadSignature,

    #[error("unknown sender account {0}")]
    UnknownSender(String),

    #[error("insufficient funds: need {required}, available {available}")]
    InsufficientFunds { required: u128, available: u128 },

    /// Replay: the id is already committed on this cluster.
    #[error("instruction {id} already committed")]
    DuplicateId { id: InstructionId },

    /// Replay: the nonce does not extend the account's sequence.
    #[error("nonce {got} does not follow committed nonce {current}")]
    BadNonce { current: u64, got: u64 },

    #[error("no handler registered for instruction kind '{0}'")]
    UnknownKind(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}
