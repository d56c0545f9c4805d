use lattice_types::{InstructionId, PublicKey};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConsensusError {
    #[error("a round is already in progress at height {height}")]
    RoundInProgress { height: u64 },

    #[error("no active round")]
    NoActiveRound,

    #[error("no active delegates in the cluster")]
    NoActiveDelegates,

    #[error("unknown delegate {0:?}")]
    UnknownDelegate(PublicKey),

    #[error("delegate {0:?} already registered")]
    DelegateExists(PublicKey),

    #[error("proposal height {got} does not match expected height {expected}")]
    HeightMismatch { expected: u64, got: u64 },

    #[error("proposal from {got:?} but rotation expects {expected:?}")]
    ProposerMismatch { expected: PublicKey, got: PublicKey },

    #[error("instruction {0} already in the pending pool")]
    DuplicatePending(InstructionId),

    #[error("instruction {0} not found in the pending pool")]
    UnknownPending(InstructionId),

    #[error("instruction {0} is included in the proposed block and can no longer be withdrawn")]
    InFlight(InstructionId),

    #[error("governance mutation refused mid-round at height {height}")]
    GovernanceMidRound { height: u64 },

    #[error("proposal attempt {attempt} is stale (current attempt {current})")]
    StaleProposal { attempt: u32, current: u32 },

    #[error("malformed proposal: {0}")]
    MalformedProposal(String),

    #[error("vote signature does not verify for delegate {0:?}")]
    InvalidVoteSignature(PublicKey),
}
