//! Status enums for instructions, blocks, and cross-cluster messages.
//!
//! Status transitions are one-way: terminal states are never left, and
//! inbound network events apply via compare-and-set on these fields rather
//! than sequential mutation, which is what makes duplicate gossip delivery
//! harmless.

use serde::{Deserialize, Serialize};

/// Lifecycle of an instruction inside the pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InstructionStatus {
    /// Submitted, waiting for inclusion in a proposed block.
    Pending,
    /// Passed structural/signature validation.
    Validated,
    /// Applied to the ledger. Terminal.
    Committed,
    /// Failed validation, fee, or replay checks. Terminal.
    Rejected,
}

impl InstructionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Committed | Self::Rejected)
    }
}

/// Lifecycle of a consensus round's block.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlockStatus {
    /// Built by the proposer, not yet voted on.
    Proposed,
    /// Collecting delegate votes.
    Voting,
    /// Reached quorum. Terminal and immutable.
    Finalized,
    /// Round deadline passed without quorum. Terminal; instructions
    /// return to the pending pool.
    Abandoned,
}

impl BlockStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finalized | Self::Abandoned)
    }
}

/// Lifecycle of a cross-cluster attestation round.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttestationStatus {
    /// Accumulating trusted-peer signatures.
    Collecting,
    /// Reached the trusted-peer weight threshold. Terminal.
    Finalized,
    /// Window elapsed below threshold. Terminal; the instruction is
    /// dropped and the originator notified.
    Expired,
}

impl AttestationStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finalized | Self::Expired)
    }
}
