//! Consensus — per-cluster Delegated Proof of Stake.
//!
//! A small elected delegate set, weighted by stake, proposes and votes on
//! blocks of instructions. A block finalizes when accumulated vote weight
//! reaches the quorum fraction of total *active* stake; a round that misses
//! its deadline is abandoned and proposer duty rotates at the same height.
//!
//! ## Module overview
//!
//! - [`delegate`] — Delegate identity, stake, and deterministic rotation.
//! - [`block`] — Block structure and content hashing.
//! - [`round`] — One round's vote tally and state machine.
//! - [`equivocation`] — Conflicting-vote detection and proofs.
//! - [`fork`] — Fork choice between competing finalized chains.
//! - [`engine`] — The per-cluster engine driving all of the above.
//! - [`error`] — Consensus error types.

pub mod block;
pub mod delegate;
pub mod engine;
pub mod equivocation;
pub mod error;
pub mod fork;
pub mod round;

pub use block::Block;
pub use delegate::{Delegate, DelegateSet};
pub use engine::{CastVoteResult, ConsensusEngine, FinalizedRound};
pub use equivocation::{EquivocationDetector, EquivocationProof};
pub use error::ConsensusError;
pub use fork::{choose_canonical, ChainCandidate, ForkPreference};
pub use round::{Round, VoteOutcome};
