//! Fork choice between competing finalized chains.
//!
//! Only relevant when two proposers at the same height are observed, e.g.
//! after a network partition heals and both sides finalized independently.
//! The chain with the higher finalized cumulative stake weight wins; exact
//! ties break on the lexicographically smaller tip hash.

use lattice_types::BlockHash;
use serde::{Deserialize, Serialize};

/// A chain's claim to canonicality.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainCandidate {
    /// Hash of the chain's latest finalized block.
    pub tip: BlockHash,
    /// Sum of vote tallies across all finalized blocks.
    pub finalized_weight: u128,
}

/// Which side of a fork comparison is canonical.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ForkPreference {
    Local,
    Remote,
}

/// Decide between the local chain and a competing remote chain.
pub fn choose_canonical(local: &ChainCandidate, remote: &ChainCandidate) -> ForkPreference {
    match local.finalized_weight.cmp(&remote.finalized_weight) {
        std::cmp::Ordering::Greater => ForkPreference::Local,
        std::cmp::Ordering::Less => ForkPreference::Remote,
        std::cmp::Ordering::Equal => {
            // Identical tips are the same chain; keep local.
            if local.tip <= remote.tip {
                ForkPreference::Local
            } else {
                ForkPreference::Remote
            }
        }
    }
}
