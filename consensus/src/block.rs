//! Block structure and content hashing.

use std::collections::BTreeMap;

use lattice_crypto::blake2b_256_multi;
use lattice_types::{BlockHash, BlockStatus, ClusterId, InstructionId, PublicKey, Signature};
use serde::{Deserialize, Serialize};

/// One proposed block of ordered instructions.
///
/// The hash covers the proposal content (cluster, height, attempt,
/// proposer, instruction ids) but not the votes or status — delegates sign
/// the same hash regardless of how the tally evolves. Finalized blocks are
/// immutable.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Block {
    pub cluster_id: ClusterId,
    pub height: u64,
    /// Which proposal attempt at this height (increments on abandonment).
    pub attempt: u32,
    pub proposer: PublicKey,
    /// Instruction ids in execution order.
    pub instructions: Vec<InstructionId>,
    /// Vote signatures keyed by delegate — BTreeMap so serialization is
    /// deterministic.
    pub votes: BTreeMap<PublicKey, Signature>,
    pub status: BlockStatus,
}

impl Block {
    pub fn new(
        cluster_id: ClusterId,
        height: u64,
        attempt: u32,
        proposer: PublicKey,
        instructions: Vec<InstructionId>,
    ) -> Self {
        Self {
            cluster_id,
            height,
            attempt,
            proposer,
            instructions,
            votes: BTreeMap::new(),
            status: BlockStatus::Proposed,
        }
    }

    /// Content hash — what delegates vote on.
    pub fn hash(&self) -> BlockHash {
        let mut parts: Vec<&[u8]> = Vec::with_capacity(self.instructions.len() + 4);
        let height_bytes = self.height.to_le_bytes();
        let attempt_bytes = self.attempt.to_le_bytes();
        parts.push(self.cluster_id.as_str().as_bytes());
        parts.push(&height_bytes);
        parts.push(&attempt_bytes);
        parts.push(self.proposer.as_bytes());
        for id in &self.instructions {
            parts.push(id.as_bytes());
        }
        BlockHash::new(blake2b_256_multi(&parts))
    }

    pub fn instruction_count(&self) -> usize {
        self.instructions.len()
    }
}
