//! Equivocation detection — catch delegates voting for conflicting blocks.
//!
//! A delegate may vote for exactly one block per round (height + attempt).
//! Two different votes in the same round are evidence of a malicious or
//! compromised delegate: the engine deactivates it immediately and
//! permanently, removes its weight from the tally, and keeps the proof so
//! it can be broadcast to peers.

use std::collections::HashMap;

use lattice_types::{BlockHash, PublicKey, Timestamp};
use serde::{Deserialize, Serialize};

/// Proof that a delegate voted for two different blocks in one round.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquivocationProof {
    pub delegate: PublicKey,
    pub height: u64,
    pub attempt: u32,
    /// First block the delegate voted for.
    pub block_a: BlockHash,
    /// Second, conflicting block.
    pub block_b: BlockHash,
    pub detected_at: Timestamp,
}

/// Tracks first votes per (delegate, round) and surfaces conflicts.
#[derive(Debug, Default)]
pub struct EquivocationDetector {
    /// (delegate, height, attempt) → first block hash voted for.
    first_votes: HashMap<(PublicKey, u64, u32), BlockHash>,
    proofs: Vec<EquivocationProof>,
}

impl EquivocationDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a vote; returns a proof if it conflicts with an earlier vote
    /// from the same delegate in the same round.
    pub fn record_vote(
        &mut self,
        delegate: &PublicKey,
        height: u64,
        attempt: u32,
        voted_for: &BlockHash,
        now: Timestamp,
    ) -> Option<EquivocationProof> {
        let key = (*delegate, height, attempt);
        match self.first_votes.get(&key) {
            Some(first) if first != voted_for => {
                let proof = EquivocationProof {
                    delegate: *delegate,
                    height,
                    attempt,
                    block_a: *first,
                    block_b: *voted_for,
                    detected_at: now,
                };
                self.proofs.push(proof.clone());
                Some(proof)
            }
            Some(_) => None,
            None => {
                self.first_votes.insert(key, *voted_for);
                None
            }
        }
    }

    /// All proofs collected so far.
    pub fn proofs(&self) -> &[EquivocationProof] {
        &self.proofs
    }

    /// Drop vote records for heights below `height` — finalized rounds can
    /// no longer produce new conflicts.
    pub fn prune_below(&mut self, height: u64) {
        self.first_votes.retain(|(_, h, _), _| *h >= height);
    }

    pub fn tracked_votes(&self) -> usize {
        self.first_votes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pk(byte: u8) -> PublicKey {
        PublicKey([byte; 32])
    }

    fn hash(byte: u8) -> BlockHash {
        BlockHash::new([byte; 32])
    }

    #[test]
    fn first_vote_is_clean() {
        let mut det = EquivocationDetector::new();
        assert!(det
            .record_vote(&pk(1), 5, 0, &hash(10), Timestamp::new(100))
            .is_none());
    }

    #[test]
    fn repeat_vote_same_block_is_clean() {
        let mut det = EquivocationDetector::new();
        det.record_vote(&pk(1), 5, 0, &hash(10), Timestamp::new(100));
        assert!(det
            .record_vote(&pk(1), 5, 0, &hash(10), Timestamp::new(101))
            .is_none());
        assert!(det.proofs().is_empty());
    }

    #[test]
    fn conflicting_vote_produces_proof() {
        let mut det = EquivocationDetector::new();
        det.record_vote(&pk(1), 5, 0, &hash(10), Timestamp::new(100));
        let proof = det
            .record_vote(&pk(1), 5, 0, &hash(20), Timestamp::new(101))
            .expect("conflict expected");
        assert_eq!(proof.delegate, pk(1));
        assert_eq!(proof.block_a, hash(10));
        assert_eq!(proof.block_b, hash(20));
        assert_eq!(det.proofs().len(), 1);
    }

    #[test]
    fn different_attempts_do_not_conflict() {
        // A delegate legitimately re-votes after its round was abandoned.
        let mut det = EquivocationDetector::new();
        det.record_vote(&pk(1), 5, 0, &hash(10), Timestamp::new(100));
        assert!(det
            .record_vote(&pk(1), 5, 1, &hash(20), Timestamp::new(101))
            .is_none());
    }

    #[test]
    fn different_delegates_do_not_conflict() {
        let mut det = EquivocationDetector::new();
        det.record_vote(&pk(1), 5, 0, &hash(10), Timestamp::new(100));
        assert!(det
            .record_vote(&pk(2), 5, 0, &hash(20), Timestamp::new(101))
            .is_none());
    }

    #[test]
    fn prune_drops_old_heights() {
        let mut det = EquivocationDetector::new();
        det.record_vote(&pk(1), 3, 0, &hash(10), Timestamp::new(100));
        det.record_vote(&pk(1), 7, 0, &hash(11), Timestamp::new(100));
        det.prune_below(5);
        assert_eq!(det.tracked_votes(), 1);
    }
}
