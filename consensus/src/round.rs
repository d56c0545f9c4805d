//! One consensus round — vote tally and state machine.
//!
//! Mirrors the block status transitions: `Proposed` on creation, `Voting`
//! after the first vote, then `Finalized` at quorum or `Abandoned` at the
//! deadline. Vote handling is idempotent so duplicate gossip delivery does
//! not disturb the tally.

use lattice_types::{BlockHash, BlockStatus, PublicKey, Signature, Timestamp};

use crate::block::Block;

/// Result of recording one vote.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VoteOutcome {
    /// Counted; carries the tally after this vote.
    Recorded { tally: u128 },
    /// Same delegate, same block — idempotent no-op.
    Duplicate,
    /// Vote targets a different block hash than this round's — the caller
    /// treats it as equivocation evidence.
    Conflicting,
    /// Round already terminal; vote not counted.
    Ignored,
}

/// An in-flight consensus round.
#[derive(Clone, Debug)]
pub struct Round {
    pub block: Block,
    pub started_at: Timestamp,
    /// Cached hash of the proposed block.
    block_hash: BlockHash,
    /// Accumulated active vote weight.
    tally: u128,
}

impl Round {
    pub fn new(block: Block, now: Timestamp) -> Self {
        let block_hash = block.hash();
        Self {
            block,
            started_at: now,
            block_hash,
            tally: 0,
        }
    }

    pub fn block_hash(&self) -> BlockHash {
        self.block_hash
    }

    pub fn tally(&self) -> u128 {
        self.tally
    }

    /// Record one delegate's vote with its current stake weight.
    ///
    /// The caller has already resolved the delegate as known and active.
    pub fn cast_vote(
        &mut self,
        voter: PublicKey,
        target: BlockHash,
        signature: Signature,
        weight: u128,
    ) -> VoteOutcome {
        if self.block.status.is_terminal() {
            return VoteOutcome::Ignored;
        }
        if target != self.block_hash {
            return VoteOutcome::Conflicting;
        }
        if self.block.votes.contains_key(&voter) {
            return VoteOutcome::Duplicate;
        }

        self.block.votes.insert(voter, signature);
        self.tally = self.tally.saturating_add(weight);
        if self.block.status == BlockStatus::Proposed {
            self.block.status = BlockStatus::Voting;
        }
        VoteOutcome::Recorded { tally: self.tally }
    }

    /// Drop a delegate's vote (equivocation cleanup), subtracting its
    /// weight from the tally.
    pub fn remove_vote(&mut self, voter: &PublicKey, weight: u128) {
        if self.block.votes.remove(voter).is_some() {
            self.tally = self.tally.saturating_sub(weight);
        }
    }

    /// Finalize if the tally has reached `quorum_weight`.
    pub fn try_finalize(&mut self, quorum_weight: u128) -> bool {
        if self.block.status.is_terminal() {
            return false;
        }
        if self.tally >= quorum_weight {
            self.block.status = BlockStatus::Finalized;
            true
        } else {
            false
        }
    }

    /// Abandon if the round deadline has passed.
    pub fn check_timeout(&mut self, timeout_ms: u64, now: Timestamp) -> bool {
        if self.block.status.is_terminal() {
            return false;
        }
        let elapsed_ms = self.started_at.elapsed(now).saturating_mul(1000);
        if elapsed_ms >= timeout_ms {
            self.block.status = BlockStatus::Abandoned;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lattice_types::ClusterId;

    fn pk(byte: u8) -> PublicKey {
        PublicKey([byte; 32])
    }

    fn sig() -> Signature {
        Signature([0u8; 64])
    }

    fn round() -> Round {
        let block = Block::new(ClusterId::new("chat"), 1, 0, pk(1), vec![]);
        Round::new(block, Timestamp::new(100))
    }

    #[test]
    fn first_vote_moves_to_voting() {
        let mut r = round();
        let target = r.block_hash();
        let outcome = r.cast_vote(pk(1), target, sig(), 30);
        assert_eq!(outcome, VoteOutcome::Recorded { tally: 30 });
        assert_eq!(r.block.status, BlockStatus::Voting);
    }

    #[test]
    fn duplicate_vote_is_noop() {
        let mut r = round();
        let target = r.block_hash();
        r.cast_vote(pk(1), target, sig(), 30);
        assert_eq!(r.cast_vote(pk(1), target, sig(), 30), VoteOutcome::Duplicate);
        assert_eq!(r.tally(), 30);
    }

    #[test]
    fn conflicting_target_reported() {
        let mut r = round();
        let other = BlockHash::new([0xEE; 32]);
        assert_eq!(r.cast_vote(pk(1), other, sig(), 30), VoteOutcome::Conflicting);
        assert_eq!(r.tally(), 0);
    }

    #[test]
    fn quorum_finalizes_at_exact_threshold() {
        let mut r = round();
        let target = r.block_hash();
        r.cast_vote(pk(1), target, sig(), 30);
        r.cast_vote(pk(2), target, sig(), 25);
        assert!(!r.try_finalize(67));
        r.cast_vote(pk(3), target, sig(), 20);
        assert!(r.try_finalize(67));
        assert_eq!(r.block.status, BlockStatus::Finalized);
    }

    #[test]
    fn minority_stake_does_not_finalize() {
        let mut r = round();
        let target = r.block_hash();
        r.cast_vote(pk(3), target, sig(), 20);
        r.cast_vote(pk(4), target, sig(), 15);
        r.cast_vote(pk(5), target, sig(), 10);
        assert!(!r.try_finalize(67));
    }

    #[test]
    fn votes_ignored_after_finalization() {
        let mut r = round();
        let target = r.block_hash();
        r.cast_vote(pk(1), target, sig(), 70);
        r.try_finalize(67);
        assert_eq!(r.cast_vote(pk(2), target, sig(), 10), VoteOutcome::Ignored);
    }

    #[test]
    fn timeout_abandons() {
        let mut r = round();
        assert!(!r.check_timeout(5_000, Timestamp::new(104)));
        assert!(r.check_timeout(5_000, Timestamp::new(105)));
        assert_eq!(r.block.status, BlockStatus::Abandoned);
    }

    #[test]
    fn timeout_noop_when_finalized() {
        let mut r = round();
        let target = r.block_hash();
        r.cast_vote(pk(1), target, sig(), 70);
        r.try_finalize(67);
        assert!(!r.check_timeout(1, Timestamp::new(9_999)));
        assert_eq!(r.block.status, BlockStatus::Finalized);
    }

    #[test]
    fn remove_vote_subtracts_weight() {
        let mut r = round();
        let target = r.block_hash();
        r.cast_vote(pk(1), target, sig(), 30);
        r.cast_vote(pk(2), target, sig(), 25);
        r.remove_vote(&pk(1), 30);
        assert_eq!(r.tally(), 25);
        assert!(!r.block.votes.contains_key(&pk(1)));
    }
}
