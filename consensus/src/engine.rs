//! The per-cluster consensus engine.
//!
//! Owns the pending instruction pool, the active round, the delegate set,
//! and the finalized-chain bookkeeping. One engine runs per cluster, one
//! logical round at a time; the node drives it with timers and feeds it
//! gossip. Everything here is synchronous — idempotent vote handling and
//! content-hash keying make duplicate and out-of-order delivery harmless.

use std::collections::{HashMap, VecDeque};

use lattice_crypto::verify_signature;
use lattice_instructions::Instruction;
use lattice_types::{
    BlockHash, ClusterId, InstructionId, ProtocolParams, PublicKey, Signature, Timestamp,
};

use crate::block::Block;
use crate::delegate::{Delegate, DelegateSet};
use crate::equivocation::{EquivocationDetector, EquivocationProof};
use crate::error::ConsensusError;
use crate::fork::{choose_canonical, ChainCandidate, ForkPreference};
use crate::round::{Round, VoteOutcome};

/// Upper bound on votes cached ahead of their proposal's arrival.
const VOTE_CACHE_CAPACITY: usize = 1_024;

/// A pool entry: the instruction plus its local submission sequence.
#[derive(Clone, Debug)]
struct PendingEntry {
    seq: u64,
    instruction: Instruction,
}

/// What became final when a round reached quorum.
#[derive(Clone, Debug)]
pub struct FinalizedRound {
    pub block: Block,
    /// Full instruction bodies in block order, ready for the pipeline.
    pub instructions: Vec<Instruction>,
    /// The vote weight the block finalized with.
    pub tally: u128,
}

/// Result of feeding one vote to the engine.
#[derive(Clone, Debug)]
pub enum CastVoteResult {
    /// Counted toward the active round.
    Recorded { tally: u128 },
    /// Same delegate already voted for this block.
    Duplicate,
    /// Not counted (inactive delegate, terminal round, or a vote for a
    /// block this node never saw).
    Ignored,
    /// No matching round yet — held until the proposal arrives.
    Cached,
    /// The delegate voted for two different blocks in the same round and
    /// has been deactivated.
    Equivocation(EquivocationProof),
}

/// Per-cluster DPoS engine.
pub struct ConsensusEngine {
    cluster_id: ClusterId,
    params: ProtocolParams,
    delegates: DelegateSet,
    /// Submitted instructions awaiting inclusion, in submission order.
    pending: VecDeque<PendingEntry>,
    next_seq: u64,
    /// Height the next finalized block will have.
    height: u64,
    /// Abandoned attempts at the current height.
    attempt: u32,
    round: Option<Round>,
    /// Full bodies for the active round's instructions, block order.
    round_instructions: Vec<Instruction>,
    /// Votes that arrived before their proposal, keyed by block hash.
    cached_votes: HashMap<BlockHash, Vec<(PublicKey, Signature)>>,
    cached_vote_count: usize,
    equivocation: EquivocationDetector,
    /// Sum of finalization tallies across the finalized chain.
    cumulative_finalized_weight: u128,
    last_finalized: BlockHash,
    finalized_count: u64,
}

impl ConsensusEngine {
    pub fn new(cluster_id: ClusterId, delegates: DelegateSet, params: ProtocolParams) -> Self {
        Self {
            cluster_id,
            params,
            delegates,
            pending: VecDeque::new(),
            next_seq: 0,
            height: 1,
            attempt: 0,
            round: None,
            round_instructions: Vec::new(),
            cached_votes: HashMap::new(),
            cached_vote_count: 0,
            equivocation: EquivocationDetector::new(),
            cumulative_finalized_weight: 0,
            last_finalized: BlockHash::ZERO,
            finalized_count: 0,
        }
    }

    // ── Accessors ───────────────────────────────────────────────────────

    pub fn cluster_id(&self) -> &ClusterId {
        &self.cluster_id
    }

    pub fn height(&self) -> u64 {
        self.height
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn delegates(&self) -> &DelegateSet {
        &self.delegates
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn has_active_round(&self) -> bool {
        self.round.is_some()
    }

    pub fn active_block_hash(&self) -> Option<BlockHash> {
        self.round.as_ref().map(|r| r.block_hash())
    }

    /// Vote weight accumulated by the active round, if any.
    pub fn current_tally(&self) -> Option<u128> {
        self.round.as_ref().map(|r| r.tally())
    }

    /// Full instruction bodies of the active round, block order.
    pub fn round_instructions(&self) -> &[Instruction] {
        &self.round_instructions
    }

    /// Whether any pending instruction currently passes the candidate
    /// filter — checked before proposing so stale pools do not produce
    /// empty blocks.
    pub fn has_candidate(&self, is_candidate: impl Fn(&Instruction) -> bool) -> bool {
        self.pending.iter().any(|e| is_candidate(&e.instruction))
    }

    pub fn finalized_count(&self) -> u64 {
        self.finalized_count
    }

    pub fn equivocation_proofs(&self) -> &[EquivocationProof] {
        self.equivocation.proofs()
    }

    /// The delegate whose turn it is right now.
    pub fn current_proposer(&self) -> Option<&Delegate> {
        self.delegates.proposer_for(self.height, self.attempt)
    }

    // ── Pending pool ────────────────────────────────────────────────────

    /// Add a validated instruction to the pending pool.
    pub fn submit_pending(&mut self, instruction: Instruction) -> Result<(), ConsensusError> {
        let id = instruction.id;
        let in_pool = self.pending.iter().any(|e| e.instruction.id == id);
        let in_round = self.round_instructions.iter().any(|i| i.id == id);
        if in_pool || in_round {
            return Err(ConsensusError::DuplicatePending(id));
        }
        self.pending.push_back(PendingEntry {
            seq: self.next_seq,
            instruction,
        });
        self.next_seq += 1;
        Ok(())
    }

    /// Withdraw a pending instruction before it is proposed.
    ///
    /// Refused once the instruction is inside the active round's block.
    pub fn withdraw_pending(
        &mut self,
        id: &InstructionId,
    ) -> Result<Instruction, ConsensusError> {
        if self.round_instructions.iter().any(|i| &i.id == id) {
            return Err(ConsensusError::InFlight(*id));
        }
        let position = self
            .pending
            .iter()
            .position(|e| &e.instruction.id == id)
            .ok_or(ConsensusError::UnknownPending(*id))?;
        Ok(self
            .pending
            .remove(position)
            .map(|e| e.instruction)
            .expect("position was just found"))
    }

    // ── Proposal ────────────────────────────────────────────────────────

    /// Build this node's proposal for the current (height, attempt).
    ///
    /// `is_candidate` filters the pool — the caller supplies nonce
    /// validity against current ledger state. Selected instructions are
    /// ordered by submission sequence, ties broken by instruction id, and
    /// capped at `max_block_instructions`. Instructions failing the filter
    /// stay pending for a later round.
    pub fn propose_round(
        &mut self,
        now: Timestamp,
        is_candidate: impl Fn(&Instruction) -> bool,
    ) -> Result<Block, ConsensusError> {
        if self.round.is_some() {
            return Err(ConsensusError::RoundInProgress {
                height: self.height,
            });
        }
        let proposer = self
            .current_proposer()
            .ok_or(ConsensusError::NoActiveDelegates)?
            .public_key;

        let mut selected: Vec<PendingEntry> = Vec::new();
        let mut rest: VecDeque<PendingEntry> = VecDeque::new();
        for entry in self.pending.drain(..) {
            if selected.len() < self.params.max_block_instructions
                && is_candidate(&entry.instruction)
            {
                selected.push(entry);
            } else {
                rest.push_back(entry);
            }
        }
        self.pending = rest;
        selected.sort_by(|a, b| a.seq.cmp(&b.seq).then(a.instruction.id.cmp(&b.instruction.id)));

        let bodies: Vec<Instruction> = selected.into_iter().map(|e| e.instruction).collect();
        let ids: Vec<InstructionId> = bodies.iter().map(|i| i.id).collect();

        let block = Block::new(
            self.cluster_id.clone(),
            self.height,
            self.attempt,
            proposer,
            ids,
        );
        tracing::debug!(
            cluster = %self.cluster_id,
            height = self.height,
            attempt = self.attempt,
            instructions = block.instruction_count(),
            "proposing round"
        );
        self.install_round(block.clone(), bodies, now);
        Ok(block)
    }

    /// Accept a proposal gossiped by the rotation's proposer.
    ///
    /// `bodies` must carry the full instruction for every id in the block.
    /// Re-delivery of the active round's proposal is an idempotent no-op.
    pub fn receive_proposal(
        &mut self,
        block: Block,
        bodies: Vec<Instruction>,
        now: Timestamp,
    ) -> Result<BlockHash, ConsensusError> {
        if let Some(round) = &self.round {
            if round.block_hash() == block.hash() {
                return Ok(round.block_hash());
            }
            return Err(ConsensusError::RoundInProgress {
                height: self.height,
            });
        }
        if block.height != self.height {
            return Err(ConsensusError::HeightMismatch {
                expected: self.height,
                got: block.height,
            });
        }
        // A proposal for an earlier attempt lost its window locally.
        if block.attempt < self.attempt {
            return Err(ConsensusError::StaleProposal {
                attempt: block.attempt,
                current: self.attempt,
            });
        }
        let expected = self
            .delegates
            .proposer_for(block.height, block.attempt)
            .ok_or(ConsensusError::NoActiveDelegates)?
            .public_key;
        if expected != block.proposer {
            return Err(ConsensusError::ProposerMismatch {
                expected,
                got: block.proposer,
            });
        }
        if bodies.len() != block.instructions.len() {
            return Err(ConsensusError::MalformedProposal(format!(
                "{} bodies for {} instruction ids",
                bodies.len(),
                block.instructions.len()
            )));
        }
        for (id, body) in block.instructions.iter().zip(&bodies) {
            if &body.id != id || !body.id_matches_content() {
                return Err(ConsensusError::MalformedProposal(format!(
                    "body does not match instruction id {id}"
                )));
            }
        }

        // The proposer drained these from its own pool; drop our copies.
        self.pending
            .retain(|e| !block.instructions.contains(&e.instruction.id));

        self.attempt = block.attempt;
        let hash = block.hash();
        self.install_round(block, bodies, now);
        Ok(hash)
    }

    fn install_round(&mut self, block: Block, bodies: Vec<Instruction>, now: Timestamp) {
        let hash = block.hash();
        self.round = Some(Round::new(block, now));
        self.round_instructions = bodies;

        // Apply any votes that arrived ahead of the proposal.
        if let Some(early) = self.cached_votes.remove(&hash) {
            self.cached_vote_count = self.cached_vote_count.saturating_sub(early.len());
            for (voter, signature) in early {
                let _ = self.cast_vote(voter, hash, signature, now);
            }
        }
    }

    // ── Voting ──────────────────────────────────────────────────────────

    /// Record a delegate's vote for `target`.
    ///
    /// The signature must verify over the target hash bytes. A second,
    /// different vote from the same delegate in the same round deactivates
    /// it immediately: its stake leaves the rotation, the quorum
    /// denominator, and the current tally.
    pub fn cast_vote(
        &mut self,
        voter: PublicKey,
        target: BlockHash,
        signature: Signature,
        now: Timestamp,
    ) -> Result<CastVoteResult, ConsensusError> {
        let Some(delegate) = self.delegates.get(&voter) else {
            return Err(ConsensusError::UnknownDelegate(voter));
        };
        if !delegate.active {
            return Ok(CastVoteResult::Ignored);
        }
        if !verify_signature(target.as_bytes(), &signature, &voter) {
            return Err(ConsensusError::InvalidVoteSignature(voter));
        }
        let weight = delegate.stake;

        if let Some(proof) =
            self.equivocation
                .record_vote(&voter, self.height, self.attempt, &target, now)
        {
            let removed = self.delegates.deactivate(&voter).unwrap_or(0);
            if let Some(round) = &mut self.round {
                round.remove_vote(&voter, removed);
            }
            tracing::warn!(
                cluster = %self.cluster_id,
                delegate = ?voter,
                height = self.height,
                "delegate equivocated and was deactivated"
            );
            return Ok(CastVoteResult::Equivocation(proof));
        }

        let Some(round) = &mut self.round else {
            // Proposal not seen yet; hold the vote.
            if self.cached_vote_count >= VOTE_CACHE_CAPACITY {
                return Ok(CastVoteResult::Ignored);
            }
            self.cached_votes
                .entry(target)
                .or_default()
                .push((voter, signature));
            self.cached_vote_count += 1;
            return Ok(CastVoteResult::Cached);
        };

        match round.cast_vote(voter, target, signature, weight) {
            VoteOutcome::Recorded { tally } => Ok(CastVoteResult::Recorded { tally }),
            VoteOutcome::Duplicate => Ok(CastVoteResult::Duplicate),
            VoteOutcome::Ignored => Ok(CastVoteResult::Ignored),
            // One vote for a block we do not have as the active round:
            // the voter may be on the other side of a partition. Not
            // equivocation until it also votes for ours.
            VoteOutcome::Conflicting => Ok(CastVoteResult::Ignored),
        }
    }

    // ── Finalization and timeout ────────────────────────────────────────

    /// Finalize the active round if its tally reached quorum.
    ///
    /// The quorum denominator is recomputed from *currently active* stake,
    /// so a mid-round equivocation shrinks it.
    pub fn try_finalize(&mut self, _now: Timestamp) -> Option<FinalizedRound> {
        let quorum = self
            .params
            .quorum_weight(self.delegates.total_active_stake());
        let round = self.round.as_mut()?;
        if !round.try_finalize(quorum) {
            return None;
        }

        let round = self.round.take().expect("checked above");
        let tally = round.tally();
        let block = round.block;
        let instructions = std::mem::take(&mut self.round_instructions);

        self.last_finalized = block.hash();
        self.cumulative_finalized_weight = self.cumulative_finalized_weight.saturating_add(tally);
        self.finalized_count += 1;
        self.height += 1;
        self.attempt = 0;
        self.equivocation.prune_below(self.height);

        tracing::info!(
            cluster = %self.cluster_id,
            height = block.height,
            tally,
            instructions = instructions.len(),
            "block finalized"
        );
        Some(FinalizedRound {
            block,
            instructions,
            tally,
        })
    }

    /// Abandon the round if its deadline passed.
    ///
    /// Instructions return to the front of the pending pool in their
    /// original order and proposer duty advances at the same height.
    pub fn check_round_timeout(&mut self, now: Timestamp) -> bool {
        let timed_out = match &mut self.round {
            Some(round) => round.check_timeout(self.params.round_timeout_ms, now),
            None => false,
        };
        if !timed_out {
            return false;
        }

        self.round = None;
        let returned = std::mem::take(&mut self.round_instructions);
        for instruction in returned.into_iter().rev() {
            self.pending.push_front(PendingEntry {
                seq: 0, // re-queued ahead of everything; original order kept by the rev() push
                instruction,
            });
        }
        // Re-sequence so future ordering stays strict.
        for (i, entry) in self.pending.iter_mut().enumerate() {
            entry.seq = i as u64;
        }
        self.next_seq = self.pending.len() as u64;

        self.attempt += 1;
        tracing::debug!(
            cluster = %self.cluster_id,
            height = self.height,
            attempt = self.attempt,
            "round abandoned, rotating proposer"
        );
        true
    }

    // ── Fork choice ─────────────────────────────────────────────────────

    /// This chain's claim for fork comparison.
    pub fn chain_candidate(&self) -> ChainCandidate {
        ChainCandidate {
            tip: self.last_finalized,
            finalized_weight: self.cumulative_finalized_weight,
        }
    }

    /// Compare against a competing chain observed after partition healing.
    pub fn fork_preference(&self, remote: &ChainCandidate) -> ForkPreference {
        choose_canonical(&self.chain_candidate(), remote)
    }

    // ── Governance (between rounds only) ────────────────────────────────

    pub fn add_delegate(&mut self, delegate: Delegate) -> Result<(), ConsensusError> {
        self.ensure_between_rounds()?;
        if !self.delegates.add(delegate.clone()) {
            return Err(ConsensusError::DelegateExists(delegate.public_key));
        }
        Ok(())
    }

    pub fn remove_delegate(&mut self, key: &PublicKey) -> Result<(), ConsensusError> {
        self.ensure_between_rounds()?;
        if !self.delegates.remove(key) {
            return Err(ConsensusError::UnknownDelegate(*key));
        }
        Ok(())
    }

    fn ensure_between_rounds(&self) -> Result<(), ConsensusError> {
        if self.round.is_some() {
            return Err(ConsensusError::GovernanceMidRound {
                height: self.height,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lattice_crypto::{derive_address, keypair_from_seed, sign_message};
    use lattice_instructions::InstructionKind;
    use lattice_types::KeyPair;

    /// The spec's worked example: five delegates staked [30,25,20,15,10].
    const STAKES: [u128; 5] = [30, 25, 20, 15, 10];

    fn delegate_keys() -> Vec<KeyPair> {
        (0..5).map(|i| keypair_from_seed(&[i as u8 + 1; 32])).collect()
    }

    fn engine() -> (ConsensusEngine, Vec<KeyPair>) {
        let keys = delegate_keys();
        let delegates = DelegateSet::new(
            keys.iter()
                .zip(STAKES)
                .map(|(kp, stake)| Delegate::new(kp.public, stake))
                .collect(),
        );
        (
            ConsensusEngine::new(ClusterId::new("chat"), delegates, ProtocolParams::default()),
            keys,
        )
    }

    fn instruction(seed: u8, nonce: u64) -> Instruction {
        let keys = keypair_from_seed(&[seed; 32]);
        let from = derive_address(&keys.public);
        let to = derive_address(&keypair_from_seed(&[seed.wrapping_add(100); 32]).public);
        Instruction::new_signed(
            InstructionKind::transfer(),
            from,
            to,
            10,
            Vec::new(),
            nonce,
            &keys,
        )
    }

    fn vote(engine: &mut ConsensusEngine, kp: &KeyPair, target: BlockHash) -> CastVoteResult {
        let signature = sign_message(target.as_bytes(), &kp.private);
        engine
            .cast_vote(kp.public, target, signature, Timestamp::new(110))
            .unwrap()
    }

    #[test]
    fn propose_then_quorum_finalizes() {
        let (mut engine, keys) = engine();
        engine.submit_pending(instruction(40, 1)).unwrap();

        let block = engine
            .propose_round(Timestamp::new(100), |_| true)
            .unwrap();
        assert_eq!(block.height, 1);
        assert_eq!(block.instruction_count(), 1);
        let hash = block.hash();

        // Three largest stakes: 30 + 25 + 20 = 75 ≥ 67.
        vote(&mut engine, &keys[0], hash);
        vote(&mut engine, &keys[1], hash);
        assert!(engine.try_finalize(Timestamp::new(111)).is_none());
        vote(&mut engine, &keys[2], hash);

        let finalized = engine.try_finalize(Timestamp::new(112)).expect("quorum met");
        assert_eq!(finalized.tally, 75);
        assert_eq!(finalized.instructions.len(), 1);
        assert_eq!(engine.height(), 2);
        assert!(!engine.has_active_round());
    }

    #[test]
    fn three_smallest_stakes_do_not_finalize() {
        let (mut engine, keys) = engine();
        let block = engine
            .propose_round(Timestamp::new(100), |_| true)
            .unwrap();
        let hash = block.hash();

        // 20 + 15 + 10 = 45 < 67.
        vote(&mut engine, &keys[2], hash);
        vote(&mut engine, &keys[3], hash);
        vote(&mut engine, &keys[4], hash);
        assert!(engine.try_finalize(Timestamp::new(111)).is_none());
        assert_eq!(engine.height(), 1);
    }

    #[test]
    fn equivocating_delegate_is_deactivated_and_excluded() {
        let (mut engine, keys) = engine();
        let block = engine
            .propose_round(Timestamp::new(100), |_| true)
            .unwrap();
        let hash = block.hash();

        vote(&mut engine, &keys[0], hash);
        // keys[0] votes for a different block at the same height.
        let other = BlockHash::new([0xEE; 32]);
        let result = vote(&mut engine, &keys[0], other);
        assert!(matches!(result, CastVoteResult::Equivocation(_)));
        assert!(!engine.delegates().is_active(&keys[0].public));

        // Quorum denominator shrank: total active stake is now 70, so the
        // threshold is ceil(70 × 0.6667) = 47; 25 + 20 = 45 still short,
        // +15 = 60 reaches it.
        vote(&mut engine, &keys[1], hash);
        vote(&mut engine, &keys[2], hash);
        assert!(engine.try_finalize(Timestamp::new(111)).is_none());
        vote(&mut engine, &keys[3], hash);
        assert!(engine.try_finalize(Timestamp::new(112)).is_some());
    }

    #[test]
    fn duplicate_vote_does_not_double_count() {
        let (mut engine, keys) = engine();
        let block = engine
            .propose_round(Timestamp::new(100), |_| true)
            .unwrap();
        let hash = block.hash();

        vote(&mut engine, &keys[0], hash);
        assert!(matches!(
            vote(&mut engine, &keys[0], hash),
            CastVoteResult::Duplicate
        ));
    }

    #[test]
    fn timeout_abandons_and_rotates_proposer() {
        let (mut engine, _) = engine();
        engine.submit_pending(instruction(41, 1)).unwrap();
        let first_proposer = engine.current_proposer().unwrap().public_key;

        engine.propose_round(Timestamp::new(100), |_| true).unwrap();
        assert_eq!(engine.pending_len(), 0);

        // round_timeout_ms = 5000 → deadline at t=105.
        assert!(engine.check_round_timeout(Timestamp::new(105)));
        assert_eq!(engine.attempt(), 1);
        assert_eq!(engine.pending_len(), 1);
        assert_eq!(engine.height(), 1);
        assert_ne!(engine.current_proposer().unwrap().public_key, first_proposer);
    }

    #[test]
    fn withdraw_allowed_only_before_proposal() {
        let (mut engine, _) = engine();
        let instr = instruction(42, 1);
        let id = instr.id;
        engine.submit_pending(instr).unwrap();

        // Withdrawable while pending.
        let withdrawn = engine.withdraw_pending(&id).unwrap();
        assert_eq!(withdrawn.id, id);

        // Re-submit and propose: no longer withdrawable.
        engine.submit_pending(withdrawn).unwrap();
        engine.propose_round(Timestamp::new(100), |_| true).unwrap();
        assert!(matches!(
            engine.withdraw_pending(&id),
            Err(ConsensusError::InFlight(_))
        ));
    }

    #[test]
    fn duplicate_submission_rejected() {
        let (mut engine, _) = engine();
        let instr = instruction(43, 1);
        engine.submit_pending(instr.clone()).unwrap();
        assert!(matches!(
            engine.submit_pending(instr),
            Err(ConsensusError::DuplicatePending(_))
        ));
    }

    #[test]
    fn early_votes_cached_until_proposal_arrives() {
        // One node proposes; another sees the vote before the proposal.
        let (mut sender, keys) = engine();
        let block = sender
            .propose_round(Timestamp::new(100), |_| true)
            .unwrap();
        let hash = block.hash();

        let (mut fresh, _) = engine();
        let signature = sign_message(hash.as_bytes(), &keys[0].private);
        let result = fresh
            .cast_vote(keys[0].public, hash, signature, Timestamp::new(101))
            .unwrap();
        assert!(matches!(result, CastVoteResult::Cached));

        // Proposal arrives; the cached vote is applied to the tally.
        fresh
            .receive_proposal(block, vec![], Timestamp::new(102))
            .unwrap();
        assert_eq!(fresh.current_tally(), Some(30));
    }

    #[test]
    fn receive_proposal_checks_rotation() {
        let (mut engine, keys) = engine();
        let expected = engine.current_proposer().unwrap().public_key;
        let imposter = keys
            .iter()
            .find(|kp| kp.public != expected)
            .unwrap()
            .public;
        let block = Block::new(ClusterId::new("chat"), 1, 0, imposter, vec![]);
        assert!(matches!(
            engine.receive_proposal(block, vec![], Timestamp::new(100)),
            Err(ConsensusError::ProposerMismatch { .. })
        ));
    }

    #[test]
    fn receive_proposal_is_idempotent() {
        let (mut engine, _) = engine();
        let proposer = engine.current_proposer().unwrap().public_key;
        let block = Block::new(ClusterId::new("chat"), 1, 0, proposer, vec![]);
        let h1 = engine
            .receive_proposal(block.clone(), vec![], Timestamp::new(100))
            .unwrap();
        let h2 = engine
            .receive_proposal(block, vec![], Timestamp::new(101))
            .unwrap();
        assert_eq!(h1, h2);
    }

    #[test]
    fn fork_preference_follows_weight_then_hash() {
        let (mut engine, keys) = engine();
        let block = engine
            .propose_round(Timestamp::new(100), |_| true)
            .unwrap();
        let hash = block.hash();
        vote(&mut engine, &keys[0], hash);
        vote(&mut engine, &keys[1], hash);
        vote(&mut engine, &keys[2], hash);
        engine.try_finalize(Timestamp::new(110)).unwrap();

        // Lighter remote chain loses.
        let light = ChainCandidate {
            tip: BlockHash::new([0x01; 32]),
            finalized_weight: 10,
        };
        assert_eq!(engine.fork_preference(&light), ForkPreference::Local);

        // Heavier remote chain wins.
        let heavy = ChainCandidate {
            tip: BlockHash::new([0xFF; 32]),
            finalized_weight: 1_000,
        };
        assert_eq!(engine.fork_preference(&heavy), ForkPreference::Remote);

        // Equal weight: smaller hash wins.
        let local = engine.chain_candidate();
        let tie_smaller = ChainCandidate {
            tip: BlockHash::new([0x00; 32]),
            finalized_weight: local.finalized_weight,
        };
        assert_eq!(engine.fork_preference(&tie_smaller), ForkPreference::Remote);
    }

    #[test]
    fn governance_refused_mid_round() {
        let (mut engine, _) = engine();
        engine.propose_round(Timestamp::new(100), |_| true).unwrap();
        let new_delegate = Delegate::new(keypair_from_seed(&[50; 32]).public, 40);
        assert!(matches!(
            engine.add_delegate(new_delegate),
            Err(ConsensusError::GovernanceMidRound { .. })
        ));
    }

    #[test]
    fn governance_applies_between_rounds() {
        let (mut engine, _) = engine();
        let new_delegate = Delegate::new(keypair_from_seed(&[50; 32]).public, 40);
        engine.add_delegate(new_delegate.clone()).unwrap();
        assert_eq!(engine.delegates().total_active_stake(), 140);
        engine.remove_delegate(&new_delegate.public_key).unwrap();
        assert_eq!(engine.delegates().total_active_stake(), 100);
    }
}
