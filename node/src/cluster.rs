//! One cluster's runtime — consensus, pipeline, ledger, and attestation
//! wired together.
//!
//! A runtime is a synchronous state machine; the node drives it from a
//! timer task and feeds it decoded gossip. Methods that make protocol
//! progress return an outbox of gossip messages for the node to flood —
//! the runtime itself never touches the transport.

use std::collections::HashMap;
use std::sync::Arc;

use lattice_attestor::{
    sign_attestation, AttestationAggregator, FinalizedAttestation, RecordOutcome,
};
use lattice_consensus::{Block, CastVoteResult, ConsensusEngine};
use lattice_instructions::Instruction;
use lattice_ledger::ClusterSnapshot;
use lattice_messages::{
    AttestationMessage, BlockProposalMessage, GossipMessage, MessageHeader, MessageKind,
    SnapshotAnnouncementMessage, VoteMessage,
};
use lattice_pipeline::{ExecuteOutcome, InstructionPipeline};
use lattice_rpc::{AccountView, SubmitReceipt};
use lattice_types::{
    AttestationStatus, BlockHash, ClusterId, InstructionId, InstructionStatus, ProtocolParams,
    PublicKey, Signature, Timestamp,
};

use lattice_attestor::AttestorError;

use crate::governance::{GovernanceAction, GovernanceQueue};
use crate::identity::NodeIdentity;
use crate::metrics::NodeMetrics;
use crate::NodeError;

/// One cluster's full runtime state.
pub struct ClusterRuntime {
    cluster_id: ClusterId,
    engine: ConsensusEngine,
    pipeline: InstructionPipeline,
    attestor: AttestationAggregator,
    identity: Arc<NodeIdentity>,
    params: ProtocolParams,
    /// Non-members hold a runtime too (for relay bookkeeping and status
    /// queries) but never propose or vote.
    member: bool,
    /// Local status index for ids the ledger does not know (pending,
    /// validated, rejected, expired outbound).
    statuses: HashMap<InstructionId, InstructionStatus>,
    metrics: Arc<NodeMetrics>,
}

impl ClusterRuntime {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        cluster_id: ClusterId,
        engine: ConsensusEngine,
        pipeline: InstructionPipeline,
        attestor: AttestationAggregator,
        identity: Arc<NodeIdentity>,
        params: ProtocolParams,
        member: bool,
        metrics: Arc<NodeMetrics>,
    ) -> Self {
        Self {
            cluster_id,
            engine,
            pipeline,
            attestor,
            identity,
            params,
            member,
            statuses: HashMap::new(),
            metrics,
        }
    }

    pub fn cluster_id(&self) -> &ClusterId {
        &self.cluster_id
    }

    pub fn is_member(&self) -> bool {
        self.member
    }

    pub fn engine(&self) -> &ConsensusEngine {
        &self.engine
    }

    pub fn pipeline(&self) -> &InstructionPipeline {
        &self.pipeline
    }

    pub fn pending_len(&self) -> usize {
        self.engine.pending_len()
    }

    // ── Submission interface ────────────────────────────────────────────

    /// Submit a locally originated instruction.
    ///
    /// Synchronous verdict: validation and fee run now; consensus
    /// finality arrives through [`status`](Self::status).
    pub fn submit_local(
        &mut self,
        instruction: Instruction,
    ) -> Result<SubmitReceipt, NodeError> {
        let id = instruction.id;
        let fee = match self.pipeline.preflight(&instruction) {
            Ok(fee) => fee,
            Err(e) => {
                self.statuses.insert(id, InstructionStatus::Rejected);
                self.metrics.instructions_rejected.inc();
                return Err(e.into());
            }
        };
        self.engine.submit_pending(instruction)?;
        self.statuses.insert(id, InstructionStatus::Validated);
        Ok(SubmitReceipt { id, fee })
    }

    /// Withdraw a pending local instruction. Refused once it is inside a
    /// proposed block.
    pub fn withdraw_local(&mut self, id: &InstructionId) -> Result<(), NodeError> {
        self.engine.withdraw_pending(id)?;
        self.statuses.remove(id);
        Ok(())
    }

    /// Current status of an instruction id on this cluster.
    pub fn status(&self, id: &InstructionId) -> Option<InstructionStatus> {
        match self.pipeline.ledger().is_committed(id) {
            Ok(true) => Some(InstructionStatus::Committed),
            _ => self.statuses.get(id).copied(),
        }
    }

    /// Account read model.
    pub fn account(&self, address: &lattice_types::AccountAddress) -> Option<AccountView> {
        self.pipeline
            .ledger()
            .account(address)
            .ok()
            .map(|record| AccountView {
                address: record.address.to_string(),
                balance: record.balance,
                nonce: record.nonce,
            })
    }

    // ── Round driving ───────────────────────────────────────────────────

    /// One timer tick: finalize, time out, apply governance between
    /// rounds, propose when it is our turn, and sweep expired attestation
    /// rounds. Returns gossip to flood.
    pub fn tick(
        &mut self,
        now: Timestamp,
        governance: &mut GovernanceQueue,
    ) -> Vec<GossipMessage> {
        let mut outbox = Vec::new();

        if let Some(finalized) = self.engine.try_finalize(now) {
            self.metrics.blocks_finalized.inc();
            self.apply_finalized_block(&finalized.block, &finalized.instructions, now);
            if finalized.block.height % self.params.snapshot_interval_blocks == 0 {
                match self.pipeline.ledger().take_snapshot(finalized.block.height) {
                    Ok(snapshot) => outbox.push(self.snapshot_announcement(&snapshot, now)),
                    Err(e) => tracing::error!(cluster = %self.cluster_id, %e, "snapshot failed"),
                }
            }
        }

        if self.engine.check_round_timeout(now) {
            self.metrics.rounds_abandoned.inc();
        }

        if !self.engine.has_active_round() {
            for action in governance.drain_for(&self.cluster_id) {
                self.apply_governance(action);
            }
        }

        if self.should_propose() {
            let pipeline = self.pipeline.clone();
            match self
                .engine
                .propose_round(now, move |i| pipeline.nonce_is_current(i))
            {
                Ok(block) => {
                    let bodies = self.engine.round_instructions().to_vec();
                    let hash = block.hash();
                    outbox.push(self.proposal_message(block, bodies, now));
                    if let Some(vote) = self.vote_own(hash, now) {
                        outbox.push(vote);
                    }
                }
                Err(e) => {
                    tracing::debug!(cluster = %self.cluster_id, %e, "proposal skipped")
                }
            }
        }

        for expired in self.attestor.sweep_expired(now) {
            self.metrics.attestations_expired.inc();
            self.statuses.insert(
                expired.message.instruction_id,
                InstructionStatus::Rejected,
            );
            tracing::warn!(
                cluster = %self.cluster_id,
                dest = %expired.message.dest_cluster,
                instruction = %expired.message.instruction_id,
                collected = expired.collected_weight,
                required = expired.required_weight,
                "cross-cluster message expired, instruction dropped"
            );
        }

        outbox
    }

    fn should_propose(&self) -> bool {
        if !self.member || self.engine.has_active_round() {
            return false;
        }
        let our_turn = self
            .engine
            .current_proposer()
            .map(|d| d.public_key == self.identity.public_key())
            .unwrap_or(false);
        our_turn
            && self
                .engine
                .has_candidate(|i| self.pipeline.nonce_is_current(i))
    }

    /// Run every instruction of a finalized block through the pipeline,
    /// in block order. Rejections do not unwind the block — each
    /// instruction commits or fails on its own.
    fn apply_finalized_block(
        &mut self,
        block: &Block,
        instructions: &[Instruction],
        now: Timestamp,
    ) {
        for instruction in instructions {
            match self.pipeline.execute(instruction, block.height, now) {
                Ok(ExecuteOutcome::Committed { .. })
                | Ok(ExecuteOutcome::AlreadyCommitted { .. }) => {
                    self.statuses
                        .insert(instruction.id, InstructionStatus::Committed);
                    self.metrics.instructions_committed.inc();
                }
                Err(e) => {
                    self.statuses
                        .insert(instruction.id, InstructionStatus::Rejected);
                    self.metrics.instructions_rejected.inc();
                    tracing::warn!(
                        cluster = %self.cluster_id,
                        instruction = %instruction.id,
                        %e,
                        "finalized instruction rejected by pipeline"
                    );
                }
            }
        }
    }

    // ── Gossip intake ───────────────────────────────────────────────────

    /// A proposal arrived; install the round and vote if we are an active
    /// delegate.
    pub fn handle_proposal(
        &mut self,
        block: Block,
        bodies: Vec<Instruction>,
        now: Timestamp,
    ) -> Result<Vec<GossipMessage>, NodeError> {
        let hash = self.engine.receive_proposal(block, bodies, now)?;
        let mut outbox = Vec::new();
        if self.member {
            if let Some(vote) = self.vote_own(hash, now) {
                outbox.push(vote);
            }
        }
        Ok(outbox)
    }

    /// A delegate's vote arrived.
    pub fn handle_vote(
        &mut self,
        voter: PublicKey,
        target: BlockHash,
        signature: Signature,
        now: Timestamp,
    ) -> Result<(), NodeError> {
        match self.engine.cast_vote(voter, target, signature, now)? {
            CastVoteResult::Equivocation(proof) => {
                self.metrics.equivocations_detected.inc();
                tracing::warn!(
                    cluster = %self.cluster_id,
                    delegate = ?proof.delegate,
                    height = proof.height,
                    "equivocation proof recorded"
                );
            }
            CastVoteResult::Recorded { .. }
            | CastVoteResult::Duplicate
            | CastVoteResult::Cached
            | CastVoteResult::Ignored => {}
        }
        Ok(())
    }

    /// Sign and record our own vote for `target`, when we are an active
    /// delegate of this cluster.
    fn vote_own(&mut self, target: BlockHash, now: Timestamp) -> Option<GossipMessage> {
        let own_key = self.identity.public_key();
        if !self.engine.delegates().is_active(&own_key) {
            return None;
        }
        let signature =
            lattice_crypto::sign_message(target.as_bytes(), &self.identity.keys().private);
        if let Err(e) = self.engine.cast_vote(own_key, target, signature, now) {
            tracing::error!(cluster = %self.cluster_id, %e, "own vote rejected");
            return None;
        }
        Some(GossipMessage::Vote(VoteMessage {
            header: MessageHeader::new(
                MessageKind::Vote,
                self.cluster_id.clone(),
                self.engine.height(),
                now,
            ),
            block_hash: target,
            voter: own_key,
            signature,
        }))
    }

    // ── Cross-cluster (origin side) ─────────────────────────────────────

    /// Start collecting attestations for an outbound instruction.
    ///
    /// The referenced snapshot is the newest finalized one; trusted peers
    /// re-validate against exactly that state.
    pub fn open_outbound(
        &mut self,
        dest: ClusterId,
        instruction: Instruction,
        now: Timestamp,
    ) -> Result<u64, NodeError> {
        let snapshot_height = self
            .pipeline
            .ledger()
            .latest_snapshot_height()?
            .ok_or_else(|| {
                NodeError::Config("no finalized snapshot to attest against yet".into())
            })?;
        let id = instruction.id;
        self.attestor
            .open_round(dest, instruction, snapshot_height, now)?;
        self.statuses.insert(id, InstructionStatus::Pending);
        Ok(snapshot_height)
    }

    /// Withdraw an outbound message before it reaches threshold.
    pub fn withdraw_outbound(&mut self, id: &InstructionId) -> Result<(), NodeError> {
        self.attestor.withdraw(id)?;
        self.statuses.remove(id);
        Ok(())
    }

    /// A trusted peer's attestation arrived. Returns the finalized
    /// message once threshold weight accumulates — the node routes its
    /// instruction into the destination cluster's pipeline.
    pub fn handle_attestation(
        &mut self,
        message: &AttestationMessage,
        now: Timestamp,
    ) -> Result<Option<FinalizedAttestation>, NodeError> {
        let outcome = self.attestor.record_attestation(
            &message.instruction_id,
            &message.peer_cluster,
            message.payload_digest,
            message.signature,
            now,
        );
        match outcome {
            Ok(RecordOutcome::Finalized(finalized)) => {
                self.metrics.attestations_finalized.inc();
                self.statuses
                    .insert(finalized.message.instruction_id, InstructionStatus::Validated);
                Ok(Some(finalized))
            }
            Ok(_) => Ok(None),
            // Gossip redelivery after completion is routine, not an error.
            Err(AttestorError::AlreadyFinalized(_)) | Err(AttestorError::UnknownRound(_)) => {
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn outbound_status(&self, id: &InstructionId) -> Option<AttestationStatus> {
        self.attestor.round_status(id)
    }

    // ── Cross-cluster (trusted-peer side) ───────────────────────────────

    /// Re-validate a foreign cluster's outbound instruction against its
    /// snapshot and sign an attestation — run when this cluster is a
    /// trusted peer of `origin`.
    pub fn attest_foreign(
        &self,
        origin: &ClusterId,
        dest: &ClusterId,
        instruction: &Instruction,
        snapshot: &ClusterSnapshot,
        now: Timestamp,
    ) -> Result<AttestationMessage, NodeError> {
        let (digest, signature) =
            sign_attestation(origin, dest, instruction, snapshot, self.identity.keys())?;
        Ok(AttestationMessage {
            header: MessageHeader::new(
                MessageKind::Attestation,
                origin.clone(),
                snapshot.height,
                now,
            ),
            dest_cluster: dest.clone(),
            instruction_id: instruction.id,
            snapshot_height: snapshot.height,
            peer_cluster: self.cluster_id.clone(),
            payload_digest: digest,
            signature,
        })
    }

    // ── Cross-cluster (destination side) ────────────────────────────────

    /// Commit an attested foreign instruction through the pipeline,
    /// bypassing local DPoS — cross-cluster consensus already happened.
    pub fn execute_external(
        &mut self,
        instruction: &Instruction,
        now: Timestamp,
    ) -> Result<ExecuteOutcome, NodeError> {
        let outcome = self
            .pipeline
            .execute(instruction, self.engine.height(), now);
        match &outcome {
            Ok(_) => {
                self.statuses
                    .insert(instruction.id, InstructionStatus::Committed);
                self.metrics.instructions_committed.inc();
            }
            Err(_) => {
                self.statuses
                    .insert(instruction.id, InstructionStatus::Rejected);
                self.metrics.instructions_rejected.inc();
            }
        }
        Ok(outcome?)
    }

    // ── Governance ──────────────────────────────────────────────────────

    /// Apply one governance action. Only called between rounds.
    fn apply_governance(&mut self, action: GovernanceAction) {
        use GovernanceAction::*;
        let result = match action {
            AddDelegate {
                public_key, stake, ..
            } => self
                .engine
                .add_delegate(lattice_consensus::Delegate::new(public_key, stake))
                .map_err(NodeError::from),
            RemoveDelegate { public_key, .. } => self
                .engine
                .remove_delegate(&public_key)
                .map_err(NodeError::from),
            AddTrustedPeer { peer, .. } => {
                if self.attestor.add_trusted_peer(peer) {
                    Ok(())
                } else {
                    Err(NodeError::Config("trusted peer already registered".into()))
                }
            }
            RemoveTrustedPeer { peer_cluster, .. } => {
                if self.attestor.remove_trusted_peer(&peer_cluster) {
                    Ok(())
                } else {
                    Err(NodeError::Config("unknown trusted peer".into()))
                }
            }
            ReinstateTrustedPeer { peer_cluster, .. } => {
                if self.attestor.reinstate_trusted_peer(&peer_cluster) {
                    Ok(())
                } else {
                    Err(NodeError::Config("peer is not quarantined".into()))
                }
            }
        };
        if let Err(e) = result {
            tracing::warn!(cluster = %self.cluster_id, %e, "governance action refused");
        }
    }

    // ── Message builders ────────────────────────────────────────────────

    fn proposal_message(
        &self,
        block: Block,
        instructions: Vec<Instruction>,
        now: Timestamp,
    ) -> GossipMessage {
        GossipMessage::BlockProposal(BlockProposalMessage {
            header: MessageHeader::new(
                MessageKind::BlockProposal,
                self.cluster_id.clone(),
                block.height,
                now,
            ),
            block,
            instructions,
        })
    }

    fn snapshot_announcement(
        &self,
        snapshot: &ClusterSnapshot,
        now: Timestamp,
    ) -> GossipMessage {
        GossipMessage::SnapshotAnnouncement(SnapshotAnnouncementMessage {
            header: MessageHeader::new(
                MessageKind::SnapshotAnnouncement,
                self.cluster_id.clone(),
                snapshot.height,
                now,
            ),
            snapshot_hash: snapshot.hash,
        })
    }
}
