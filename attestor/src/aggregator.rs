//! Attestation aggregation — the running weight total and threshold check.
//!
//! One aggregator serves one origin cluster. Rounds are keyed by
//! instruction id (the (origin, id) pair, since the origin is fixed), and
//! the finalized set is the cross-cluster dedup: a second round for an
//! already-finalized pair never opens.

use std::collections::{HashMap, HashSet};

use lattice_crypto::verify_signature;
use lattice_instructions::Instruction;
use lattice_types::{
    AttestationStatus, ClusterId, InstructionId, ProtocolParams, Signature, Timestamp,
};

use crate::message::CrossClusterMessage;
use crate::peers::{TrustedPeer, TrustedPeerSet};
use crate::AttestorError;

/// One open attestation round.
#[derive(Clone, Debug)]
struct AttestationRound {
    message: CrossClusterMessage,
    instruction: Instruction,
    /// First digest each peer signed — the conflict detector.
    peer_digests: HashMap<ClusterId, [u8; 32]>,
    /// Running signer-weight total.
    collected_weight: u128,
    opened_at: Timestamp,
}

/// Result of recording one attestation.
#[derive(Clone, Debug)]
pub enum RecordOutcome {
    /// Counted; threshold not yet met.
    Recorded { collected: u128, required: u128 },
    /// Same peer, same digest — idempotent no-op.
    Duplicate,
    /// Threshold met: the message finalized and the instruction is ready
    /// for the destination pipeline.
    Finalized(FinalizedAttestation),
    /// Peer signed a different digest for this id: quarantined, its
    /// attestations for the id discarded.
    Conflict { peer: ClusterId },
    /// Not counted (quarantined peer).
    Ignored,
    /// The round's window elapsed before threshold; the message expired.
    Expired,
}

/// A message that crossed the threshold.
#[derive(Clone, Debug)]
pub struct FinalizedAttestation {
    pub message: CrossClusterMessage,
    pub instruction: Instruction,
}

/// A round that expired below threshold — reported to the originator.
#[derive(Clone, Debug)]
pub struct ExpiredRound {
    pub message: CrossClusterMessage,
    pub collected_weight: u128,
    pub required_weight: u128,
}

/// Aggregates trusted-peer attestations for one origin cluster's outbound
/// instructions.
pub struct AttestationAggregator {
    origin: ClusterId,
    peers: TrustedPeerSet,
    params: ProtocolParams,
    rounds: HashMap<InstructionId, AttestationRound>,
    /// Dedup of (origin, id) pairs that already finalized.
    finalized: HashSet<InstructionId>,
}

impl AttestationAggregator {
    pub fn new(origin: ClusterId, peers: TrustedPeerSet, params: ProtocolParams) -> Self {
        Self {
            origin,
            peers,
            params,
            rounds: HashMap::new(),
            finalized: HashSet::new(),
        }
    }

    pub fn origin(&self) -> &ClusterId {
        &self.origin
    }

    pub fn peers(&self) -> &TrustedPeerSet {
        &self.peers
    }

    pub fn open_rounds(&self) -> usize {
        self.rounds.len()
    }

    /// Weight required to finalize right now.
    pub fn required_weight(&self) -> u128 {
        self.params.attestation_weight(self.peers.total_weight())
    }

    pub fn round_status(&self, id: &InstructionId) -> Option<AttestationStatus> {
        if self.finalized.contains(id) {
            return Some(AttestationStatus::Finalized);
        }
        self.rounds.get(id).map(|r| r.message.status)
    }

    // ── Round lifecycle ─────────────────────────────────────────────────

    /// Open a collection round for an outbound instruction.
    pub fn open_round(
        &mut self,
        dest: ClusterId,
        instruction: Instruction,
        snapshot_height: u64,
        now: Timestamp,
    ) -> Result<(), AttestorError> {
        let id = instruction.id;
        if self.finalized.contains(&id) {
            return Err(AttestorError::AlreadyFinalized(id));
        }
        if self.rounds.contains_key(&id) {
            return Err(AttestorError::DuplicateRound(id));
        }
        let message =
            CrossClusterMessage::new(self.origin.clone(), dest, id, snapshot_height);
        self.rounds.insert(
            id,
            AttestationRound {
                message,
                instruction,
                peer_digests: HashMap::new(),
                collected_weight: 0,
                opened_at: now,
            },
        );
        Ok(())
    }

    /// Record one peer's attestation.
    ///
    /// The signature must verify over `digest` with the peer's registered
    /// key. Weight accumulates in a running total checked against the
    /// threshold exactly once per arrival, so concurrent delivery through
    /// the runtime's lock can never finalize twice.
    pub fn record_attestation(
        &mut self,
        id: &InstructionId,
        peer_cluster: &ClusterId,
        digest: [u8; 32],
        signature: Signature,
        now: Timestamp,
    ) -> Result<RecordOutcome, AttestorError> {
        if self.finalized.contains(id) {
            return Err(AttestorError::AlreadyFinalized(*id));
        }
        if !self.rounds.contains_key(id) {
            return Err(AttestorError::UnknownRound(*id));
        }

        // Lazy expiry: an attestation landing after the window closes the
        // round rather than counting.
        if self.expire_if_due(id, now) {
            return Ok(RecordOutcome::Expired);
        }

        let peer = self
            .peers
            .get(peer_cluster)
            .ok_or_else(|| AttestorError::UnknownPeer(peer_cluster.clone()))?;
        if peer.quarantined {
            return Ok(RecordOutcome::Ignored);
        }
        if !verify_signature(&digest, &signature, &peer.public_key) {
            return Err(AttestorError::InvalidSignature(peer_cluster.clone()));
        }
        let peer_weight = peer.weight;

        let round = self.rounds.get_mut(id).expect("presence checked above");
        match round.peer_digests.get(peer_cluster).copied() {
            Some(first) if first != digest => {
                // Conflicting payloads under one id: quarantine the peer
                // and drop its contribution to this round.
                round.peer_digests.remove(peer_cluster);
                if round.message.attestations.remove(peer_cluster).is_some() {
                    round.collected_weight =
                        round.collected_weight.saturating_sub(peer_weight);
                }
                self.peers.quarantine(peer_cluster);
                tracing::warn!(
                    origin = %self.origin,
                    peer = %peer_cluster,
                    instruction = %id,
                    "trusted peer signed conflicting attestations, quarantined"
                );
                return Ok(RecordOutcome::Conflict {
                    peer: peer_cluster.clone(),
                });
            }
            Some(_) => return Ok(RecordOutcome::Duplicate),
            None => {}
        }

        round.peer_digests.insert(peer_cluster.clone(), digest);
        round
            .message
            .attestations
            .insert(peer_cluster.clone(), signature);
        round.collected_weight = round.collected_weight.saturating_add(peer_weight);

        let collected = round.collected_weight;
        let required = self.params.attestation_weight(self.peers.total_weight());
        if collected >= required {
            let mut round = self.rounds.remove(id).expect("present");
            round.message.status = AttestationStatus::Finalized;
            self.finalized.insert(*id);
            tracing::info!(
                origin = %self.origin,
                dest = %round.message.dest_cluster,
                instruction = %id,
                collected,
                required,
                "cross-cluster message finalized"
            );
            return Ok(RecordOutcome::Finalized(FinalizedAttestation {
                message: round.message,
                instruction: round.instruction,
            }));
        }
        Ok(RecordOutcome::Recorded {
            collected,
            required,
        })
    }

    /// Withdraw a collecting round — the originator changed its mind.
    /// Refused once the message finalized.
    pub fn withdraw(&mut self, id: &InstructionId) -> Result<(), AttestorError> {
        if self.finalized.contains(id) {
            return Err(AttestorError::NotWithdrawable(*id));
        }
        self.rounds
            .remove(id)
            .map(|_| ())
            .ok_or(AttestorError::UnknownRound(*id))
    }

    /// Expire every round whose window elapsed; the caller notifies each
    /// originator.
    pub fn sweep_expired(&mut self, now: Timestamp) -> Vec<ExpiredRound> {
        let window = self.params.attestation_window_secs;
        let required = self.params.attestation_weight(self.peers.total_weight());
        let due: Vec<InstructionId> = self
            .rounds
            .iter()
            .filter(|(_, r)| r.opened_at.window_elapsed(window, now))
            .map(|(id, _)| *id)
            .collect();

        due.into_iter()
            .filter_map(|id| self.rounds.remove(&id))
            .map(|mut round| {
                round.message.status = AttestationStatus::Expired;
                tracing::debug!(
                    origin = %self.origin,
                    instruction = %round.message.instruction_id,
                    collected = round.collected_weight,
                    required,
                    "attestation round expired below threshold"
                );
                ExpiredRound {
                    collected_weight: round.collected_weight,
                    required_weight: required,
                    message: round.message,
                }
            })
            .collect()
    }

    fn expire_if_due(&mut self, id: &InstructionId, now: Timestamp) -> bool {
        let window = self.params.attestation_window_secs;
        let due = self
            .rounds
            .get(id)
            .map(|r| r.opened_at.window_elapsed(window, now))
            .unwrap_or(false);
        if due {
            if let Some(round) = self.rounds.get_mut(id) {
                round.message.status = AttestationStatus::Expired;
            }
            // Keep the expired round until the sweep reports it.
        }
        due
    }

    // ── Governance (trusted-peer table) ─────────────────────────────────

    pub fn add_trusted_peer(&mut self, peer: TrustedPeer) -> bool {
        self.peers.add(peer)
    }

    pub fn remove_trusted_peer(&mut self, cluster: &ClusterId) -> bool {
        self.peers.remove(cluster)
    }

    pub fn reinstate_trusted_peer(&mut self, cluster: &ClusterId) -> bool {
        self.peers.reinstate(cluster)
    }
}
