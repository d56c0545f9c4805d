//! The cross-cluster message — one instruction's attestation state.

use std::collections::BTreeMap;

use lattice_types::{AttestationStatus, ClusterId, InstructionId, Signature};
use serde::{Deserialize, Serialize};

/// An instruction in flight between clusters, with the attestations
/// collected so far.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CrossClusterMessage {
    pub origin_cluster: ClusterId,
    pub dest_cluster: ClusterId,
    pub instruction_id: InstructionId,
    /// Finalized origin-snapshot height the peers validate against.
    pub snapshot_height: u64,
    /// Signatures keyed by attesting peer cluster.
    pub attestations: BTreeMap<ClusterId, Signature>,
    pub status: AttestationStatus,
}

impl CrossClusterMessage {
    pub fn new(
        origin_cluster: ClusterId,
        dest_cluster: ClusterId,
        instruction_id: InstructionId,
        snapshot_height: u64,
    ) -> Self {
        Self {
            origin_cluster,
            dest_cluster,
            instruction_id,
            snapshot_height,
            attestations: BTreeMap::new(),
            status: AttestationStatus::Collecting,
        }
    }

    pub fn attestation_count(&self) -> usize {
        self.attestations.len()
    }
}
