//! The trusted-peer table — clusters vouching for this cluster's output.

use std::collections::BTreeMap;

use lattice_types::{ClusterId, PublicKey};
use serde::{Deserialize, Serialize};

/// One trusted peer cluster: its attestation signing key and configured
/// weight.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustedPeer {
    pub cluster_id: ClusterId,
    /// Key the peer's attestation signatures verify against.
    pub public_key: PublicKey,
    pub weight: u128,
    /// Set when the peer issued conflicting attestations; quarantined
    /// weight leaves the threshold denominator until governance
    /// reinstates the peer.
    pub quarantined: bool,
    /// How many times this peer has been quarantined.
    pub offenses: u32,
}

impl TrustedPeer {
    pub fn new(cluster_id: ClusterId, public_key: PublicKey, weight: u128) -> Self {
        Self {
            cluster_id,
            public_key,
            weight,
            quarantined: false,
            offenses: 0,
        }
    }
}

/// The governance-managed trusted-peer table of one cluster.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TrustedPeerSet {
    peers: BTreeMap<ClusterId, TrustedPeer>,
}

impl TrustedPeerSet {
    pub fn new(peers: Vec<TrustedPeer>) -> Self {
        Self {
            peers: peers
                .into_iter()
                .map(|p| (p.cluster_id.clone(), p))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    pub fn get(&self, cluster: &ClusterId) -> Option<&TrustedPeer> {
        self.peers.get(cluster)
    }

    pub fn is_quarantined(&self, cluster: &ClusterId) -> bool {
        self.peers.get(cluster).map(|p| p.quarantined).unwrap_or(false)
    }

    /// Weight of a peer in good standing; `None` if unknown or
    /// quarantined.
    pub fn weight_of(&self, cluster: &ClusterId) -> Option<u128> {
        self.peers
            .get(cluster)
            .filter(|p| !p.quarantined)
            .map(|p| p.weight)
    }

    /// Threshold denominator: total weight of peers in good standing.
    pub fn total_weight(&self) -> u128 {
        self.peers
            .values()
            .filter(|p| !p.quarantined)
            .fold(0u128, |acc, p| acc.saturating_add(p.weight))
    }

    pub fn add(&mut self, peer: TrustedPeer) -> bool {
        if self.peers.contains_key(&peer.cluster_id) {
            return false;
        }
        self.peers.insert(peer.cluster_id.clone(), peer);
        true
    }

    pub fn remove(&mut self, cluster: &ClusterId) -> bool {
        self.peers.remove(cluster).is_some()
    }

    /// Quarantine a peer (conflicting attestation). Returns the weight
    /// that left the denominator; `None` if unknown or already
    /// quarantined.
    pub fn quarantine(&mut self, cluster: &ClusterId) -> Option<u128> {
        let peer = self
            .peers
            .get_mut(cluster)
            .filter(|p| !p.quarantined)?;
        peer.quarantined = true;
        peer.offenses += 1;
        Some(peer.weight)
    }

    /// Governance-gated reinstatement of a quarantined peer.
    pub fn reinstate(&mut self, cluster: &ClusterId) -> bool {
        match self.peers.get_mut(cluster) {
            Some(peer) if peer.quarantined => {
                peer.quarantined = false;
                true
            }
            _ => false,
        }
    }
}
