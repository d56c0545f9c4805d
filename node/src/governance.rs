//! Runtime governance — delegate and trusted-peer mutations.
//!
//! Actions queue here and the cluster runtime drains them only when no
//! round is in flight, so a membership change can never land mid-vote.

use lattice_attestor::TrustedPeer;
use lattice_types::{ClusterId, PublicKey};

/// A governance mutation for one cluster.
#[derive(Clone, Debug)]
pub enum GovernanceAction {
    AddDelegate {
        cluster: ClusterId,
        public_key: PublicKey,
        stake: u128,
    },
    RemoveDelegate {
        cluster: ClusterId,
        public_key: PublicKey,
    },
    AddTrustedPeer {
        cluster: ClusterId,
        peer: TrustedPeer,
    },
    RemoveTrustedPeer {
        cluster: ClusterId,
        peer_cluster: ClusterId,
    },
    /// Lift a conflicting peer's quarantine.
    ReinstateTrustedPeer {
        cluster: ClusterId,
        peer_cluster: ClusterId,
    },
}

impl GovernanceAction {
    pub fn cluster(&self) -> &ClusterId {
        match self {
            Self::AddDelegate { cluster, .. }
            | Self::RemoveDelegate { cluster, .. }
            | Self::AddTrustedPeer { cluster, .. }
            | Self::RemoveTrustedPeer { cluster, .. }
            | Self::ReinstateTrustedPeer { cluster, .. } => cluster,
        }
    }
}

/// Pending governance actions, drained per cluster between rounds.
#[derive(Debug, Default)]
pub struct GovernanceQueue {
    pending: Vec<GovernanceAction>,
}

impl GovernanceQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, action: GovernanceAction) {
        self.pending.push(action);
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Remove and return every queued action for `cluster`, preserving
    /// order.
    pub fn drain_for(&mut self, cluster: &ClusterId) -> Vec<GovernanceAction> {
        let (matched, rest): (Vec<_>, Vec<_>) = self
            .pending
            .drain(..)
            .partition(|action| action.cluster() == cluster);
        self.pending = rest;
        matched
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drain_is_scoped_to_cluster() {
        let mut queue = GovernanceQueue::new();
        queue.push(GovernanceAction::RemoveDelegate {
            cluster: ClusterId::new("chat"),
            public_key: PublicKey([1; 32]),
        });
        queue.push(GovernanceAction::RemoveDelegate {
            cluster: ClusterId::new("finance"),
            public_key: PublicKey([2; 32]),
        });

        let drained = queue.drain_for(&ClusterId::new("chat"));
        assert_eq!(drained.len(), 1);
        assert_eq!(queue.len(), 1);
    }
}
