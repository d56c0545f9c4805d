//! Node identity — key pair and cluster memberships, fixed for the
//! process lifetime.

use std::collections::BTreeSet;

use lattice_crypto::keypair_from_seed;
use lattice_types::{ClusterId, KeyPair, NodeId, PublicKey};

/// The immutable identity of a running node.
pub struct NodeIdentity {
    node_id: NodeId,
    keys: KeyPair,
    memberships: BTreeSet<ClusterId>,
}

impl NodeIdentity {
    /// Derive the identity from the configured seed. The same seed always
    /// yields the same node id, so restarts keep the identity.
    pub fn from_seed(seed: &[u8; 32], memberships: BTreeSet<ClusterId>) -> Self {
        let keys = keypair_from_seed(seed);
        Self {
            node_id: NodeId::new(keys.public.0),
            keys,
            memberships,
        }
    }

    pub fn node_id(&self) -> NodeId {
        self.node_id
    }

    pub fn public_key(&self) -> PublicKey {
        self.keys.public
    }

    /// The private half stays inside this struct; components borrow the
    /// pair for signing and never copy it.
    pub fn keys(&self) -> &KeyPair {
        &self.keys
    }

    pub fn memberships(&self) -> &BTreeSet<ClusterId> {
        &self.memberships
    }

    pub fn is_member_of(&self, cluster: &ClusterId) -> bool {
        self.memberships.contains(cluster)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_is_deterministic() {
        let memberships: BTreeSet<ClusterId> = [ClusterId::new("chat")].into();
        let a = NodeIdentity::from_seed(&[9; 32], memberships.clone());
        let b = NodeIdentity::from_seed(&[9; 32], memberships);
        assert_eq!(a.node_id(), b.node_id());
        assert_eq!(a.public_key(), b.public_key());
    }

    #[test]
    fn membership_lookup() {
        let identity =
            NodeIdentity::from_seed(&[9; 32], [ClusterId::new("chat")].into());
        assert!(identity.is_member_of(&ClusterId::new("chat")));
        assert!(!identity.is_member_of(&ClusterId::new("finance")));
    }
}
