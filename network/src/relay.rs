//! Membership-free relay.
//!
//! A node forwards gossip for clusters it does not belong to — the header
//! carries everything routing needs, so relays keep partitioned clusters
//! reachable. Dedup is the only gate: each frame is re-flooded at most
//! once.

use std::collections::{BTreeSet, HashMap};

use lattice_messages::GossipMessage;
use lattice_types::ClusterId;

use crate::codec::encode_frame;
use crate::dedup::MessageDedup;
use crate::NetworkError;

/// What to do with an inbound frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RelayDecision {
    /// Seen before — drop silently.
    Duplicate,
    /// First sighting of a member cluster's message: process locally and
    /// re-flood.
    DeliverAndForward,
    /// First sighting for a cluster this node is not a member of: re-flood
    /// only.
    ForwardOnly,
}

/// Relay gate combining dedup with cluster membership.
pub struct Relay {
    memberships: BTreeSet<ClusterId>,
    dedup: MessageDedup,
    /// Frames forwarded per cluster, for observability.
    forwarded: HashMap<ClusterId, u64>,
}

impl Relay {
    pub fn new(memberships: BTreeSet<ClusterId>, dedup: MessageDedup) -> Self {
        Self {
            memberships,
            dedup,
            forwarded: HashMap::new(),
        }
    }

    pub fn is_member(&self, cluster: &ClusterId) -> bool {
        self.memberships.contains(cluster)
    }

    /// Classify an inbound frame and record it as seen.
    pub fn decide(&mut self, frame_bytes: &[u8], message: &GossipMessage) -> RelayDecision {
        let hash = MessageDedup::hash_message(frame_bytes);
        if self.dedup.is_duplicate(&hash) {
            return RelayDecision::Duplicate;
        }
        let cluster = message.cluster_id().clone();
        *self.forwarded.entry(cluster.clone()).or_insert(0) += 1;
        if self.is_member(&cluster) {
            RelayDecision::DeliverAndForward
        } else {
            RelayDecision::ForwardOnly
        }
    }

    /// Register an outbound frame so our own flood does not bounce back
    /// through us.
    pub fn note_outbound(&mut self, message: &GossipMessage) -> Result<Vec<u8>, NetworkError> {
        let frame = encode_frame(message)?;
        let hash = MessageDedup::hash_message(&frame);
        self.dedup.is_duplicate(&hash);
        Ok(frame)
    }

    pub fn forwarded_count(&self, cluster: &ClusterId) -> u64 {
        self.forwarded.get(cluster).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lattice_messages::{MessageHeader, MessageKind, SnapshotAnnouncementMessage};
    use lattice_types::Timestamp;

    fn announcement(cluster: &str) -> GossipMessage {
        GossipMessage::SnapshotAnnouncement(SnapshotAnnouncementMessage {
            header: MessageHeader::new(
                MessageKind::SnapshotAnnouncement,
                ClusterId::new(cluster),
                9,
                Timestamp::new(50),
            ),
            snapshot_hash: [1u8; 32],
        })
    }

    fn relay(members: &[&str]) -> Relay {
        Relay::new(
            members.iter().map(|m| ClusterId::new(*m)).collect(),
            MessageDedup::new(64),
        )
    }

    #[test]
    fn member_cluster_messages_deliver_and_forward() {
        let mut relay = relay(&["chat"]);
        let message = announcement("chat");
        let frame = encode_frame(&message).unwrap();
        assert_eq!(
            relay.decide(&frame, &message),
            RelayDecision::DeliverAndForward
        );
    }

    #[test]
    fn non_member_messages_forward_only() {
        let mut relay = relay(&["chat"]);
        let message = announcement("finance");
        let frame = encode_frame(&message).unwrap();
        assert_eq!(relay.decide(&frame, &message), RelayDecision::ForwardOnly);
        assert_eq!(relay.forwarded_count(&ClusterId::new("finance")), 1);
    }

    #[test]
    fn duplicates_dropped_once_seen() {
        let mut relay = relay(&["chat"]);
        let message = announcement("chat");
        let frame = encode_frame(&message).unwrap();
        relay.decide(&frame, &message);
        assert_eq!(relay.decide(&frame, &message), RelayDecision::Duplicate);
    }

    #[test]
    fn own_outbound_frames_do_not_bounce() {
        let mut relay = relay(&["chat"]);
        let message = announcement("chat");
        let frame = relay.note_outbound(&message).unwrap();
        assert_eq!(relay.decide(&frame, &message), RelayDecision::Duplicate);
    }
}
