//! Gossip message types for lattice node-to-node communication.
//!
//! Every message is self-describing: the header carries the cluster id and
//! height/round coordinates, so a relay node can forward correctly without
//! being a member of the cluster — it never needs to open the body.

use lattice_consensus::Block;
use lattice_instructions::Instruction;
use lattice_types::{
    BlockHash, ClusterId, InstructionId, PublicKey, Signature, Timestamp,
};
use serde::{Deserialize, Serialize};

/// Wire protocol version.
pub const PROTOCOL_VERSION: u16 = 1;

/// All gossip message kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageKind {
    Keepalive,
    BlockProposal,
    Vote,
    Attestation,
    SnapshotAnnouncement,
}

/// Header present on every gossip message.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MessageHeader {
    pub kind: MessageKind,
    pub protocol_version: u16,
    /// The cluster this message belongs to.
    pub cluster_id: ClusterId,
    /// Height/round coordinate (0 where not meaningful, e.g. keepalive).
    pub height: u64,
    pub timestamp: Timestamp,
}

impl MessageHeader {
    pub fn new(kind: MessageKind, cluster_id: ClusterId, height: u64, now: Timestamp) -> Self {
        Self {
            kind,
            protocol_version: PROTOCOL_VERSION,
            cluster_id,
            height,
            timestamp: now,
        }
    }
}

/// A peer's network address.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerAddress {
    pub ip: String,
    pub port: u16,
}

/// Keepalive with known-peer addresses for discovery.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct KeepaliveMessage {
    pub header: MessageHeader,
    pub peers: Vec<PeerAddress>,
}

/// A proposed block with the full instruction bodies, so voters can
/// validate without a fetch round-trip.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BlockProposalMessage {
    pub header: MessageHeader,
    pub block: Block,
    pub instructions: Vec<Instruction>,
}

/// One delegate's vote on a proposed block.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VoteMessage {
    pub header: MessageHeader,
    pub block_hash: BlockHash,
    pub voter: PublicKey,
    pub signature: Signature,
}

/// One trusted peer's attestation for an outbound instruction.
///
/// The header's cluster id names the *origin* cluster whose aggregator
/// collects this.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AttestationMessage {
    pub header: MessageHeader,
    pub dest_cluster: ClusterId,
    pub instruction_id: InstructionId,
    pub snapshot_height: u64,
    /// The attesting peer cluster.
    pub peer_cluster: ClusterId,
    /// Digest the peer signed (binds origin, dest, id, snapshot hash).
    pub payload_digest: [u8; 32],
    pub signature: Signature,
}

/// Announcement that a finalized snapshot exists at a height.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SnapshotAnnouncementMessage {
    pub header: MessageHeader,
    pub snapshot_hash: [u8; 32],
}

/// The envelope carried on the wire.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum GossipMessage {
    Keepalive(KeepaliveMessage),
    BlockProposal(BlockProposalMessage),
    Vote(VoteMessage),
    Attestation(AttestationMessage),
    SnapshotAnnouncement(SnapshotAnnouncementMessage),
}

impl GossipMessage {
    pub fn header(&self) -> &MessageHeader {
        match self {
            Self::Keepalive(m) => &m.header,
            Self::BlockProposal(m) => &m.header,
            Self::Vote(m) => &m.header,
            Self::Attestation(m) => &m.header,
            Self::SnapshotAnnouncement(m) => &m.header,
        }
    }

    /// The cluster a relay routes this message by.
    pub fn cluster_id(&self) -> &ClusterId {
        &self.header().cluster_id
    }

    pub fn kind(&self) -> MessageKind {
        self.header().kind
    }
}
