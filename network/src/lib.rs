//! P2P networking for lattice nodes.
//!
//! Delivery is best-effort/at-least-once: the layers above (consensus,
//! attestation) tolerate duplicates and reordering through their own
//! idempotence, so this crate only has to keep messages moving — flood
//! broadcast, bounded dedup, reconnect backoff, and relay for clusters the
//! node is not a member of.

pub mod broadcast;
pub mod codec;
pub mod connection;
pub mod dedup;
pub mod error;
pub mod peer_manager;
pub mod relay;

pub use broadcast::{BroadcastResult, Broadcaster};
pub use codec::{decode_frame, encode_frame, FRAME_OVERHEAD, MAX_FRAME_PAYLOAD};
pub use connection::{read_frame, spawn_connection, write_frame, ConnectionRegistry};
pub use dedup::MessageDedup;
pub use error::NetworkError;
pub use peer_manager::{PeerManager, PeerState};
pub use relay::{Relay, RelayDecision};
