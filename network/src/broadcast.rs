//! Flood-based message broadcasting.
//!
//! The [`Broadcaster`] does not write to sockets. It pushes
//! `(peer_id, frame_bytes)` tuples onto an `mpsc` channel that the
//! connection layer drains, so consensus code never blocks on a slow
//! peer.

use rand::seq::SliceRandom;
use tokio::sync::mpsc;

use crate::peer_manager::PeerState;

/// Outcome of a broadcast attempt.
#[derive(Clone, Debug, Default)]
pub struct BroadcastResult {
    /// Peers the frame was queued for.
    pub sent: usize,
    /// Peers whose outbound queue was full or closed.
    pub failed: usize,
}

/// Queue-based flood broadcaster.
#[derive(Clone)]
pub struct Broadcaster {
    outbound_tx: mpsc::Sender<(String, Vec<u8>)>,
}

impl Broadcaster {
    pub fn new(outbound_tx: mpsc::Sender<(String, Vec<u8>)>) -> Self {
        Self { outbound_tx }
    }

    /// Queue a frame for every connected peer.
    pub fn broadcast_to_all(&self, frame: &[u8], peers: &[PeerState]) -> BroadcastResult {
        let mut result = BroadcastResult::default();
        for peer in peers.iter().filter(|p| p.connected) {
            match self.outbound_tx.try_send((peer.id(), frame.to_vec())) {
                Ok(()) => result.sent += 1,
                Err(_) => result.failed += 1,
            }
        }
        result
    }

    /// Queue a frame for up to `count` connected peers chosen at random —
    /// re-gossip fanout.
    pub fn broadcast_to_subset(
        &self,
        frame: &[u8],
        peers: &[PeerState],
        count: usize,
    ) -> BroadcastResult {
        let eligible: Vec<&PeerState> = peers.iter().filter(|p| p.connected).collect();
        let mut indices: Vec<usize> = (0..eligible.len()).collect();
        indices.shuffle(&mut rand::thread_rng());
        indices.truncate(count);

        let mut result = BroadcastResult::default();
        for &i in &indices {
            match self.outbound_tx.try_send((eligible[i].id(), frame.to_vec())) {
                Ok(()) => result.sent += 1,
                Err(_) => result.failed += 1,
            }
        }
        result
    }
}
