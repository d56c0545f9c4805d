//! Peer tracking with reconnect backoff and scoring.
//!
//! An unreachable peer is retried with exponential backoff, capped so a
//! long outage does not freeze rediscovery. This is transparent to the
//! layers above: consensus keeps making progress as long as quorum is
//! reachable through the peers that remain.

use std::collections::HashMap;

use lattice_messages::PeerAddress;

/// Initial reconnect delay.
const BACKOFF_BASE_SECS: u64 = 2;
/// Longest reconnect delay.
const BACKOFF_MAX_SECS: u64 = 300;
/// Penalty applied per protocol violation; peers below the floor are
/// dropped from the table.
const VIOLATION_PENALTY: i32 = -50;
const SCORE_FLOOR: i32 = -200;
const SCORE_CEIL: i32 = 100;

/// Per-peer state tracked by the [`PeerManager`].
#[derive(Clone, Debug)]
pub struct PeerState {
    pub address: PeerAddress,
    pub connected: bool,
    pub last_seen_secs: u64,
    /// Reputation score, clamped to the floor/ceiling.
    pub score: i32,
    /// Consecutive failed connection attempts.
    pub failures: u32,
    /// Earliest time (seconds) the next reconnect may run.
    pub next_retry_secs: u64,
}

impl PeerState {
    pub fn new(address: PeerAddress) -> Self {
        Self {
            address,
            connected: false,
            last_seen_secs: 0,
            score: 0,
            failures: 0,
            next_retry_secs: 0,
        }
    }

    /// Canonical `"ip:port"` key.
    pub fn id(&self) -> String {
        format!("{}:{}", self.address.ip, self.address.port)
    }
}

/// Registry of known peers.
pub struct PeerManager {
    peers: HashMap<String, PeerState>,
    max_peers: usize,
}

impl PeerManager {
    pub fn new(max_peers: usize) -> Self {
        Self {
            peers: HashMap::new(),
            max_peers,
        }
    }

    fn key(address: &PeerAddress) -> String {
        format!("{}:{}", address.ip, address.port)
    }

    /// Track a discovered peer. Ignored at capacity or when already known.
    pub fn add_peer(&mut self, address: PeerAddress) -> bool {
        let key = Self::key(&address);
        if self.peers.contains_key(&key) || self.peers.len() >= self.max_peers {
            return false;
        }
        self.peers.insert(key, PeerState::new(address));
        true
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    pub fn connected_count(&self) -> usize {
        self.peers.values().filter(|p| p.connected).count()
    }

    pub fn peers(&self) -> Vec<PeerState> {
        self.peers.values().cloned().collect()
    }

    pub fn get(&self, address: &PeerAddress) -> Option<&PeerState> {
        self.peers.get(&Self::key(address))
    }

    /// Mark a connection established; resets backoff.
    pub fn mark_connected(&mut self, address: &PeerAddress, now_secs: u64) {
        if let Some(peer) = self.peers.get_mut(&Self::key(address)) {
            peer.connected = true;
            peer.last_seen_secs = now_secs;
            peer.failures = 0;
            peer.next_retry_secs = 0;
        }
    }

    /// Mark a connection lost or failed; schedules the next retry with
    /// exponential backoff (2s, 4s, 8s, … capped at 5 minutes).
    pub fn mark_disconnected(&mut self, address: &PeerAddress, now_secs: u64) {
        if let Some(peer) = self.peers.get_mut(&Self::key(address)) {
            peer.connected = false;
            peer.failures = peer.failures.saturating_add(1);
            let delay = BACKOFF_BASE_SECS
                .saturating_mul(1u64 << peer.failures.min(16))
                .min(BACKOFF_MAX_SECS);
            peer.next_retry_secs = now_secs.saturating_add(delay);
            tracing::debug!(peer = %peer.id(), failures = peer.failures, retry_in = delay, "peer disconnected");
        }
    }

    /// Record liveness evidence (any valid inbound traffic).
    pub fn mark_seen(&mut self, address: &PeerAddress, now_secs: u64) {
        if let Some(peer) = self.peers.get_mut(&Self::key(address)) {
            peer.last_seen_secs = now_secs;
            peer.score = (peer.score + 1).min(SCORE_CEIL);
        }
    }

    /// Penalize a misbehaving peer; drops it once it falls through the
    /// score floor.
    pub fn penalize(&mut self, address: &PeerAddress) {
        let key = Self::key(address);
        let drop_peer = match self.peers.get_mut(&key) {
            Some(peer) => {
                peer.score = (peer.score + VIOLATION_PENALTY).max(SCORE_FLOOR);
                peer.score <= SCORE_FLOOR
            }
            None => false,
        };
        if drop_peer {
            self.peers.remove(&key);
            tracing::warn!(peer = %key, "peer dropped for repeated violations");
        }
    }

    /// Disconnected peers whose backoff delay has elapsed.
    pub fn due_for_retry(&self, now_secs: u64) -> Vec<PeerAddress> {
        self.peers
            .values()
            .filter(|p| !p.connected && p.next_retry_secs <= now_secs)
            .map(|p| p.address.clone())
            .collect()
    }
}
