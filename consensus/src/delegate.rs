//! Delegate identity, stake, and deterministic proposer rotation.

use lattice_types::PublicKey;
use serde::{Deserialize, Serialize};

/// A staked participant authorized to propose and vote.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delegate {
    pub public_key: PublicKey,
    /// Determines both rotation rank and vote weight.
    pub stake: u128,
    /// Cleared on detected equivocation, never set back automatically.
    pub active: bool,
}

impl Delegate {
    pub fn new(public_key: PublicKey, stake: u128) -> Self {
        Self {
            public_key,
            stake,
            active: true,
        }
    }
}

/// The ordered delegate set of one cluster.
///
/// Rotation order is active delegates sorted by (stake descending, public
/// key ascending) — deterministic for every node given the same set. The
/// proposer for a given height and attempt is `ranked[(height + attempt) %
/// len]`, so an abandoned round hands duty to the next delegate without
/// advancing the height.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DelegateSet {
    delegates: Vec<Delegate>,
}

impl DelegateSet {
    pub fn new(delegates: Vec<Delegate>) -> Self {
        Self { delegates }
    }

    pub fn len(&self) -> usize {
        self.delegates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.delegates.is_empty()
    }

    pub fn get(&self, key: &PublicKey) -> Option<&Delegate> {
        self.delegates.iter().find(|d| &d.public_key == key)
    }

    pub fn is_active(&self, key: &PublicKey) -> bool {
        self.get(key).map(|d| d.active).unwrap_or(false)
    }

    /// Vote weight of an active delegate; `None` if unknown or inactive.
    pub fn vote_weight(&self, key: &PublicKey) -> Option<u128> {
        self.get(key).filter(|d| d.active).map(|d| d.stake)
    }

    /// Total stake of active delegates — the quorum denominator.
    pub fn total_active_stake(&self) -> u128 {
        self.delegates
            .iter()
            .filter(|d| d.active)
            .fold(0u128, |acc, d| acc.saturating_add(d.stake))
    }

    pub fn active_count(&self) -> usize {
        self.delegates.iter().filter(|d| d.active).count()
    }

    /// Active delegates in rotation order.
    pub fn rotation(&self) -> Vec<&Delegate> {
        let mut ranked: Vec<&Delegate> = self.delegates.iter().filter(|d| d.active).collect();
        ranked.sort_by(|a, b| {
            b.stake
                .cmp(&a.stake)
                .then_with(|| a.public_key.cmp(&b.public_key))
        });
        ranked
    }

    /// The delegate whose turn it is at (height, attempt).
    pub fn proposer_for(&self, height: u64, attempt: u32) -> Option<&Delegate> {
        let ranked = self.rotation();
        if ranked.is_empty() {
            return None;
        }
        let index = ((height as u128 + attempt as u128) % ranked.len() as u128) as usize;
        Some(ranked[index])
    }

    /// Register a new delegate. Governance-only; refused mid-round by the
    /// engine.
    pub fn add(&mut self, delegate: Delegate) -> bool {
        if self.get(&delegate.public_key).is_some() {
            return false;
        }
        self.delegates.push(delegate);
        true
    }

    /// Remove a delegate entirely.
    pub fn remove(&mut self, key: &PublicKey) -> bool {
        let before = self.delegates.len();
        self.delegates.retain(|d| &d.public_key != key);
        self.delegates.len() != before
    }

    /// Mark a delegate inactive (equivocation penalty). Returns the stake
    /// that left the quorum denominator, or `None` if unknown or already
    /// inactive.
    pub fn deactivate(&mut self, key: &PublicKey) -> Option<u128> {
        let delegate = self
            .delegates
            .iter_mut()
            .find(|d| &d.public_key == key && d.active)?;
        delegate.active = false;
        Some(delegate.stake)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pk(byte: u8) -> PublicKey {
        PublicKey([byte; 32])
    }

    fn spec_set() -> DelegateSet {
        // The spec's worked example: stakes [30, 25, 20, 15, 10].
        DelegateSet::new(vec![
            Delegate::new(pk(1), 30),
            Delegate::new(pk(2), 25),
            Delegate::new(pk(3), 20),
            Delegate::new(pk(4), 15),
            Delegate::new(pk(5), 10),
        ])
    }

    #[test]
    fn total_active_stake_sums_active_only() {
        let mut set = spec_set();
        assert_eq!(set.total_active_stake(), 100);
        set.deactivate(&pk(3));
        assert_eq!(set.total_active_stake(), 80);
    }

    #[test]
    fn rotation_orders_by_stake_then_key() {
        let set = DelegateSet::new(vec![
            Delegate::new(pk(9), 20),
            Delegate::new(pk(2), 20),
            Delegate::new(pk(5), 50),
        ]);
        let order: Vec<PublicKey> = set.rotation().iter().map(|d| d.public_key).collect();
        assert_eq!(order, vec![pk(5), pk(2), pk(9)]);
    }

    #[test]
    fn proposer_rotates_with_height() {
        let set = spec_set();
        assert_eq!(set.proposer_for(0, 0).unwrap().public_key, pk(1));
        assert_eq!(set.proposer_for(1, 0).unwrap().public_key, pk(2));
        assert_eq!(set.proposer_for(5, 0).unwrap().public_key, pk(1));
    }

    #[test]
    fn abandoned_attempt_advances_rotation_at_same_height() {
        let set = spec_set();
        let first = set.proposer_for(3, 0).unwrap().public_key;
        let second = set.proposer_for(3, 1).unwrap().public_key;
        assert_ne!(first, second);
        assert_eq!(second, set.proposer_for(4, 0).unwrap().public_key);
    }

    #[test]
    fn deactivated_delegate_leaves_rotation() {
        let mut set = spec_set();
        set.deactivate(&pk(1));
        assert!(set
            .rotation()
            .iter()
            .all(|d| d.public_key != pk(1)));
        assert!(!set.is_active(&pk(1)));
        assert_eq!(set.vote_weight(&pk(1)), None);
    }

    #[test]
    fn deactivate_is_idempotent_on_weight() {
        let mut set = spec_set();
        assert_eq!(set.deactivate(&pk(2)), Some(25));
        assert_eq!(set.deactivate(&pk(2)), None);
    }

    #[test]
    fn add_rejects_duplicate_key() {
        let mut set = spec_set();
        assert!(!set.add(Delegate::new(pk(1), 99)));
        assert_eq!(set.len(), 5);
    }

    #[test]
    fn remove_unknown_is_noop() {
        let mut set = spec_set();
        assert!(!set.remove(&pk(77)));
        assert_eq!(set.len(), 5);
    }

    #[test]
    fn empty_set_has_no_proposer() {
        let set = DelegateSet::default();
        assert!(set.proposer_for(0, 0).is_none());
    }
}
