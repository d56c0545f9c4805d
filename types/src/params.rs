//! Protocol parameters shared by every node in a cluster.
//!
//! Thresholds are expressed in basis points (1/100 of a percent) over a
//! 10 000 denominator, and weight arithmetic is u128 with ceiling division
//! so a threshold is never reachable one unit early.

use serde::{Deserialize, Serialize};

/// Basis-point denominator.
pub const BPS_DENOMINATOR: u128 = 10_000;

/// Per-cluster protocol parameters.
///
/// Governance may tune these, but only between consensus rounds — the
/// node applies queued parameter changes at round boundaries.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolParams {
    /// Block finalization quorum as basis points of total active stake.
    /// Default 6 667 ≈ 2/3.
    pub quorum_bps: u32,

    /// Cross-cluster attestation threshold as basis points of total
    /// trusted-peer weight. Default 6 700 = 67%.
    pub attestation_threshold_bps: u32,

    /// Deadline for a consensus round before it is abandoned, in
    /// milliseconds.
    pub round_timeout_ms: u64,

    /// Window for an attestation round to reach threshold, in seconds.
    pub attestation_window_secs: u64,

    /// Maximum instructions packed into one proposed block.
    pub max_block_instructions: usize,

    /// Default transfer fee in basis points of the moved amount.
    pub transfer_fee_bps: u32,

    /// Ledger snapshot cadence: one snapshot every N finalized blocks.
    pub snapshot_interval_blocks: u64,
}

impl ProtocolParams {
    /// Minimum weight that satisfies a basis-point threshold over `total`.
    ///
    /// Ceiling division: 2/3 of 100 requires 67, not 66.
    pub fn threshold_weight(total: u128, bps: u32) -> u128 {
        if total == 0 {
            return 0;
        }
        let num = total.saturating_mul(bps as u128);
        num.div_ceil(BPS_DENOMINATOR)
    }

    /// Quorum weight for a given total active stake.
    pub fn quorum_weight(&self, total_active_stake: u128) -> u128 {
        Self::threshold_weight(total_active_stake, self.quorum_bps)
    }

    /// Attestation weight threshold for a given total trusted-peer weight.
    pub fn attestation_weight(&self, total_peer_weight: u128) -> u128 {
        Self::threshold_weight(total_peer_weight, self.attestation_threshold_bps)
    }
}

impl Default for ProtocolParams {
    fn default() -> Self {
        Self {
            quorum_bps: 6_667,
            attestation_threshold_bps: 6_700,
            round_timeout_ms: 5_000,
            attestation_window_secs: 60,
            max_block_instructions: 512,
            transfer_fee_bps: 25,
            snapshot_interval_blocks: 16,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_thirds_of_one_hundred_is_sixty_seven() {
        let p = ProtocolParams::default();
        assert_eq!(p.quorum_weight(100), 67);
    }

    #[test]
    fn sixty_seven_percent_of_one_hundred() {
        let p = ProtocolParams::default();
        assert_eq!(p.attestation_weight(100), 67);
    }

    #[test]
    fn threshold_of_zero_total_is_zero() {
        assert_eq!(ProtocolParams::threshold_weight(0, 6_700), 0);
    }

    #[test]
    fn threshold_never_exceeds_total_at_full_bps() {
        assert_eq!(ProtocolParams::threshold_weight(100, 10_000), 100);
    }

    #[test]
    fn spec_examples_hold() {
        let p = ProtocolParams::default();
        // Stakes [30,25,20,15,10], total 100, quorum 2/3 → need 67.
        let need = p.quorum_weight(100);
        assert!(30 + 25 + 20 >= need);
        assert!(20 + 15 + 10 < need);
        // Peer weights 40/30/30 at 67% → need 67.
        let need = p.attestation_weight(100);
        assert!(40 + 30 >= need);
        assert!(40 < need);
    }
}
