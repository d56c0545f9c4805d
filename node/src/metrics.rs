//! Prometheus metrics for the lattice node.

use prometheus::{
    register_int_counter_with_registry, register_int_gauge_with_registry, IntCounter, IntGauge,
    Opts, Registry,
};

/// Central collection of node-level metrics, one registry per node.
pub struct NodeMetrics {
    pub registry: Registry,

    // ── Counters ────────────────────────────────────────────────────────
    /// Instructions committed across all clusters.
    pub instructions_committed: IntCounter,
    /// Instructions rejected at the pipeline boundary.
    pub instructions_rejected: IntCounter,
    /// Blocks finalized via DPoS quorum.
    pub blocks_finalized: IntCounter,
    /// Rounds abandoned at the deadline.
    pub rounds_abandoned: IntCounter,
    /// Delegates deactivated for equivocation.
    pub equivocations_detected: IntCounter,
    /// Cross-cluster messages that reached the attestation threshold.
    pub attestations_finalized: IntCounter,
    /// Cross-cluster messages that expired below threshold.
    pub attestations_expired: IntCounter,

    // ── Gauges ──────────────────────────────────────────────────────────
    /// Currently connected peers.
    pub peer_count: IntGauge,
    /// Instructions waiting in pending pools, summed over clusters.
    pub pending_instructions: IntGauge,
}

impl NodeMetrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let counter = |name: &str, help: &str, registry: &Registry| {
            register_int_counter_with_registry!(Opts::new(name, help), registry)
                .expect("metric registration cannot fail on a fresh registry")
        };
        let gauge = |name: &str, help: &str, registry: &Registry| {
            register_int_gauge_with_registry!(Opts::new(name, help), registry)
                .expect("metric registration cannot fail on a fresh registry")
        };

        Self {
            instructions_committed: counter(
                "lattice_instructions_committed_total",
                "Instructions committed across all clusters",
                &registry,
            ),
            instructions_rejected: counter(
                "lattice_instructions_rejected_total",
                "Instructions rejected at the pipeline boundary",
                &registry,
            ),
            blocks_finalized: counter(
                "lattice_blocks_finalized_total",
                "Blocks finalized via quorum",
                &registry,
            ),
            rounds_abandoned: counter(
                "lattice_rounds_abandoned_total",
                "Consensus rounds abandoned at the deadline",
                &registry,
            ),
            equivocations_detected: counter(
                "lattice_equivocations_total",
                "Delegates deactivated for equivocation",
                &registry,
            ),
            attestations_finalized: counter(
                "lattice_attestations_finalized_total",
                "Cross-cluster messages finalized",
                &registry,
            ),
            attestations_expired: counter(
                "lattice_attestations_expired_total",
                "Cross-cluster messages expired below threshold",
                &registry,
            ),
            peer_count: gauge(
                "lattice_peer_count",
                "Currently connected peers",
                &registry,
            ),
            pending_instructions: gauge(
                "lattice_pending_instructions",
                "Instructions waiting in pending pools",
                &registry,
            ),
            registry,
        }
    }
}

impl Default for NodeMetrics {
    fn default() -> Self {
        Self::new()
    }
}
