//! The lattice full node.
//!
//! A node holds one immutable identity and participates in one or more
//! clusters. Each membership gets its own [`ClusterRuntime`] — consensus
//! engine, pipeline, ledger, and attestation aggregator wired together —
//! driven by timers. Clusters share no locks and run independently; the
//! only state crossing a cluster boundary is a finalized snapshot.

pub mod cluster;
pub mod config;
pub mod error;
pub mod governance;
pub mod identity;
pub mod metrics;
pub mod node;
pub mod shutdown;

pub use cluster::ClusterRuntime;
pub use config::{ClusterConfig, NodeConfig};
pub use error::NodeError;
pub use governance::{GovernanceAction, GovernanceQueue};
pub use identity::NodeIdentity;
pub use metrics::NodeMetrics;
pub use node::LatticeNode;
pub use shutdown::ShutdownController;
