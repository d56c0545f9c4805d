//! Node configuration with TOML file support.
//!
//! The configuration is the governance surface at rest: delegate sets,
//! trusted-peer weights, and genesis balances all arrive here. Runtime
//! governance mutations go through [`GovernanceQueue`] and apply between
//! rounds.
//!
//! [`GovernanceQueue`]: crate::governance::GovernanceQueue

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use lattice_types::{ProtocolParams, PublicKey};

use crate::NodeError;

/// Top-level configuration for a lattice node.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Hex-encoded 32-byte seed the node identity key derives from.
    pub node_seed: String,

    /// Data directory (reserved for durable storage backends).
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Port to listen on for P2P connections.
    #[serde(default = "default_p2p_port")]
    pub port: u16,

    /// Maximum number of peer connections.
    #[serde(default = "default_max_peers")]
    pub max_peers: usize,

    /// Bootstrap peer addresses (`"ip:port"`).
    #[serde(default)]
    pub bootstrap_peers: Vec<String>,

    /// Whether to serve the RPC interface.
    #[serde(default = "default_true")]
    pub enable_rpc: bool,

    /// RPC port (if enabled).
    #[serde(default = "default_rpc_port")]
    pub rpc_port: u16,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log format: "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// How often cluster runtimes are driven, in milliseconds.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// The clusters this node serves.
    #[serde(default)]
    pub clusters: Vec<ClusterConfig>,
}

/// One cluster's configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClusterConfig {
    pub cluster_id: String,

    /// Whether this node is a member (participates in consensus) or only
    /// relays the cluster's traffic.
    #[serde(default = "default_true")]
    pub member: bool,

    /// Protocol parameters; defaults match the protocol-wide defaults.
    #[serde(default)]
    pub params: ProtocolParams,

    /// The cluster's delegate set.
    #[serde(default)]
    pub delegates: Vec<DelegateEntry>,

    /// Trusted peer clusters with attestation weights.
    #[serde(default)]
    pub trusted_peers: Vec<TrustedPeerEntry>,

    /// Accounts seeded at startup.
    #[serde(default)]
    pub genesis_accounts: Vec<GenesisAccount>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DelegateEntry {
    /// Hex-encoded Ed25519 public key.
    pub public_key: String,
    pub stake: u128,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TrustedPeerEntry {
    pub cluster_id: String,
    /// Hex-encoded attestation signing key.
    pub public_key: String,
    pub weight: u128,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GenesisAccount {
    /// Hex-encoded account public key; the address derives from it.
    pub public_key: String,
    pub balance: u128,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_data_dir() -> PathBuf {
    PathBuf::from("./lattice_data")
}

fn default_p2p_port() -> u16 {
    7171
}

fn default_max_peers() -> usize {
    50
}

fn default_true() -> bool {
    true
}

fn default_rpc_port() -> u16 {
    7172
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "human".to_string()
}

fn default_tick_interval_ms() -> u64 {
    500
}

// ── Impl ───────────────────────────────────────────────────────────────

impl NodeConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: &std::path::Path) -> Result<Self, NodeError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| NodeError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, NodeError> {
        toml::from_str(s).map_err(|e| NodeError::Config(e.to_string()))
    }

    /// The node identity seed.
    pub fn seed(&self) -> Result<[u8; 32], NodeError> {
        parse_hex_32(&self.node_seed)
            .ok_or_else(|| NodeError::Config("node_seed must be 64 hex characters".into()))
    }
}

/// Parse a hex-encoded Ed25519 public key.
pub fn parse_public_key(hex_key: &str) -> Result<PublicKey, NodeError> {
    parse_hex_32(hex_key)
        .map(PublicKey)
        .ok_or_else(|| NodeError::Config(format!("bad public key hex: {hex_key}")))
}

fn parse_hex_32(s: &str) -> Option<[u8; 32]> {
    let bytes = hex::decode(s).ok()?;
    bytes.try_into().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
node_seed = "0101010101010101010101010101010101010101010101010101010101010101"

[[clusters]]
cluster_id = "chat"

[[clusters.delegates]]
public_key = "0202020202020202020202020202020202020202020202020202020202020202"
stake = 30
"#;

    #[test]
    fn minimal_config_parses_with_defaults() {
        let config = NodeConfig::from_toml_str(MINIMAL).unwrap();
        assert_eq!(config.port, 7171);
        assert_eq!(config.rpc_port, 7172);
        assert!(config.enable_rpc);
        assert_eq!(config.clusters.len(), 1);
        assert!(config.clusters[0].member);
        assert_eq!(config.clusters[0].params.quorum_bps, 6_667);
        assert_eq!(config.clusters[0].delegates[0].stake, 30);
        assert_eq!(config.seed().unwrap(), [1u8; 32]);
    }

    #[test]
    fn bad_seed_is_a_config_error() {
        let mut config = NodeConfig::from_toml_str(MINIMAL).unwrap();
        config.node_seed = "xyz".into();
        assert!(matches!(config.seed(), Err(NodeError::Config(_))));
    }

    #[test]
    fn public_key_parsing() {
        assert!(parse_public_key(&"02".repeat(32)).is_ok());
        assert!(parse_public_key("short").is_err());
    }
}
