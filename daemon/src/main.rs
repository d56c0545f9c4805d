//! Lattice daemon — entry point for running a lattice node.

use std::path::PathBuf;

use clap::Parser;

use lattice_node::{LatticeNode, NodeConfig};

#[derive(Parser)]
#[command(name = "lattice-daemon", about = "Lattice multi-cluster node daemon")]
struct Cli {
    /// Path to the TOML configuration file. File settings are the base;
    /// CLI flags and env vars override them.
    #[arg(long, env = "LATTICE_CONFIG")]
    config: PathBuf,

    /// Data directory override.
    #[arg(long, env = "LATTICE_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// P2P port override.
    #[arg(long, env = "LATTICE_P2P_PORT")]
    port: Option<u16>,

    /// RPC port override.
    #[arg(long, env = "LATTICE_RPC_PORT")]
    rpc_port: Option<u16>,

    /// Disable the RPC server.
    #[arg(long, env = "LATTICE_DISABLE_RPC")]
    disable_rpc: bool,

    /// Bootstrap peer addresses ("1.2.3.4:7171,5.6.7.8:7171").
    #[arg(long, env = "LATTICE_BOOTSTRAP_PEERS", value_delimiter = ',')]
    bootstrap_peers: Vec<String>,

    /// Log level override: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "LATTICE_LOG_LEVEL")]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = NodeConfig::from_toml_file(&cli.config)?;
    if let Some(data_dir) = cli.data_dir {
        config.data_dir = data_dir;
    }
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(rpc_port) = cli.rpc_port {
        config.rpc_port = rpc_port;
    }
    if cli.disable_rpc {
        config.enable_rpc = false;
    }
    if !cli.bootstrap_peers.is_empty() {
        config.bootstrap_peers = cli.bootstrap_peers;
    }
    if let Some(level) = cli.log_level {
        config.log_level = level;
    }

    lattice_utils::init_tracing_with(&config.log_level, &config.log_format);
    tracing::info!(config = %cli.config.display(), "starting lattice node");

    let node = LatticeNode::build(config)?;
    node.run().await?;

    tracing::info!("node stopped");
    Ok(())
}
