use lattice_attestor::AttestorError;
use lattice_consensus::ConsensusError;
use lattice_ledger::LedgerError;
use lattice_network::NetworkError;
use lattice_pipeline::PipelineError;
use lattice_store::StoreError;
use lattice_types::ClusterId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("this node is not serving cluster {0}")]
    UnknownCluster(ClusterId),

    #[error(transparent)]
    Consensus(#[from] ConsensusError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error(transparent)]
    Attestor(#[from] AttestorError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Network(#[from] NetworkError),
}
