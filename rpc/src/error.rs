use thiserror::Error;

#[derive(Debug, Error)]
pub enum RpcError {
    #[error("failed to bind RPC listener: {0}")]
    Bind(String),

    #[error("RPC server failure: {0}")]
    Serve(String),
}
