//! Axum-based RPC server.

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tokio::sync::broadcast;

use crate::handle::NodeHandle;
use crate::handlers::{self, RpcState};
use crate::RpcError;

/// The node's HTTP surface.
pub struct RpcServer {
    port: u16,
    state: RpcState,
}

impl RpcServer {
    pub fn new(port: u16, node: Arc<dyn NodeHandle>) -> Self {
        Self {
            port,
            state: RpcState { node },
        }
    }

    fn router(&self) -> Router {
        Router::new()
            .route("/submit", post(handlers::submit))
            .route(
                "/instruction/:cluster/:id",
                get(handlers::instruction_status),
            )
            .route("/account/:cluster/:address", get(handlers::account))
            .route("/health", get(handlers::health))
            .with_state(self.state.clone())
    }

    /// Serve until `shutdown` fires.
    pub async fn serve(&self, mut shutdown: broadcast::Receiver<()>) -> Result<(), RpcError> {
        let addr = format!("0.0.0.0:{}", self.port);
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| RpcError::Bind(format!("{addr}: {e}")))?;
        tracing::info!(%addr, "RPC server listening");

        axum::serve(listener, self.router())
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await
            .map_err(|e| RpcError::Serve(e.to_string()))
    }
}
