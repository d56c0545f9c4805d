//! HTTP RPC surface for the lattice node.
//!
//! Thin translation only: service network handlers submit pre-formed,
//! pre-signed instructions; nothing here implements service logic. The
//! node is reached through the [`NodeHandle`] trait, which breaks the
//! circular dependency between the rpc and node crates.

pub mod error;
pub mod handle;
pub mod handlers;
pub mod server;

pub use error::RpcError;
pub use handle::{AccountView, NodeHandle, SubmitReceipt};
pub use server::RpcServer;
