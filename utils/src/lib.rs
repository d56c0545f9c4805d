//! Shared utilities for the lattice workspace.

pub mod logging;

pub use logging::{init_tracing, init_tracing_with};
