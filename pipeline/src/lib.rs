//! The instruction pipeline — the single funnel through which every
//! instruction, local or cross-cluster, becomes committed state.
//!
//! Three stages, in order: **validate** (structure, signature, nonce,
//! handler rules), **fee** (pluggable strategy, balance must cover
//! amount + fee), **process** (handler mutation + nonce increment + fee
//! debit, staged and applied atomically). Commit appends to the
//! per-account log and the dedup set. Re-executing a committed id is a
//! no-op that reports "already committed" — never a double-apply.
//!
//! Service crates plug in by registering a `{validate, fee, process}`
//! bundle per instruction kind; the registry is immutable after node
//! bootstrap.

pub mod error;
pub mod fee;
pub mod pipeline;
pub mod registry;
pub mod staged;
pub mod transfer;

pub use error::PipelineError;
pub use fee::{FeeStrategy, FlatFee, PercentageFee};
pub use pipeline::{ExecuteOutcome, InstructionPipeline};
pub use registry::{HandlerBundle, HandlerRegistry, InstructionHandler, RegistryBuilder};
pub use staged::StagedAccounts;
pub use transfer::TransferHandler;
