//! The cluster ledger — authoritative account state and instruction log.
//!
//! Reads are open to every component; writes go through
//! [`Ledger::commit`] exclusively, which the pipeline's Process stage
//! calls. That single-writer discipline per cluster is what keeps
//! deterministic ordering cheap.

pub mod error;
pub mod ledger;
pub mod snapshot;

pub use error::LedgerError;
pub use ledger::{Ledger, LedgerSummary};
pub use snapshot::{AccountSnapshot, ClusterSnapshot};
