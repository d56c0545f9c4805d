//! Fundamental types for the lattice protocol.
//!
//! This crate defines the core types shared across every other crate in the
//! workspace: cluster and node identifiers, account addresses, content
//! hashes, key material, timestamps, protocol parameters, and status enums.

pub mod address;
pub mod hash;
pub mod id;
pub mod keys;
pub mod params;
pub mod status;
pub mod time;

pub use address::AccountAddress;
pub use hash::{BlockHash, InstructionId};
pub use id::{ClusterId, NodeId};
pub use keys::{KeyPair, PrivateKey, PublicKey, Signature};
pub use params::ProtocolParams;
pub use status::{AttestationStatus, BlockStatus, InstructionStatus};
pub use time::Timestamp;
