//! Cross-cluster attestation.
//!
//! Lets a destination cluster accept an instruction whose authority
//! originates elsewhere without adopting the origin cluster's consensus:
//! the origin's *trusted peers* each re-validate the instruction against a
//! finalized snapshot and sign; once signer weight reaches 67% of total
//! trusted-peer weight the message finalizes and the instruction enters
//! the destination pipeline as externally originated.
//!
//! A peer caught signing two different payloads for one instruction id is
//! quarantined — its weight leaves the denominator until governance
//! reinstates it.

pub mod aggregator;
pub mod error;
pub mod message;
pub mod peers;
pub mod verify;

pub use aggregator::{AttestationAggregator, FinalizedAttestation, RecordOutcome};
pub use error::AttestorError;
pub use message::CrossClusterMessage;
pub use peers::{TrustedPeer, TrustedPeerSet};
pub use verify::{attestation_digest, sign_attestation, validate_against_snapshot};
