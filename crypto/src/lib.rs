//! Cryptographic primitives for the lattice protocol.
//!
//! - **Ed25519** for node and account signing
//! - **Blake2b-256** for content hashes (instruction ids, block hashes,
//!   snapshot hashes)
//! - Address derivation with `lat_` prefix and base32 encoding

pub mod address;
pub mod hash;
pub mod keys;
pub mod sign;

pub use address::{decode_address, derive_address, validate_address};
pub use hash::{blake2b_256, blake2b_256_multi, hash_block, hash_instruction};
pub use keys::{generate_keypair, keypair_from_seed, public_from_private};
pub use sign::{sign_message, verify_signature};
