//! Stateless instruction validation.
//!
//! Structural checks only: anything answerable from the instruction alone.
//! Stateful checks (account existence, balance, nonce sequencing, signature
//! against the account key) are the pipeline's job.

use crate::{Instruction, InstructionError};
use lattice_crypto::validate_address;

/// Maximum service payload size in bytes.
pub const MAX_PAYLOAD_BYTES: usize = 64 * 1024;

/// Validate an instruction's structure.
pub fn validate_structure(instruction: &Instruction) -> Result<(), InstructionError> {
    if instruction.kind.as_str().is_empty() {
        return Err(InstructionError::EmptyKind);
    }

    if instruction.nonce == 0 {
        return Err(InstructionError::ZeroNonce);
    }

    if instruction.payload.len() > MAX_PAYLOAD_BYTES {
        return Err(InstructionError::PayloadTooLarge {
            size: instruction.payload.len(),
            max: MAX_PAYLOAD_BYTES,
        });
    }

    if !validate_address(instruction.from.as_str()) {
        return Err(InstructionError::MalformedAddress {
            field: "from",
            value: instruction.from.to_string(),
        });
    }

    if !validate_address(instruction.to.as_str()) {
        return Err(InstructionError::MalformedAddress {
            field: "to",
            value: instruction.to.to_string(),
        });
    }

    if !instruction.id_matches_content() {
        return Err(InstructionError::IdMismatch);
    }

    Ok(())
}
