//! Blake2b hashing for instructions, blocks, and snapshots.

use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use lattice_types::{BlockHash, InstructionId};

type Blake2b256 = Blake2b<U32>;

/// Compute a 256-bit Blake2b hash of arbitrary data.
pub fn blake2b_256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Blake2b256::new();
    hasher.update(data);
    let result = hasher.finalize();
    let mut output = [0u8; 32];
    output.copy_from_slice(&result);
    output
}

/// Hash multiple byte slices in sequence (avoids concatenation allocation).
pub fn blake2b_256_multi(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Blake2b256::new();
    for part in parts {
        hasher.update(part);
    }
    let result = hasher.finalize();
    let mut output = [0u8; 32];
    output.copy_from_slice(&result);
    output
}

/// Hash canonical instruction content bytes to produce its id.
pub fn hash_instruction(content_bytes: &[u8]) -> InstructionId {
    InstructionId::new(blake2b_256(content_bytes))
}

/// Hash serialized block header bytes to produce its `BlockHash`.
pub fn hash_block(block_bytes: &[u8]) -> BlockHash {
    BlockHash::new(blake2b_256(block_bytes))
}
