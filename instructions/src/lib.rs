//! The instruction data model.
//!
//! An instruction is the unit of state change for every service on a
//! cluster. Its `id` is a pure function of its content, so re-submission is
//! always detectable; its signature binds the content to the sending
//! account's key. Service-specific semantics live in pipeline handlers
//! resolved by [`InstructionKind`] tag — this crate only knows the shape.

pub mod error;
pub mod validation;

pub use error::InstructionError;
pub use validation::validate_structure;

use lattice_crypto::{blake2b_256_multi, sign_message, verify_signature};
use lattice_types::{
    AccountAddress, InstructionId, InstructionStatus, KeyPair, PublicKey, Signature,
};
use serde::{Deserialize, Serialize};

/// Open tag identifying which registered handler processes an instruction.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InstructionKind(String);

impl InstructionKind {
    /// The built-in balance-transfer kind.
    pub const TRANSFER: &'static str = "transfer";

    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    pub fn transfer() -> Self {
        Self::new(Self::TRANSFER)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for InstructionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "InstructionKind({})", self.0)
    }
}

impl std::fmt::Display for InstructionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A signed instruction.
///
/// `fee` and `status` are derived during pipeline execution and are
/// excluded from both the content hash and the signature — the fee is
/// computed by the destination cluster's fee strategy, not declared by the
/// submitter.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Instruction {
    /// Blake2b-256 over kind, from, to, amount, payload, nonce.
    pub id: InstructionId,
    pub kind: InstructionKind,
    pub from: AccountAddress,
    pub to: AccountAddress,
    pub amount: u128,
    /// Opaque service payload (message body, trade details, …).
    pub payload: Vec<u8>,
    /// Must equal the sender account's committed nonce + 1.
    pub nonce: u64,
    pub signature: Signature,
    /// Fee charged at commit time; 0 until the fee stage runs.
    pub fee: u128,
    pub status: InstructionStatus,
}

impl Instruction {
    /// Build and sign an instruction with the sender's key pair.
    pub fn new_signed(
        kind: InstructionKind,
        from: AccountAddress,
        to: AccountAddress,
        amount: u128,
        payload: Vec<u8>,
        nonce: u64,
        keys: &KeyPair,
    ) -> Self {
        let mut instruction = Self {
            id: InstructionId::ZERO,
            kind,
            from,
            to,
            amount,
            payload,
            nonce,
            signature: Signature([0u8; 64]),
            fee: 0,
            status: InstructionStatus::Pending,
        };
        instruction.id = instruction.compute_id();
        instruction.signature = sign_message(instruction.id.as_bytes(), &keys.private);
        instruction
    }

    /// Recompute the content hash from current fields.
    ///
    /// Variable-length fields are length-prefixed so adjacent fields can
    /// never be confused for one another.
    pub fn compute_id(&self) -> InstructionId {
        let kind = self.kind.as_str().as_bytes();
        let from = self.from.as_str().as_bytes();
        let to = self.to.as_str().as_bytes();
        let digest = blake2b_256_multi(&[
            &(kind.len() as u32).to_le_bytes(),
            kind,
            &(from.len() as u32).to_le_bytes(),
            from,
            &(to.len() as u32).to_le_bytes(),
            to,
            &self.amount.to_le_bytes(),
            &(self.payload.len() as u32).to_le_bytes(),
            &self.payload,
            &self.nonce.to_le_bytes(),
        ]);
        InstructionId::new(digest)
    }

    /// Whether the stored id matches the content.
    pub fn id_matches_content(&self) -> bool {
        self.id == self.compute_id()
    }

    /// Verify the signature against the sender's public key.
    pub fn verify_ownership(&self, sender_key: &PublicKey) -> bool {
        verify_signature(self.id.as_bytes(), &self.signature, sender_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lattice_crypto::{derive_address, keypair_from_seed};

    fn signed_transfer(seed: u8, nonce: u64) -> (Instruction, KeyPair) {
        let keys = keypair_from_seed(&[seed; 32]);
        let from = derive_address(&keys.public);
        let to = derive_address(&keypair_from_seed(&[seed.wrapping_add(1); 32]).public);
        let instruction = Instruction::new_signed(
            InstructionKind::transfer(),
            from,
            to,
            250,
            Vec::new(),
            nonce,
            &keys,
        );
        (instruction, keys)
    }

    #[test]
    fn id_is_content_hash() {
        let (instruction, _) = signed_transfer(1, 1);
        assert!(instruction.id_matches_content());
        assert!(!instruction.id.is_zero());
    }

    #[test]
    fn same_content_same_id() {
        let (a, _) = signed_transfer(1, 1);
        let (b, _) = signed_transfer(1, 1);
        assert_eq!(a.id, b.id);
    }

    #[test]
    fn nonce_changes_id() {
        let (a, _) = signed_transfer(1, 1);
        let (b, _) = signed_transfer(1, 2);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn fee_and_status_do_not_change_id() {
        let (mut instruction, _) = signed_transfer(1, 1);
        let original = instruction.id;
        instruction.fee = 99;
        instruction.status = InstructionStatus::Validated;
        assert_eq!(instruction.compute_id(), original);
    }

    #[test]
    fn signature_verifies_for_signer_only() {
        let (instruction, keys) = signed_transfer(1, 1);
        let other = keypair_from_seed(&[99; 32]);
        assert!(instruction.verify_ownership(&keys.public));
        assert!(!instruction.verify_ownership(&other.public));
    }

    #[test]
    fn tampered_amount_breaks_id() {
        let (mut instruction, _) = signed_transfer(1, 1);
        instruction.amount += 1;
        assert!(!instruction.id_matches_content());
    }

    #[test]
    fn bincode_roundtrip() {
        let (instruction, _) = signed_transfer(3, 7);
        let bytes = bincode::serialize(&instruction).unwrap();
        let back: Instruction = bincode::deserialize(&bytes).unwrap();
        assert_eq!(back.id, instruction.id);
        assert_eq!(back.nonce, 7);
    }
}
