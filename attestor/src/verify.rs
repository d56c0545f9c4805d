//! Peer-side re-validation and attestation signing.
//!
//! A trusted peer never trusts the origin cluster's word: it loads the
//! referenced snapshot, verifies the snapshot hash, and re-checks the
//! instruction's preconditions before signing anything.

use lattice_crypto::{blake2b_256_multi, sign_message};
use lattice_instructions::{validate_structure, Instruction};
use lattice_ledger::ClusterSnapshot;
use lattice_types::{ClusterId, KeyPair, Signature};

use crate::AttestorError;

/// The digest an attestation signs: binds origin, destination,
/// instruction id, and the exact snapshot the preconditions were checked
/// against. Two different digests under one instruction id are the
/// conflict the aggregator quarantines on.
pub fn attestation_digest(
    origin: &ClusterId,
    dest: &ClusterId,
    instruction: &Instruction,
    snapshot_hash: &[u8; 32],
) -> [u8; 32] {
    blake2b_256_multi(&[
        origin.as_str().as_bytes(),
        dest.as_str().as_bytes(),
        instruction.id.as_bytes(),
        snapshot_hash,
    ])
}

/// Re-validate an outbound instruction against a finalized origin
/// snapshot.
///
/// Checks: snapshot integrity, instruction structure, the sender account
/// existing at the snapshot, its signature under the snapshotted key, the
/// nonce extending the snapshotted sequence, and the balance covering the
/// amount.
pub fn validate_against_snapshot(
    instruction: &Instruction,
    snapshot: &ClusterSnapshot,
) -> Result<(), AttestorError> {
    if !snapshot.verify() {
        return Err(AttestorError::PreconditionFailed(
            "snapshot hash does not verify".into(),
        ));
    }
    validate_structure(instruction)
        .map_err(|e| AttestorError::PreconditionFailed(e.to_string()))?;

    let account = snapshot.account(&instruction.from).ok_or_else(|| {
        AttestorError::PreconditionFailed(format!(
            "sender {} absent from snapshot at height {}",
            instruction.from, snapshot.height
        ))
    })?;

    if !instruction.verify_ownership(&account.public_key) {
        return Err(AttestorError::PreconditionFailed(
            "signature does not verify under the snapshotted key".into(),
        ));
    }
    if instruction.nonce != account.nonce + 1 {
        return Err(AttestorError::PreconditionFailed(format!(
            "nonce {} does not follow snapshotted nonce {}",
            instruction.nonce, account.nonce
        )));
    }
    if account.balance < instruction.amount {
        return Err(AttestorError::PreconditionFailed(format!(
            "snapshotted balance {} below amount {}",
            account.balance, instruction.amount
        )));
    }
    Ok(())
}

/// Validate and sign in one step — what a trusted peer runs on receipt of
/// an outbound instruction. Returns the digest and its signature.
pub fn sign_attestation(
    origin: &ClusterId,
    dest: &ClusterId,
    instruction: &Instruction,
    snapshot: &ClusterSnapshot,
    keys: &KeyPair,
) -> Result<([u8; 32], Signature), AttestorError> {
    validate_against_snapshot(instruction, snapshot)?;
    let digest = attestation_digest(origin, dest, instruction, &snapshot.hash);
    Ok((digest, sign_message(&digest, &keys.private)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use lattice_crypto::{derive_address, keypair_from_seed};
    use lattice_instructions::InstructionKind;
    use lattice_ledger::AccountSnapshot;
    use lattice_types::AccountAddress;

    fn snapshot_with(balance: u128, nonce: u64) -> (ClusterSnapshot, KeyPair, AccountAddress) {
        let keys = keypair_from_seed(&[21; 32]);
        let address = derive_address(&keys.public);
        let snapshot = ClusterSnapshot::create(
            ClusterId::new("finance"),
            30,
            vec![AccountSnapshot {
                address: address.clone(),
                public_key: keys.public,
                balance,
                nonce,
            }],
        );
        (snapshot, keys, address)
    }

    fn outbound(keys: &KeyPair, from: AccountAddress, amount: u128, nonce: u64) -> Instruction {
        let to = derive_address(&keypair_from_seed(&[22; 32]).public);
        Instruction::new_signed(
            InstructionKind::transfer(),
            from,
            to,
            amount,
            Vec::new(),
            nonce,
            keys,
        )
    }

    #[test]
    fn valid_instruction_attests() {
        let (snapshot, keys, address) = snapshot_with(1_000, 4);
        let instruction = outbound(&keys, address, 500, 5);
        let (digest, signature) = sign_attestation(
            &ClusterId::new("finance"),
            &ClusterId::new("chat"),
            &instruction,
            &snapshot,
            &keys,
        )
        .unwrap();
        assert!(lattice_crypto::verify_signature(&digest, &signature, &keys.public));
    }

    #[test]
    fn unknown_account_refused() {
        let (snapshot, _, _) = snapshot_with(1_000, 4);
        let stranger = keypair_from_seed(&[60; 32]);
        let instruction = outbound(&stranger, derive_address(&stranger.public), 1, 1);
        assert!(matches!(
            validate_against_snapshot(&instruction, &snapshot),
            Err(AttestorError::PreconditionFailed(_))
        ));
    }

    #[test]
    fn wrong_nonce_refused() {
        let (snapshot, keys, address) = snapshot_with(1_000, 4);
        let instruction = outbound(&keys, address, 500, 7);
        assert!(validate_against_snapshot(&instruction, &snapshot).is_err());
    }

    #[test]
    fn insufficient_snapshot_balance_refused() {
        let (snapshot, keys, address) = snapshot_with(100, 4);
        let instruction = outbound(&keys, address, 500, 5);
        assert!(validate_against_snapshot(&instruction, &snapshot).is_err());
    }

    #[test]
    fn tampered_snapshot_refused() {
        let (mut snapshot, keys, address) = snapshot_with(1_000, 4);
        snapshot.accounts[0].balance = u128::MAX;
        let instruction = outbound(&keys, address, 500, 5);
        assert!(validate_against_snapshot(&instruction, &snapshot).is_err());
    }

    #[test]
    fn digest_binds_all_coordinates() {
        let (snapshot, keys, address) = snapshot_with(1_000, 4);
        let instruction = outbound(&keys, address, 500, 5);
        let base = attestation_digest(
            &ClusterId::new("finance"),
            &ClusterId::new("chat"),
            &instruction,
            &snapshot.hash,
        );
        let other_dest = attestation_digest(
            &ClusterId::new("finance"),
            &ClusterId::new("search"),
            &instruction,
            &snapshot.hash,
        );
        let other_snap = attestation_digest(
            &ClusterId::new("finance"),
            &ClusterId::new("chat"),
            &instruction,
            &[0u8; 32],
        );
        assert_ne!(base, other_dest);
        assert_ne!(base, other_snap);
    }
}
