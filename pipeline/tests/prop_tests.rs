use std::sync::Arc;

use proptest::prelude::*;

use lattice_crypto::{derive_address, keypair_from_seed};
use lattice_instructions::{Instruction, InstructionKind};
use lattice_ledger::Ledger;
use lattice_pipeline::{InstructionPipeline, PercentageFee, RegistryBuilder, TransferHandler};
use lattice_store::{AccountRecord, MemoryStore};
use lattice_types::{ClusterId, KeyPair, Timestamp};

const INITIAL_BALANCE: u128 = 1_000_000;
const FEE_BPS: u32 = 50;

fn pipeline_with_sender() -> (InstructionPipeline, KeyPair, KeyPair) {
    let ledger = Ledger::new(ClusterId::new("prop"), Arc::new(MemoryStore::new()));
    let sender = keypair_from_seed(&[71; 32]);
    let recipient = keypair_from_seed(&[72; 32]);
    ledger
        .seed_account(&AccountRecord::new(
            derive_address(&sender.public),
            sender.public,
            INITIAL_BALANCE,
        ))
        .unwrap();
    let registry = RegistryBuilder::new()
        .register(Arc::new(TransferHandler), Arc::new(PercentageFee::new(FEE_BPS)))
        .build();
    (InstructionPipeline::new(ledger, registry), sender, recipient)
}

fn transfer(sender: &KeyPair, recipient: &KeyPair, amount: u128, nonce: u64) -> Instruction {
    Instruction::new_signed(
        InstructionKind::transfer(),
        derive_address(&sender.public),
        derive_address(&recipient.public),
        amount,
        Vec::new(),
        nonce,
        sender,
    )
}

proptest! {
    /// Committing N sequential transfers advances the sender nonce by
    /// exactly N — no skips, no reuse — and value is conserved up to the
    /// burned fees.
    #[test]
    fn nonce_advances_by_one_per_commit(amounts in prop::collection::vec(1u128..500, 1..20)) {
        let (pipeline, sender, recipient) = pipeline_with_sender();
        let sender_address = derive_address(&sender.public);
        let recipient_address = derive_address(&recipient.public);

        let mut fees = 0u128;
        for (i, &amount) in amounts.iter().enumerate() {
            let nonce = i as u64 + 1;
            let instruction = transfer(&sender, &recipient, amount, nonce);
            let before = pipeline.ledger().account(&sender_address).unwrap().nonce;
            prop_assert_eq!(before, i as u64);

            let outcome = pipeline.execute(&instruction, 1, Timestamp::new(100)).unwrap();
            match outcome {
                lattice_pipeline::ExecuteOutcome::Committed { fee, .. } => fees += fee,
                other => return Err(TestCaseError::fail(format!("unexpected outcome {other:?}"))),
            }

            let after = pipeline.ledger().account(&sender_address).unwrap().nonce;
            prop_assert_eq!(after, nonce);
        }

        let moved: u128 = amounts.iter().sum();
        let sender_balance = pipeline.ledger().account(&sender_address).unwrap().balance;
        let recipient_balance = pipeline.ledger().account(&recipient_address).unwrap().balance;
        prop_assert_eq!(sender_balance, INITIAL_BALANCE - moved - fees);
        prop_assert_eq!(recipient_balance, moved);
    }

    /// An out-of-sequence nonce is always rejected and changes nothing.
    #[test]
    fn wrong_nonce_never_commits(nonce in 2u64..1_000) {
        let (pipeline, sender, recipient) = pipeline_with_sender();
        let sender_address = derive_address(&sender.public);

        let instruction = transfer(&sender, &recipient, 100, nonce);
        prop_assert!(pipeline.execute(&instruction, 1, Timestamp::new(100)).is_err());

        let account = pipeline.ledger().account(&sender_address).unwrap();
        prop_assert_eq!(account.nonce, 0);
        prop_assert_eq!(account.balance, INITIAL_BALANCE);
        prop_assert!(!pipeline.ledger().is_committed(&instruction.id).unwrap());
    }
}
