//! The pipeline itself — stage orchestration and atomic commit.

use std::sync::Arc;

use lattice_instructions::{validate_structure, Instruction};
use lattice_ledger::Ledger;
use lattice_store::{CommitBatch, CommittedInstruction};
use lattice_types::{InstructionId, Timestamp};

use crate::registry::HandlerRegistry;
use crate::staged::StagedAccounts;
use crate::PipelineError;

/// What `execute` did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExecuteOutcome {
    /// Validated, fee-applied, processed, and committed.
    Committed { id: InstructionId, fee: u128 },
    /// The id was already committed — nothing was re-applied.
    AlreadyCommitted { id: InstructionId },
}

/// One cluster's instruction pipeline.
///
/// Holds the cluster's only write path into the ledger. Cloneable: clones
/// share the ledger handle and registry.
#[derive(Clone)]
pub struct InstructionPipeline {
    ledger: Ledger,
    registry: Arc<HandlerRegistry>,
}

impl InstructionPipeline {
    pub fn new(ledger: Ledger, registry: Arc<HandlerRegistry>) -> Self {
        Self { ledger, registry }
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Stages 1 and 2 without mutation — the synchronous submission
    /// verdict. Returns the fee that commit would charge.
    ///
    /// Re-submission of a committed id is a replay, rejected here.
    pub fn preflight(&self, instruction: &Instruction) -> Result<u128, PipelineError> {
        if self.ledger.is_committed(&instruction.id)? {
            return Err(PipelineError::DuplicateId {
                id: instruction.id,
            });
        }
        self.validate_stage(instruction)?;
        self.fee_stage(instruction)
    }

    /// Whether an instruction's nonce extends its account's sequence right
    /// now — the proposal-time candidate filter.
    pub fn nonce_is_current(&self, instruction: &Instruction) -> bool {
        match self.ledger.account(&instruction.from) {
            Ok(account) => instruction.nonce == account.nonce + 1,
            Err(_) => false,
        }
    }

    /// Run the full pipeline: validate → fee → process → commit.
    ///
    /// Called for each instruction of a finalized block, in block order,
    /// and for attested cross-cluster instructions. Idempotent on id.
    pub fn execute(
        &self,
        instruction: &Instruction,
        height: u64,
        now: Timestamp,
    ) -> Result<ExecuteOutcome, PipelineError> {
        if self.ledger.is_committed(&instruction.id)? {
            tracing::debug!(id = %instruction.id, "instruction already committed, skipping");
            return Ok(ExecuteOutcome::AlreadyCommitted {
                id: instruction.id,
            });
        }

        // Stage 1: validate.
        self.validate_stage(instruction)?;

        // Stage 2: fee.
        let fee = self.fee_stage(instruction)?;

        // Stage 3: process — handler mutation, then nonce and fee, all
        // staged and committed as one batch.
        let bundle = self.registry.get(&instruction.kind)?;
        let mut state = StagedAccounts::new(&self.ledger);
        bundle.handler.process(instruction, &mut state)?;
        state.debit(&instruction.from, fee)?;
        state.increment_nonce(&instruction.from)?;

        let batch = CommitBatch {
            accounts: state.into_records(),
            instruction: CommittedInstruction {
                id: instruction.id,
                account: instruction.from.clone(),
                height,
                fee,
                committed_at: now,
                body: bincode_body(instruction)?,
            },
        };
        self.ledger.commit(&batch)?;

        tracing::debug!(
            id = %instruction.id,
            kind = %instruction.kind,
            fee,
            height,
            "instruction committed"
        );
        Ok(ExecuteOutcome::Committed {
            id: instruction.id,
            fee,
        })
    }

    fn validate_stage(&self, instruction: &Instruction) -> Result<(), PipelineError> {
        validate_structure(instruction)?;

        let bundle = self.registry.get(&instruction.kind)?;

        let sender = self
            .ledger
            .account(&instruction.from)
            .map_err(|_| PipelineError::UnknownSender(instruction.from.to_string()))?;

        if !instruction.verify_ownership(&sender.public_key) {
            return Err(PipelineError::BadSignature);
        }

        if instruction.nonce != sender.nonce + 1 {
            return Err(PipelineError::BadNonce {
                current: sender.nonce,
                got: instruction.nonce,
            });
        }

        bundle.handler.validate(instruction, &self.ledger)
    }

    fn fee_stage(&self, instruction: &Instruction) -> Result<u128, PipelineError> {
        let bundle = self.registry.get(&instruction.kind)?;
        let fee = bundle.fees.compute_fee(instruction);

        let sender = self
            .ledger
            .account(&instruction.from)
            .map_err(|_| PipelineError::UnknownSender(instruction.from.to_string()))?;
        let required = instruction.amount.saturating_add(fee);
        if sender.balance < required {
            return Err(PipelineError::InsufficientFunds {
                required,
                available: sender.balance,
            });
        }
        Ok(fee)
    }
}

fn bincode_body(instruction: &Instruction) -> Result<Vec<u8>, PipelineError> {
    bincode::serialize(instruction).map_err(|e| {
        PipelineError::Store(lattice_store::StoreError::Serialization(e.to_string()))
    })
}
