//! The built-in balance-transfer handler.

use lattice_instructions::{Instruction, InstructionKind};
use lattice_ledger::Ledger;

use crate::registry::InstructionHandler;
use crate::staged::StagedAccounts;
use crate::PipelineError;

/// Moves `amount` from the sender to the recipient.
pub struct TransferHandler;

impl InstructionHandler for TransferHandler {
    fn kind(&self) -> InstructionKind {
        InstructionKind::transfer()
    }

    fn validate(&self, instruction: &Instruction, _ledger: &Ledger) -> Result<(), PipelineError> {
        if instruction.amount == 0 {
            return Err(PipelineError::Validation(
                "transfer amount must be positive".into(),
            ));
        }
        if instruction.from == instruction.to {
            return Err(PipelineError::Validation(
                "transfer sender and recipient must differ".into(),
            ));
        }
        Ok(())
    }

    fn process(
        &self,
        instruction: &Instruction,
        state: &mut StagedAccounts<'_>,
    ) -> Result<(), PipelineError> {
        state.debit(&instruction.from, instruction.amount)?;
        state.credit(&instruction.to, instruction.amount)?;
        Ok(())
    }
}
