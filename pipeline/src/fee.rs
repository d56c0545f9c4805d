//! Pluggable fee strategies.

use lattice_instructions::Instruction;
use lattice_types::params::BPS_DENOMINATOR;

/// Computes the fee the pipeline deducts at commit time.
///
/// Fees are derived by the destination cluster, never declared by the
/// submitter — that keeps the instruction id a pure function of the
/// submitter's intent.
pub trait FeeStrategy: Send + Sync {
    fn compute_fee(&self, instruction: &Instruction) -> u128;
}

/// Percentage-of-amount fee in basis points, rounded down.
pub struct PercentageFee {
    pub bps: u32,
}

impl PercentageFee {
    pub fn new(bps: u32) -> Self {
        Self { bps }
    }
}

impl FeeStrategy for PercentageFee {
    fn compute_fee(&self, instruction: &Instruction) -> u128 {
        instruction.amount.saturating_mul(self.bps as u128) / BPS_DENOMINATOR
    }
}

/// Fixed fee regardless of amount.
pub struct FlatFee {
    pub amount: u128,
}

impl FlatFee {
    pub fn new(amount: u128) -> Self {
        Self { amount }
    }
}

impl FeeStrategy for FlatFee {
    fn compute_fee(&self, _instruction: &Instruction) -> u128 {
        self.amount
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lattice_crypto::{derive_address, keypair_from_seed};
    use lattice_instructions::InstructionKind;

    fn instruction(amount: u128) -> Instruction {
        let keys = keypair_from_seed(&[1; 32]);
        let from = derive_address(&keys.public);
        let to = derive_address(&keypair_from_seed(&[2; 32]).public);
        Instruction::new_signed(
            InstructionKind::transfer(),
            from,
            to,
            amount,
            Vec::new(),
            1,
            &keys,
        )
    }

    #[test]
    fn percentage_fee_rounds_down() {
        let fee = PercentageFee::new(25); // 0.25%
        assert_eq!(fee.compute_fee(&instruction(10_000)), 25);
        assert_eq!(fee.compute_fee(&instruction(399)), 0);
    }

    #[test]
    fn flat_fee_ignores_amount() {
        let fee = FlatFee::new(7);
        assert_eq!(fee.compute_fee(&instruction(0)), 7);
        assert_eq!(fee.compute_fee(&instruction(1_000_000)), 7);
    }
}
