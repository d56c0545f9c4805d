//! The handler registry — kind tag to capability bundle.
//!
//! Services extend the node by registering a bundle per instruction kind
//! at bootstrap; no subclassing, no dynamic registration afterwards. The
//! built registry is shared by reference with every cluster pipeline.

use std::collections::HashMap;
use std::sync::Arc;

use lattice_instructions::{Instruction, InstructionKind};
use lattice_ledger::Ledger;

use crate::fee::FeeStrategy;
use crate::staged::StagedAccounts;
use crate::PipelineError;

/// Kind-specific validation and state mutation.
pub trait InstructionHandler: Send + Sync {
    /// The kind tag this handler owns.
    fn kind(&self) -> InstructionKind;

    /// Business-rule validation beyond the pipeline's generic checks.
    /// Read-only ledger access.
    fn validate(&self, instruction: &Instruction, ledger: &Ledger) -> Result<(), PipelineError>;

    /// Stage this instruction's state mutation. The pipeline adds the
    /// nonce increment and fee debit afterwards; everything commits as one
    /// unit or not at all.
    fn process(
        &self,
        instruction: &Instruction,
        state: &mut StagedAccounts<'_>,
    ) -> Result<(), PipelineError>;
}

/// A kind's registered capabilities.
#[derive(Clone)]
pub struct HandlerBundle {
    pub handler: Arc<dyn InstructionHandler>,
    pub fees: Arc<dyn FeeStrategy>,
}

/// Immutable-after-init registry mapping kind tags to bundles.
pub struct HandlerRegistry {
    bundles: HashMap<String, HandlerBundle>,
}

impl HandlerRegistry {
    pub fn get(&self, kind: &InstructionKind) -> Result<&HandlerBundle, PipelineError> {
        self.bundles
            .get(kind.as_str())
            .ok_or_else(|| PipelineError::UnknownKind(kind.as_str().to_string()))
    }

    pub fn kinds(&self) -> Vec<&str> {
        self.bundles.keys().map(|k| k.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.bundles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bundles.is_empty()
    }
}

/// Builder used during node bootstrap.
#[derive(Default)]
pub struct RegistryBuilder {
    bundles: HashMap<String, HandlerBundle>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler with its fee strategy. Last registration of a
    /// kind wins, which lets a service override a built-in.
    pub fn register(
        mut self,
        handler: Arc<dyn InstructionHandler>,
        fees: Arc<dyn FeeStrategy>,
    ) -> Self {
        self.bundles
            .insert(handler.kind().as_str().to_string(), HandlerBundle { handler, fees });
        self
    }

    /// Freeze into the shared registry.
    pub fn build(self) -> Arc<HandlerRegistry> {
        Arc::new(HandlerRegistry {
            bundles: self.bundles,
        })
    }
}
