//! Three-tier expression validator
//!
//! 1. Grammar: every identifier is a function call, a whitelisted constant or a single
//!    letter.
//! 2. Semantics: every function call names a whitelisted function.
//! 3. Syntax: the engine's own parser accepts the text.
//!
//! The engine treats any identifier as a legal symbol, so the first two tiers are what
//! keeps arbitrary names from reaching it.

use crate::error::{PipelineError, PipelineResult};
use crate::gateway::EngineGateway;
use crate::registry::SymbolRegistry;
use crate::tokens;
use std::sync::Arc;
use tracing::{instrument, warn};

/// Strip whitespace and unify brackets: `sin[x]` becomes `sin(x)`.
pub fn normalize(expression: &str) -> String {
    expression
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| match c {
            '[' => '(',
            ']' => ')',
            other => other,
        })
        .collect()
}

#[derive(Debug)]
pub struct ExpressionValidator {
    registry: SymbolRegistry,
    gateway: Arc<EngineGateway>,
}

impl ExpressionValidator {
    pub fn new(registry: SymbolRegistry, gateway: Arc<EngineGateway>) -> Self {
        Self { registry, gateway }
    }

    /// Run all three tiers and return the normalized expression.
    #[instrument(skip(self))]
    pub fn validate(&self, expression: &str) -> PipelineResult<String> {
        let normalized = normalize(expression);
        let checked = self
            .check_grammar(&normalized)
            .and_then(|()| self.check_semantics(&normalized))
            .and_then(|()| self.gateway.validate_syntax(&normalized).map(|_| ()));

        match checked {
            Ok(()) => Ok(normalized),
            Err(err) => {
                warn!(expression = %normalized, category = err.category(), error = %err, "expression rejected");
                Err(err)
            }
        }
    }

    pub fn check_grammar(&self, normalized: &str) -> PipelineResult<()> {
        let invalid = tokens::identifiers(normalized).into_iter().find(|id| {
            !(id.is_call
                || id.is_single_letter()
                || self.registry.is_constant(id.text)
                || self.registry.is_keyword(id.text))
        });
        match invalid {
            Some(id) => Err(PipelineError::grammatical(id.text)),
            None => Ok(()),
        }
    }

    pub fn check_semantics(&self, normalized: &str) -> PipelineResult<()> {
        let disallowed = tokens::identifiers(normalized)
            .into_iter()
            .find(|id| id.is_call && !self.registry.is_function(id.text));
        match disallowed {
            Some(id) => Err(PipelineError::semantic(id.text)),
            None => Ok(()),
        }
    }
}
