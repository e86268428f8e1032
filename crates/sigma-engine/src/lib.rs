//! The symbolic engine layer of the Sigma pipeline.
//!
//! This crate defines the `SymbolicEngine` trait, the contract the pipeline consumes
//! for validating, evaluating, approximating and plotting expressions, together with
//! `ReferenceEngine`, a small self-contained implementation of that contract.
//!
//! Engine instances keep call-scoped mutable state and are not meant to be shared:
//! each instance is driven by one thread at a time and reset between calls.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;

pub use sigma_types::EvaluationResult;

pub mod ast;
pub mod evaluator;
pub mod functions;
pub mod number;
pub mod parser;
pub mod printer;
pub mod reference;

pub use reference::ReferenceEngine;

/// Errors raised by an engine call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// The expression text could not be parsed
    #[error("Parse error: {0}")]
    Parse(String),

    /// The expression parsed but could not be evaluated
    #[error("Evaluation error: {0}")]
    Evaluation(String),

    /// A symbol had no value where one was required
    #[error("Unbound variable: {0}")]
    UnboundVariable(String),

    /// A value fell outside the domain of an operation
    #[error("Domain error: {0}")]
    Domain(String),

    /// The call observed a stop request and aborted
    #[error("Evaluation stopped by request")]
    Stopped,
}

pub type EngineResult<T> = Result<T, EngineError>;

/// Cooperative cancellation flag shared between an engine and whoever may stop it.
///
/// Clones observe the same flag. The engine polls it at safe points; setting it never
/// interrupts anything directly.
#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    requested: Arc<AtomicBool>,
}

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the engine to abort the call in flight.
    pub fn request_stop(&self) {
        self.requested.store(true, Ordering::SeqCst);
    }

    pub fn is_stop_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    /// Clear a pending request so the next call runs normally.
    pub fn clear(&self) {
        self.requested.store(false, Ordering::SeqCst);
    }

    /// Whether two handles share the same flag
    pub fn same_flag(&self, other: &StopHandle) -> bool {
        Arc::ptr_eq(&self.requested, &other.requested)
    }
}

/// Contract of a symbolic computation engine.
///
/// Implementations are `Send` so an instance can be handed to a worker, but never
/// `Sync`-shared: the pipeline guarantees a single caller per instance at any time.
pub trait SymbolicEngine: Send {
    /// Parse `expression` and return its canonical form, or fail with `EngineError::Parse`.
    fn validate_syntax(&mut self, expression: &str) -> EngineResult<String>;

    /// Evaluate symbolically.
    fn evaluate(&mut self, expression: &str) -> EngineResult<EvaluationResult>;

    /// Approximate numerically with `decimals` fractional digits.
    fn calculate(&mut self, expression: &str, decimals: u32) -> EngineResult<EvaluationResult>;

    /// Sample `expression` in `variable` over `[origin, bound]`.
    fn draw(
        &mut self,
        expression: &str,
        variable: &str,
        origin: &str,
        bound: &str,
    ) -> EngineResult<EvaluationResult>;

    /// Presentation form of an expression (typeset notation).
    fn format_for_display(&mut self, expression: &str) -> EngineResult<String>;

    /// Handle through which another thread can request a stop of the call in flight.
    fn stop_handle(&self) -> StopHandle;

    /// Drop call-scoped state, including a pending stop request.
    fn reset(&mut self);
}

/// Creates engine instances for the gateway's pool
pub trait EngineFactory: Send + Sync {
    fn create(&self) -> Box<dyn SymbolicEngine>;
}

impl<F> EngineFactory for F
where
    F: Fn() -> Box<dyn SymbolicEngine> + Send + Sync,
{
    fn create(&self) -> Box<dyn SymbolicEngine> {
        self()
    }
}
