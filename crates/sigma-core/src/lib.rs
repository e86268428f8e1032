#![allow(missing_docs)]
//! Core of the Sigma expression pipeline.
//!
//! This crate decides what kind of mathematical object an input string represents,
//! rejects input the engine must never see, and coordinates bounded, cached calls into
//! a symbolic engine that cannot be shared between threads.

/// Admission gate bounding in-flight engine calls
pub mod gate;
/// Engine pool with per-call confinement
pub mod gateway;
/// Result caching in front of the engine gateway
pub mod cache;
/// Expression type classification
pub mod classifier;
/// TOML configuration with environment overrides
pub mod config;
/// Pipeline error taxonomy
pub mod error;
/// Per-batch variable bindings
pub mod memory;
/// Structural pattern rules
pub mod patterns;
/// Batch orchestration
pub mod pipeline;
/// Constant and function whitelists
pub mod registry;
/// Per-type evaluation strategies
pub mod strategy;
/// Identifier scanning
pub mod tokens;
/// Grammar, semantic and syntax checks
pub mod validator;

// Re-export the types the outer layers use
pub use cache::{CacheStats, EvaluationCache, ResultCache};
pub use classifier::Classifier;
pub use config::SigmaConfig;
pub use error::{PipelineError, PipelineResult};
pub use memory::{AssignmentMemory, MemoryOutcome};
pub use pipeline::{Batch, EvaluationService, PipelineOrchestrator};
pub use strategy::{EvaluationStrategy, StrategyRegistry};
pub use validator::ExpressionValidator;

pub use sigma_engine::{EngineFactory, ReferenceEngine, StopHandle, SymbolicEngine};
pub use sigma_types::{
    EvaluationKind, EvaluationParams, EvaluationResult, ExpressionEvaluationRecord,
    ExpressionType, TypedResult, VariableBinding,
};
