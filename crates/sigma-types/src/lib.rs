//! Sigma Types
//!
//! This crate defines the data model shared across the Sigma workspace (currently
//! `sigma-engine`, `sigma-core` and `sigma-cli`). Keeping it separate lets the engine
//! contract and the pipeline exchange results without depending on each other.

#![warn(missing_docs)]

mod types;
pub use types::{
    EvaluationKind, EvaluationParams, EvaluationResult, ExpressionEvaluationRecord, ExpressionType,
    TypedResult, VariableBinding,
};
