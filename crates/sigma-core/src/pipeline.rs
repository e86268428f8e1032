//! Batch orchestration
//!
//! For each expression of a batch: substitute or capture bindings, validate, classify,
//! dispatch. Records come back in input order. A bad expression yields a record
//! describing the failure and never aborts its siblings.

use crate::cache::{self, EvaluationCache};
use crate::classifier::Classifier;
use crate::config::{LimitsConfig, SigmaConfig};
use crate::error::{PipelineError, PipelineResult};
use crate::gate::AdmissionGate;
use crate::gateway::EngineGateway;
use crate::memory::{AssignmentMemory, MemoryOutcome};
use crate::patterns::PatternLibrary;
use crate::registry::SymbolRegistry;
use crate::strategy::StrategyRegistry;
use crate::validator::ExpressionValidator;
use rayon::prelude::*;
use sigma_engine::{EngineFactory, ReferenceEngine, SymbolicEngine};
use sigma_types::{
    EvaluationKind, EvaluationParams, EvaluationResult, ExpressionEvaluationRecord,
    ExpressionType, TypedResult,
};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Orchestrates validation, classification and evaluation of expression batches
#[derive(Debug)]
pub struct PipelineOrchestrator {
    registry: SymbolRegistry,
    validator: ExpressionValidator,
    classifier: Classifier,
    strategies: StrategyRegistry,
    cache: Arc<EvaluationCache>,
    limits: LimitsConfig,
}

impl PipelineOrchestrator {
    /// Wire every component from `config`, creating engines with `factory`.
    pub fn new(config: &SigmaConfig, factory: impl EngineFactory + 'static) -> PipelineResult<Self> {
        config.validate()?;
        let registry = SymbolRegistry::new();

        let gate = Arc::new(AdmissionGate::new(
            config.gate.max_in_flight,
            config.gate.poll_interval(),
        )?);
        let gateway = Arc::new(EngineGateway::new(factory, gate));
        let cache = Arc::new(EvaluationCache::new(
            Arc::clone(&gateway),
            cache::backend_for(&config.cache),
        ));
        let patterns = Arc::new(PatternLibrary::new(&registry)?);

        info!(
            max_in_flight = config.gate.max_in_flight,
            cache_backend = ?config.cache.backend,
            "pipeline ready"
        );

        Ok(Self {
            registry,
            validator: ExpressionValidator::new(registry, gateway),
            classifier: Classifier::new(
                patterns,
                Arc::clone(&cache),
                config.classifier.pre_calculation_decimals,
            ),
            strategies: StrategyRegistry::standard(Arc::clone(&cache))?,
            cache,
            limits: config.limits.clone(),
        })
    }

    /// A pipeline backed by the built-in reference engine
    pub fn with_reference_engine(config: &SigmaConfig) -> PipelineResult<Self> {
        Self::new(config, || Box::new(ReferenceEngine::new()) as Box<dyn SymbolicEngine>)
    }

    pub fn validator(&self) -> &ExpressionValidator {
        &self.validator
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    pub fn strategies(&self) -> &StrategyRegistry {
        &self.strategies
    }

    pub fn cache(&self) -> &Arc<EvaluationCache> {
        &self.cache
    }

    /// Evaluate a batch of expressions sharing one assignment memory.
    ///
    /// Returns one record per expression, in input order. Fails as a whole only when the
    /// batch is too large or a call is interrupted while waiting for an engine permit.
    #[instrument(skip_all, fields(batch_id = tracing::field::Empty, expressions = expressions.len()))]
    pub fn evaluate_batch<S: AsRef<str>>(
        &self,
        expressions: &[S],
        params: &EvaluationParams,
    ) -> PipelineResult<Vec<ExpressionEvaluationRecord>> {
        let batch_id = uuid::Uuid::new_v4().to_string();
        tracing::Span::current().record("batch_id", batch_id.as_str());

        if expressions.len() > self.limits.max_batch_size {
            return Err(PipelineError::limit(
                "batch has too many expressions",
                self.limits.max_batch_size,
                expressions.len(),
            ));
        }

        info!(decimals = params.decimals, origin = %params.origin, bound = %params.bound, "Starting batch evaluation");

        let mut memory = AssignmentMemory::new(self.registry);
        let outcome: PipelineResult<Vec<_>> = expressions
            .iter()
            .map(|expression| self.evaluate_one(&mut memory, expression.as_ref(), params))
            .collect();
        memory.clear();
        let records = outcome?;

        info!(records = records.len(), "Batch evaluation complete");
        Ok(records)
    }

    fn evaluate_one(
        &self,
        memory: &mut AssignmentMemory,
        original: &str,
        params: &EvaluationParams,
    ) -> PipelineResult<ExpressionEvaluationRecord> {
        if original.trim().is_empty() {
            return Ok(ExpressionEvaluationRecord::new(original, ExpressionType::None, Vec::new()));
        }

        let length = original.chars().count();
        if length > self.limits.max_expression_length {
            let err = PipelineError::limit(
                "expression is too long",
                self.limits.max_expression_length,
                length,
            );
            return Ok(rejected(original, &err));
        }

        let substituted = match memory.apply(original) {
            MemoryOutcome::Assigned { binding, .. } => {
                debug!(symbol = %binding.symbol, "assignment captured");
                let results = self.strategies.dispatch(
                    ExpressionType::Assignment,
                    original,
                    params,
                )?;
                return Ok(ExpressionEvaluationRecord::new(
                    original,
                    ExpressionType::Assignment,
                    results,
                ));
            }
            MemoryOutcome::Substituted(text) => text,
        };

        let normalized = match self.validator.validate(&substituted) {
            Ok(normalized) => normalized,
            Err(err) if err.is_recoverable() => return Ok(rejected(original, &err)),
            Err(err) => return Err(err),
        };

        let expression_type = self.classifier.classify(&normalized)?;

        if expression_type == ExpressionType::Unknown {
            if let Some(symbol) = memory.unbound_symbols_in(&normalized).into_iter().next() {
                let err = PipelineError::grammatical(symbol);
                warn!(expression = %normalized, error = %err, "unbound symbol");
                return Ok(rejected(original, &err));
            }
        }

        let results = self.strategies.dispatch(expression_type, &normalized, params)?;
        debug!(expression = %normalized, %expression_type, "expression evaluated");
        Ok(ExpressionEvaluationRecord::new(original, expression_type, results))
    }

    /// Classify one standalone expression, validating it first.
    ///
    /// No bindings are in scope, so unlike `evaluate_batch` nothing is substituted.
    pub fn classify(&self, expression: &str) -> PipelineResult<ExpressionType> {
        if expression.trim().is_empty() {
            return Ok(ExpressionType::None);
        }
        let mut memory = AssignmentMemory::new(self.registry);
        match memory.apply(expression) {
            MemoryOutcome::Assigned { .. } => Ok(ExpressionType::Assignment),
            MemoryOutcome::Substituted(text) => {
                let normalized = self.validator.validate(&text)?;
                self.classifier.classify(&normalized)
            }
        }
    }

    /// Broadcast a stop request to every strategy's engines.
    pub fn cancel_current_evaluation(&self) {
        info!("Cancelling current evaluation");
        self.strategies.stop_all();
    }
}

/// Record for an expression that never reached a strategy
fn rejected(original: &str, err: &PipelineError) -> ExpressionEvaluationRecord {
    ExpressionEvaluationRecord::new(
        original,
        ExpressionType::Unknown,
        vec![TypedResult::new(
            EvaluationKind::Evaluation,
            EvaluationResult::failed(original, err.to_string()),
        )],
    )
}

/// One batch of expressions with its parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    pub expressions: Vec<String>,
    pub params: EvaluationParams,
}

impl Batch {
    pub fn new(expressions: Vec<String>, params: EvaluationParams) -> Self {
        Self { expressions, params }
    }
}

/// Runs independent batches in parallel over one shared pipeline
#[derive(Debug, Clone)]
pub struct EvaluationService {
    pipeline: Arc<PipelineOrchestrator>,
}

impl EvaluationService {
    pub fn new(pipeline: Arc<PipelineOrchestrator>) -> Self {
        Self { pipeline }
    }

    pub fn pipeline(&self) -> &Arc<PipelineOrchestrator> {
        &self.pipeline
    }

    /// Evaluate batches on the rayon pool. Each batch gets its own assignment memory;
    /// results are in input order.
    pub fn evaluate_batches(
        &self,
        batches: Vec<Batch>,
    ) -> Vec<PipelineResult<Vec<ExpressionEvaluationRecord>>> {
        batches
            .into_par_iter()
            .map(|batch| self.pipeline.evaluate_batch(&batch.expressions, &batch.params))
            .collect()
    }

    pub fn cancel_current_evaluation(&self) {
        self.pipeline.cancel_current_evaluation();
    }
}
