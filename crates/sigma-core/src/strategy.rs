//! Evaluation strategies and the dispatch table
//!
//! Each evaluable `ExpressionType` maps to exactly one strategy. The table is checked
//! for completeness when it is built, so dispatch never falls through.

use crate::cache::EvaluationCache;
use crate::error::{PipelineError, PipelineResult};
use crate::registry::SymbolRegistry;
use crate::tokens;
use sigma_types::{EvaluationKind, EvaluationParams, ExpressionType, TypedResult};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Variable used for drawing when an expression has no free single-letter symbol
pub const DEFAULT_DRAW_VARIABLE: &str = "x";

/// Type-specific computation recipe
pub trait EvaluationStrategy: Send + Sync {
    fn supported_type(&self) -> ExpressionType;

    fn evaluate(
        &self,
        expression: &str,
        params: &EvaluationParams,
    ) -> PipelineResult<Vec<TypedResult>>;

    /// The cache this strategy computes through; used to broadcast stop requests
    fn cache(&self) -> &Arc<EvaluationCache>;
}

/// First free single-letter symbol of `expression`, or `x`.
pub fn draw_variable(expression: &str) -> String {
    let registry = SymbolRegistry::new();
    tokens::identifiers(expression)
        .into_iter()
        .find(|id| id.is_single_letter() && !id.is_call && !registry.is_constant(id.text))
        .map_or_else(|| DEFAULT_DRAW_VARIABLE.to_string(), |id| id.text.to_string())
}

/// Evaluate, then draw: functions and best-effort unknowns
pub struct PlotStrategy {
    expression_type: ExpressionType,
    cache: Arc<EvaluationCache>,
}

impl PlotStrategy {
    pub fn new(expression_type: ExpressionType, cache: Arc<EvaluationCache>) -> Self {
        Self { expression_type, cache }
    }
}

impl EvaluationStrategy for PlotStrategy {
    fn supported_type(&self) -> ExpressionType {
        self.expression_type
    }

    fn evaluate(
        &self,
        expression: &str,
        params: &EvaluationParams,
    ) -> PipelineResult<Vec<TypedResult>> {
        let evaluation = self.cache.evaluate(expression)?;
        let drawing = self.cache.draw_over(expression, &draw_variable(expression), params)?;
        Ok(vec![
            TypedResult::new(EvaluationKind::Evaluation, evaluation),
            TypedResult::new(EvaluationKind::Drawing, drawing),
        ])
    }

    fn cache(&self) -> &Arc<EvaluationCache> {
        &self.cache
    }
}

/// Evaluate only: equations and matrices
pub struct SymbolicStrategy {
    expression_type: ExpressionType,
    cache: Arc<EvaluationCache>,
}

impl SymbolicStrategy {
    pub fn new(expression_type: ExpressionType, cache: Arc<EvaluationCache>) -> Self {
        Self { expression_type, cache }
    }
}

impl EvaluationStrategy for SymbolicStrategy {
    fn supported_type(&self) -> ExpressionType {
        self.expression_type
    }

    fn evaluate(
        &self,
        expression: &str,
        _params: &EvaluationParams,
    ) -> PipelineResult<Vec<TypedResult>> {
        let evaluation = self.cache.evaluate(expression)?;
        Ok(vec![TypedResult::new(EvaluationKind::Evaluation, evaluation)])
    }

    fn cache(&self) -> &Arc<EvaluationCache> {
        &self.cache
    }
}

/// Evaluate and convert the result to display form: booleans and vectors
pub struct DisplayStrategy {
    expression_type: ExpressionType,
    cache: Arc<EvaluationCache>,
}

impl DisplayStrategy {
    pub fn new(expression_type: ExpressionType, cache: Arc<EvaluationCache>) -> Self {
        Self { expression_type, cache }
    }
}

impl EvaluationStrategy for DisplayStrategy {
    fn supported_type(&self) -> ExpressionType {
        self.expression_type
    }

    fn evaluate(
        &self,
        expression: &str,
        _params: &EvaluationParams,
    ) -> PipelineResult<Vec<TypedResult>> {
        let evaluation = self.cache.evaluate(expression)?;
        // A failed evaluation has nothing worth formatting
        let evaluation = if evaluation.has_problems() {
            evaluation
        } else {
            self.cache.format_for_display(evaluation)?
        };
        Ok(vec![TypedResult::new(EvaluationKind::Evaluation, evaluation)])
    }

    fn cache(&self) -> &Arc<EvaluationCache> {
        &self.cache
    }
}

/// Evaluate, approximate and draw
pub struct NumericStrategy {
    cache: Arc<EvaluationCache>,
}

impl NumericStrategy {
    pub fn new(cache: Arc<EvaluationCache>) -> Self {
        Self { cache }
    }
}

impl EvaluationStrategy for NumericStrategy {
    fn supported_type(&self) -> ExpressionType {
        ExpressionType::Numeric
    }

    fn evaluate(
        &self,
        expression: &str,
        params: &EvaluationParams,
    ) -> PipelineResult<Vec<TypedResult>> {
        let evaluation = self.cache.evaluate(expression)?;
        let calculation = self.cache.calculate(expression, params.decimals)?;
        let drawing = self.cache.draw_over(expression, &draw_variable(expression), params)?;
        Ok(vec![
            TypedResult::new(EvaluationKind::Evaluation, evaluation),
            TypedResult::new(EvaluationKind::Calculation, calculation),
            TypedResult::new(EvaluationKind::Drawing, drawing),
        ])
    }

    fn cache(&self) -> &Arc<EvaluationCache> {
        &self.cache
    }
}

/// Assignments were already captured by the batch's memory; nothing reaches the engine
pub struct AssignmentStrategy {
    cache: Arc<EvaluationCache>,
}

impl AssignmentStrategy {
    pub fn new(cache: Arc<EvaluationCache>) -> Self {
        Self { cache }
    }
}

impl EvaluationStrategy for AssignmentStrategy {
    fn supported_type(&self) -> ExpressionType {
        ExpressionType::Assignment
    }

    fn evaluate(
        &self,
        _expression: &str,
        _params: &EvaluationParams,
    ) -> PipelineResult<Vec<TypedResult>> {
        Ok(Vec::new())
    }

    fn cache(&self) -> &Arc<EvaluationCache> {
        &self.cache
    }
}

/// Dispatch table from expression type to strategy
pub struct StrategyRegistry {
    strategies: HashMap<ExpressionType, Box<dyn EvaluationStrategy>>,
}

impl std::fmt::Debug for StrategyRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut types: Vec<_> = self.strategies.keys().map(|t| t.as_str()).collect();
        types.sort_unstable();
        f.debug_struct("StrategyRegistry").field("types", &types).finish()
    }
}

impl StrategyRegistry {
    /// Build the table. Fails if two strategies claim a type or an evaluable type is left unmapped.
    pub fn new(strategies: Vec<Box<dyn EvaluationStrategy>>) -> PipelineResult<Self> {
        let mut table = HashMap::with_capacity(strategies.len());
        for strategy in strategies {
            let expression_type = strategy.supported_type();
            if expression_type == ExpressionType::None {
                return Err(PipelineError::configuration(
                    "strategies",
                    "no strategy may be registered for the None type",
                ));
            }
            if table.insert(expression_type, strategy).is_some() {
                return Err(PipelineError::configuration(
                    "strategies",
                    format!("more than one strategy registered for {expression_type}"),
                ));
            }
        }

        if let Some(missing) = ExpressionType::EVALUABLE.iter().find(|t| !table.contains_key(*t)) {
            return Err(PipelineError::configuration(
                "strategies",
                format!("no strategy registered for {missing}"),
            ));
        }

        Ok(Self { strategies: table })
    }

    /// The standard table: one strategy per evaluable type, all sharing `cache`
    pub fn standard(cache: Arc<EvaluationCache>) -> PipelineResult<Self> {
        Self::new(vec![
            Box::new(PlotStrategy::new(ExpressionType::Function, Arc::clone(&cache))),
            Box::new(SymbolicStrategy::new(ExpressionType::Equation, Arc::clone(&cache))),
            Box::new(SymbolicStrategy::new(ExpressionType::Matrix, Arc::clone(&cache))),
            Box::new(DisplayStrategy::new(ExpressionType::Boolean, Arc::clone(&cache))),
            Box::new(DisplayStrategy::new(ExpressionType::Vector, Arc::clone(&cache))),
            Box::new(NumericStrategy::new(Arc::clone(&cache))),
            Box::new(AssignmentStrategy::new(Arc::clone(&cache))),
            Box::new(PlotStrategy::new(ExpressionType::Unknown, cache)),
        ])
    }

    pub fn get(&self, expression_type: ExpressionType) -> Option<&dyn EvaluationStrategy> {
        self.strategies.get(&expression_type).map(|strategy| strategy.as_ref())
    }

    /// Run the strategy registered for `expression_type`
    #[instrument(skip(self, params))]
    pub fn dispatch(
        &self,
        expression_type: ExpressionType,
        expression: &str,
        params: &EvaluationParams,
    ) -> PipelineResult<Vec<TypedResult>> {
        let strategy = self.get(expression_type).ok_or_else(|| {
            PipelineError::configuration(
                "strategies",
                format!("no strategy registered for {expression_type}"),
            )
        })?;
        let results = strategy.evaluate(expression, params)?;
        debug!(results = results.len(), "strategy finished");
        Ok(results)
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn EvaluationStrategy> {
        self.strategies.values().map(|strategy| strategy.as_ref())
    }

    /// Send a stop request through every registered strategy's cache
    pub fn stop_all(&self) {
        for strategy in self.iter() {
            strategy.cache().stop_request();
        }
    }
}
