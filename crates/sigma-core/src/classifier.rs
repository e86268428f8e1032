//! Expression classifier
//!
//! Literal pattern matching cannot tell `x+2` (a function of `x`) from `Sqrt(2)` (a
//! number that looks like a function). The classifier therefore also matches the engine's
//! evaluated form and, when that still looks like a function, a low-precision
//! approximation of it. Both round-trips go through the cache.

use crate::cache::EvaluationCache;
use crate::error::PipelineResult;
use crate::patterns::PatternLibrary;
use sigma_types::ExpressionType;
use std::sync::Arc;
use tracing::{debug, instrument};

fn normalized(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}

#[derive(Debug)]
pub struct Classifier {
    patterns: Arc<PatternLibrary>,
    cache: Arc<EvaluationCache>,
    pre_calculation_decimals: u32,
}

impl Classifier {
    pub fn new(
        patterns: Arc<PatternLibrary>,
        cache: Arc<EvaluationCache>,
        pre_calculation_decimals: u32,
    ) -> Self {
        Self { patterns, cache, pre_calculation_decimals }
    }

    /// Classify a normalized expression. Blank input is `None`.
    #[instrument(skip(self))]
    pub fn classify(&self, expression: &str) -> PipelineResult<ExpressionType> {
        let text = normalized(expression);
        if text.is_empty() {
            return Ok(ExpressionType::None);
        }

        let raw_type = self.patterns.match_type(&text);
        // Evaluating an assignment is meaningless; the literal form decides
        if raw_type == ExpressionType::Assignment {
            return Ok(ExpressionType::Assignment);
        }

        let evaluated = self.cache.evaluate(&text)?;
        let pre_eval_type = self.patterns.match_type(&normalized(evaluated.expression_text()));

        let classified = if pre_eval_type == ExpressionType::Function {
            let calculated = self.cache.calculate(&text, self.pre_calculation_decimals)?;
            match self.patterns.match_type(&normalized(calculated.expression_text())) {
                ExpressionType::Numeric => ExpressionType::Numeric,
                _ => ExpressionType::Function,
            }
        } else if pre_eval_type != ExpressionType::Unknown && pre_eval_type != ExpressionType::None
        {
            pre_eval_type
        } else {
            raw_type
        };

        debug!(%raw_type, %pre_eval_type, %classified, "expression classified");
        Ok(classified)
    }

    /// Classify input that may be absent
    pub fn classify_optional(&self, expression: Option<&str>) -> PipelineResult<ExpressionType> {
        expression.map_or(Ok(ExpressionType::None), |text| self.classify(text))
    }
}
