//! Self-contained implementation of the engine contract

use crate::ast::{self, Expr};
use crate::evaluator::{self, Scope};
use crate::functions;
use crate::number::format_real;
use crate::parser::parse_expression;
use crate::printer::{print, typeset};
use crate::{EngineError, EngineResult, EvaluationResult, StopHandle, SymbolicEngine};
use tracing::trace;

/// Number of intervals a drawing domain is split into
pub const DRAW_INTERVALS: usize = 100;

const POINT_DECIMALS: u32 = 6;

/// Reference engine: exact rational folding, floating-point approximation and sampling.
///
/// Warnings raised during a call are collected and returned as the result's problems;
/// `reset` drops them together with any pending stop request.
#[derive(Debug, Default)]
pub struct ReferenceEngine {
    stop: StopHandle,
    warnings: Vec<String>,
}

impl ReferenceEngine {
    pub fn new() -> Self {
        Self::default()
    }

    fn simplified(&mut self, expression: &str) -> EngineResult<Expr> {
        let parsed = parse_expression(expression)?;
        let mut scope = Scope::new(&self.stop, &mut self.warnings);
        evaluator::simplify(&parsed, &mut scope)
    }

    fn finish(&mut self, text: String) -> EvaluationResult {
        EvaluationResult::with_problems(text, std::mem::take(&mut self.warnings))
    }

    fn bound_value(&mut self, text: &str) -> EngineResult<f64> {
        let expr = self.simplified(text)?;
        evaluator::numeric_value(&expr, None)
            .filter(|value| value.is_finite())
            .ok_or_else(|| EngineError::Evaluation(format!("drawing bound '{text}' is not a finite number")))
    }
}

impl SymbolicEngine for ReferenceEngine {
    fn validate_syntax(&mut self, expression: &str) -> EngineResult<String> {
        parse_expression(expression).map(|expr| print(&expr, None))
    }

    fn evaluate(&mut self, expression: &str) -> EngineResult<EvaluationResult> {
        let simplified = self.simplified(expression)?;
        let text = print(&simplified, None);
        trace!(expression, result = %text, "evaluated");
        Ok(self.finish(text))
    }

    fn calculate(&mut self, expression: &str, decimals: u32) -> EngineResult<EvaluationResult> {
        let simplified = self.simplified(expression)?;
        let mut scope = Scope::new(&self.stop, &mut self.warnings);
        let approximated = evaluator::numericize(&simplified, &mut scope)?;
        let text = print(&approximated, Some(decimals));
        trace!(expression, decimals, result = %text, "calculated");
        Ok(self.finish(text))
    }

    fn draw(
        &mut self,
        expression: &str,
        variable: &str,
        origin: &str,
        bound: &str,
    ) -> EngineResult<EvaluationResult> {
        let start = self.bound_value(origin)?;
        let end = self.bound_value(bound)?;
        if start >= end {
            return Err(EngineError::Domain(format!("empty drawing domain [{origin}, {bound}]")));
        }

        let expr = self.simplified(expression)?;
        if matches!(expr, Expr::Boolean(_) | Expr::Compare { .. } | Expr::List(_)) {
            return Err(EngineError::Evaluation(format!("'{expression}' cannot be drawn")));
        }
        if let Some(free) = ast::collect_symbols(&expr)
            .into_iter()
            .find(|symbol| symbol != variable && functions::constant_value(symbol).is_none())
        {
            return Err(EngineError::UnboundVariable(free));
        }

        let step = (end - start) / DRAW_INTERVALS as f64;
        let mut points = Vec::with_capacity(DRAW_INTERVALS + 1);
        let mut skipped = 0usize;
        for i in 0..=DRAW_INTERVALS {
            if self.stop.is_stop_requested() {
                return Err(EngineError::Stopped);
            }
            let x = start + step * i as f64;
            // Accumulated rounding would otherwise print the origin as 1E-16
            let x = if x.abs() < step * 1e-9 { 0.0 } else { x };
            match evaluator::numeric_value(&expr, Some((variable, x))) {
                Some(y) if y.is_finite() => points.push(format!(
                    "{{{},{}}}",
                    format_real(x, POINT_DECIMALS),
                    format_real(y, POINT_DECIMALS)
                )),
                _ => skipped += 1,
            }
        }

        if points.is_empty() {
            return Err(EngineError::Domain(format!("'{expression}' has no real values on the domain")));
        }
        if skipped > 0 {
            self.warnings.push(format!("{skipped} sample(s) outside the real domain were skipped"));
        }
        Ok(self.finish(format!("{{{}}}", points.join(","))))
    }

    fn format_for_display(&mut self, expression: &str) -> EngineResult<String> {
        parse_expression(expression).map(|expr| typeset(&expr))
    }

    fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    fn reset(&mut self) {
        self.warnings.clear();
        self.stop.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evaluate_and_calculate() {
        let mut engine = ReferenceEngine::new();
        assert_eq!(engine.evaluate("2+2").unwrap().expression_text(), "4");
        assert_eq!(engine.evaluate("x+2").unwrap().expression_text(), "x+2");
        assert_eq!(engine.calculate("Sqrt(2)", 1).unwrap().expression_text(), "1.4");
        assert_eq!(engine.calculate("x+2", 1).unwrap().expression_text(), "x+2.0");
        assert_eq!(engine.calculate("1/3", 4).unwrap().expression_text(), "0.3333");
    }

    #[test]
    fn integer_overflow_falls_back_to_reals() {
        let mut engine = ReferenceEngine::new();
        assert!(engine.evaluate("2^62*(-2)/(-1)").is_ok());
        assert!(engine.evaluate("x+(-2)^63").is_ok());
        assert!(engine.calculate("x-2^62*2", 1).is_ok());
    }

    #[test]
    fn domain_warnings_become_problems() {
        let mut engine = ReferenceEngine::new();
        let result = engine.evaluate("Sqrt(-4)").unwrap();
        assert_eq!(result.expression_text(), "Sqrt(-4)");
        assert_eq!(result.problems().len(), 1);

        // Warnings do not leak into the next call
        assert!(!engine.evaluate("1").unwrap().has_problems());
    }

    #[test]
    fn draw_samples_the_domain() {
        let mut engine = ReferenceEngine::new();
        let result = engine.draw("x^2", "x", "-1", "1").unwrap();
        let text = result.expression_text();
        assert!(text.starts_with("{{-1.0,1.0},"));
        assert!(text.ends_with(",{1.0,1.0}}"));
        assert_eq!(text.matches("},{").count(), DRAW_INTERVALS);
    }

    #[test]
    fn draw_skips_points_outside_the_real_domain() {
        let mut engine = ReferenceEngine::new();
        let result = engine.draw("Sqrt(x)", "x", "-1", "1").unwrap();
        assert!(result.has_problems());
    }

    #[test]
    fn draw_rejects_other_free_symbols() {
        let mut engine = ReferenceEngine::new();
        assert_eq!(
            engine.draw("x+y", "x", "0", "1"),
            Err(EngineError::UnboundVariable("y".into()))
        );
    }

    #[test]
    fn stop_request_aborts_and_reset_recovers() {
        let mut engine = ReferenceEngine::new();
        engine.stop_handle().request_stop();
        assert_eq!(engine.draw("x", "x", "0", "1"), Err(EngineError::Stopped));

        engine.reset();
        assert!(engine.draw("x", "x", "0", "1").is_ok());
    }

    #[test]
    fn display_form_is_typeset() {
        let mut engine = ReferenceEngine::new();
        assert_eq!(engine.format_for_display("True").unwrap(), "\\text{True}");
        assert!(engine.format_for_display("1+").is_err());
    }
}
