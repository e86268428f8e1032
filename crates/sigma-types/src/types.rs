use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of mathematical object an expression string represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExpressionType {
    /// Blank or missing input
    None,
    /// Single-letter variable binding (`a=1`)
    Assignment,
    /// Equation containing `==`
    Equation,
    /// The literal `True` or `False`
    Boolean,
    /// Closed-form numeric expression
    Numeric,
    /// Brace-grouped numeric rows (two or more)
    Matrix,
    /// Single brace-grouped numeric row
    Vector,
    /// Expression with at least one free variable or function call
    Function,
    /// Nothing else matched
    Unknown,
}

impl ExpressionType {
    /// Every type a strategy can be registered for (all but `None`).
    pub const EVALUABLE: [Self; 8] = [
        Self::Assignment,
        Self::Equation,
        Self::Boolean,
        Self::Numeric,
        Self::Matrix,
        Self::Vector,
        Self::Function,
        Self::Unknown,
    ];

    /// Stable lowercase name used in logs.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Assignment => "assignment",
            Self::Equation => "equation",
            Self::Boolean => "boolean",
            Self::Numeric => "numeric",
            Self::Matrix => "matrix",
            Self::Vector => "vector",
            Self::Function => "function",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ExpressionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tags one computed result within a multi-result record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EvaluationKind {
    /// Symbolic evaluation
    Evaluation,
    /// Numeric approximation
    Calculation,
    /// Plot points
    Drawing,
}

/// Output of a single engine call.
///
/// A result is always structurally valid: engine failures are reported through
/// `problems` rather than by failing the call, so callers must inspect `problems`
/// to detect a degenerate computation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationResult {
    expression_text: String,
    problems: Vec<String>,
}

impl EvaluationResult {
    /// A clean result with no problems.
    pub fn new(expression_text: impl Into<String>) -> Self {
        Self { expression_text: expression_text.into(), problems: Vec::new() }
    }

    /// A result carrying engine-emitted warnings or errors.
    pub fn with_problems(expression_text: impl Into<String>, problems: Vec<String>) -> Self {
        Self { expression_text: expression_text.into(), problems }
    }

    /// A degenerate result for a failed computation on `expression_text`.
    pub fn failed(expression_text: impl Into<String>, problem: impl Into<String>) -> Self {
        Self { expression_text: expression_text.into(), problems: vec![problem.into()] }
    }

    /// The resulting expression text
    pub fn expression_text(&self) -> &str {
        &self.expression_text
    }

    /// Warnings and errors reported by the engine, in emission order
    pub fn problems(&self) -> &[String] {
        &self.problems
    }

    /// Whether the engine reported anything
    pub fn has_problems(&self) -> bool {
        !self.problems.is_empty()
    }

    /// Replaces the expression text, keeping the reported problems.
    ///
    /// Used by presentation passes that rewrite a result before it is embedded in a record.
    pub fn with_expression_text(self, expression_text: impl Into<String>) -> Self {
        Self { expression_text: expression_text.into(), problems: self.problems }
    }
}

/// A result tagged with the operation that produced it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypedResult {
    /// Which operation produced the result
    pub kind: EvaluationKind,
    /// The engine output
    pub result: EvaluationResult,
}

impl TypedResult {
    /// Pairs a result with its kind.
    pub fn new(kind: EvaluationKind, result: EvaluationResult) -> Self {
        Self { kind, result }
    }
}

/// One record per input expression of a batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpressionEvaluationRecord {
    /// The expression exactly as submitted, before substitution
    pub original_expression: String,
    /// Classification of the (possibly substituted) expression
    #[serde(rename = "type")]
    pub expression_type: ExpressionType,
    /// Ordered results; empty for assignments and rejected input
    pub results: Vec<TypedResult>,
}

impl ExpressionEvaluationRecord {
    /// Builds a record from its parts.
    pub fn new(
        original_expression: impl Into<String>,
        expression_type: ExpressionType,
        results: Vec<TypedResult>,
    ) -> Self {
        Self { original_expression: original_expression.into(), expression_type, results }
    }

    /// Returns the first result of the given kind, if any.
    pub fn result(&self, kind: EvaluationKind) -> Option<&EvaluationResult> {
        self.results.iter().find(|r| r.kind == kind).map(|r| &r.result)
    }

    /// Whether any embedded result reported a problem
    pub fn has_problems(&self) -> bool {
        self.results.iter().any(|r| r.result.has_problems())
    }
}

/// A single-letter variable bound to a value within one batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableBinding {
    /// The bound symbol
    pub symbol: String,
    /// Its replacement text
    pub value: String,
}

/// Evaluation parameters shared by every expression of a batch
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EvaluationParams {
    /// Decimal precision for numeric approximation
    pub decimals: u32,
    /// Lower end of the drawing domain
    pub origin: String,
    /// Upper end of the drawing domain
    pub bound: String,
}

impl EvaluationParams {
    /// Creates parameters from their parts.
    pub fn new(decimals: u32, origin: impl Into<String>, bound: impl Into<String>) -> Self {
        Self { decimals, origin: origin.into(), bound: bound.into() }
    }
}

impl Default for EvaluationParams {
    fn default() -> Self {
        Self { decimals: 10, origin: "-10".to_string(), bound: "10".to_string() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evaluable_types_exclude_none() {
        assert!(!ExpressionType::EVALUABLE.contains(&ExpressionType::None));
        assert_eq!(ExpressionType::EVALUABLE.len(), 8);
    }

    #[test]
    fn record_serializes_with_camel_case_fields() {
        let record = ExpressionEvaluationRecord::new(
            "1+1",
            ExpressionType::Numeric,
            vec![TypedResult::new(EvaluationKind::Evaluation, EvaluationResult::new("2"))],
        );

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["originalExpression"], "1+1");
        assert_eq!(json["type"], "Numeric");
        assert_eq!(json["results"][0]["kind"], "Evaluation");
        assert_eq!(json["results"][0]["result"]["expressionText"], "2");
    }

    #[test]
    fn rewriting_text_keeps_problems() {
        let result = EvaluationResult::failed("x", "division by zero");
        let rewritten = result.with_expression_text("\\text{x}");
        assert_eq!(rewritten.expression_text(), "\\text{x}");
        assert_eq!(rewritten.problems(), ["division by zero".to_string()]);
    }
}
