//! Structural pattern library
//!
//! Rules are tried in a fixed order and the first whose patterns all match decides the
//! type. Equation and boolean shapes come first because the looser numeric and function
//! rules would also match parts of them.

use crate::error::{PipelineError, PipelineResult};
use crate::registry::SymbolRegistry;
use regex::Regex;
use sigma_types::ExpressionType;
use tracing::trace;

const NUMBER: &str = r"(?:\d+(?:\.\d*)?|\.\d+)(?:E-?\d+)?";

/// One classification rule: every pattern must match
#[derive(Debug)]
struct PatternRule {
    expression_type: ExpressionType,
    patterns: Vec<Regex>,
}

impl PatternRule {
    fn new(expression_type: ExpressionType, sources: &[&str]) -> PipelineResult<Self> {
        let patterns = sources
            .iter()
            .map(|source| {
                Regex::new(source).map_err(|err| {
                    PipelineError::configuration(
                        "patterns",
                        format!("invalid {expression_type} pattern: {err}"),
                    )
                })
            })
            .collect::<PipelineResult<Vec<_>>>()?;
        Ok(Self { expression_type, patterns })
    }

    fn matches(&self, text: &str) -> bool {
        self.patterns.iter().all(|pattern| pattern.is_match(text))
    }
}

/// Compiled rules, built once and shared
#[derive(Debug)]
pub struct PatternLibrary {
    rules: Vec<PatternRule>,
}

impl PatternLibrary {
    pub fn new(registry: &SymbolRegistry) -> PipelineResult<Self> {
        let mut names: Vec<&str> = registry.constants().iter().map(|c| c.name).collect();
        names.sort_by_key(|name| std::cmp::Reverse(name.len()));
        let constants = names.iter().map(|name| regex::escape(name)).collect::<Vec<_>>().join("|");

        let term = format!(r"[-+]?(?:{NUMBER}|(?i:{constants}))");
        let numeric = format!(r"{term}(?:[-+*/]{term})*");
        let row = format!(r"\{{{numeric}(?:,{numeric})*\}}");

        let rules = vec![
            PatternRule::new(ExpressionType::Equation, &["=="])?,
            PatternRule::new(ExpressionType::Boolean, &["^(?:True|False)$"])?,
            PatternRule::new(ExpressionType::Assignment, &["^[a-zA-Z]=[^=].*$"])?,
            PatternRule::new(ExpressionType::Matrix, &[&format!(r"^\{{{row}(?:,{row})+\}}$")])?,
            PatternRule::new(ExpressionType::Vector, &[&format!("^{row}$")])?,
            PatternRule::new(ExpressionType::Numeric, &[&format!("^{numeric}$")])?,
            PatternRule::new(
                ExpressionType::Function,
                &["[A-Za-z]", r"[-+*/^()]", r"^[A-Za-z0-9_.,+\-*/^(){}<>=!]+$"],
            )?,
        ];

        Ok(Self { rules })
    }

    /// Type of a normalized expression; `None` for blank input, `Unknown` when nothing matches.
    pub fn match_type(&self, text: &str) -> ExpressionType {
        if text.trim().is_empty() {
            return ExpressionType::None;
        }
        let matched = self
            .rules
            .iter()
            .find(|rule| rule.matches(text))
            .map_or(ExpressionType::Unknown, |rule| rule.expression_type);
        trace!(text, expression_type = %matched, "pattern match");
        matched
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn library() -> PatternLibrary {
        PatternLibrary::new(&SymbolRegistry::new()).unwrap()
    }

    #[test]
    fn structural_shapes() {
        let lib = library();
        assert_eq!(lib.match_type("x^2+y^2==1"), ExpressionType::Equation);
        assert_eq!(lib.match_type("True"), ExpressionType::Boolean);
        assert_eq!(lib.match_type("a=5"), ExpressionType::Assignment);
        assert_eq!(lib.match_type("{{1,2},{3,4}}"), ExpressionType::Matrix);
        assert_eq!(lib.match_type("{1,2,3}"), ExpressionType::Vector);
        assert_eq!(lib.match_type("{-1.5,2/3}"), ExpressionType::Vector);
        assert_eq!(lib.match_type("2+2"), ExpressionType::Numeric);
        assert_eq!(lib.match_type("sin(x)"), ExpressionType::Function);
        assert_eq!(lib.match_type("x+2"), ExpressionType::Function);
        assert_eq!(lib.match_type("b"), ExpressionType::Unknown);
        assert_eq!(lib.match_type(""), ExpressionType::None);
    }

    #[test]
    fn numeric_terms_include_constants_and_exponents() {
        let lib = library();
        assert_eq!(lib.match_type("2*Pi"), ExpressionType::Numeric);
        assert_eq!(lib.match_type("-pi/2"), ExpressionType::Numeric);
        assert_eq!(lib.match_type("2.5E20"), ExpressionType::Numeric);
        assert_eq!(lib.match_type("1.0E-7"), ExpressionType::Numeric);
        assert_eq!(lib.match_type("-1/3"), ExpressionType::Numeric);
        assert_eq!(lib.match_type("GoldenRatio+1"), ExpressionType::Numeric);
        // No letter, no function shape
        assert_eq!(lib.match_type("2^3"), ExpressionType::Unknown);
    }

    #[test]
    fn equality_is_not_an_assignment() {
        let lib = library();
        assert_eq!(lib.match_type("a==1"), ExpressionType::Equation);
        assert_eq!(lib.match_type("ab=1"), ExpressionType::Unknown);
        assert_eq!(lib.match_type("x=y==1"), ExpressionType::Equation);
    }
}
