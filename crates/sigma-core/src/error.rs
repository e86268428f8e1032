//! Error taxonomy for the evaluation pipeline
//!
//! Validator failures are terminal for one expression and are recorded on that
//! expression's result record. Interruption while waiting for an engine permit and
//! configuration problems abort the call that hit them.

use thiserror::Error;

/// Errors raised by pipeline components
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    /// An identifier is neither a function call, a known constant nor a single-letter variable
    #[error("Grammatical error: unrecognized symbol '{token}'")]
    Grammatical { token: String },

    /// A function name is not on the whitelist
    #[error("Semantic error: function '{name}' is not allowed")]
    Semantic { name: String },

    /// The engine's parser rejected the normalized text
    #[error("Syntax error: {detail}")]
    Syntax { detail: String },

    /// The caller was interrupted while waiting for an admission-gate permit
    #[error("Interrupted while waiting to run '{operation}'")]
    ConcurrencyInterrupted { operation: String },

    /// Invalid or unreadable configuration
    #[error("Configuration error: {message}")]
    Configuration { message: String, setting: Option<String> },

    /// Input exceeds a configured size limit
    #[error("Limit exceeded: {message} (limit {limit}, got {actual})")]
    Limit { message: String, limit: usize, actual: usize },
}

impl PipelineError {
    /// Error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            PipelineError::Grammatical { .. } => "grammatical",
            PipelineError::Semantic { .. } => "semantic",
            PipelineError::Syntax { .. } => "syntax",
            PipelineError::ConcurrencyInterrupted { .. } => "concurrency",
            PipelineError::Configuration { .. } => "configuration",
            PipelineError::Limit { .. } => "limit",
        }
    }

    /// Whether the batch can continue past this error
    pub fn is_recoverable(&self) -> bool {
        match self {
            PipelineError::Grammatical { .. } => true,
            PipelineError::Semantic { .. } => true,
            PipelineError::Syntax { .. } => true,
            PipelineError::Limit { .. } => true,
            PipelineError::ConcurrencyInterrupted { .. } => false,
            PipelineError::Configuration { .. } => false,
        }
    }

    pub fn grammatical(token: impl Into<String>) -> Self {
        Self::Grammatical { token: token.into() }
    }

    pub fn semantic(name: impl Into<String>) -> Self {
        Self::Semantic { name: name.into() }
    }

    pub fn syntax(detail: impl Into<String>) -> Self {
        Self::Syntax { detail: detail.into() }
    }

    pub fn interrupted(operation: impl Into<String>) -> Self {
        Self::ConcurrencyInterrupted { operation: operation.into() }
    }

    /// Create a configuration error tied to one setting
    pub fn configuration(setting: &str, message: impl Into<String>) -> Self {
        Self::Configuration { message: message.into(), setting: Some(setting.to_string()) }
    }

    pub fn limit(message: impl Into<String>, limit: usize, actual: usize) -> Self {
        Self::Limit { message: message.into(), limit, actual }
    }
}

/// Result type alias for pipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validator_errors_are_recoverable() {
        assert!(PipelineError::grammatical("velocity").is_recoverable());
        assert!(PipelineError::semantic("minimize").is_recoverable());
        assert!(PipelineError::syntax("unexpected end").is_recoverable());
        assert!(!PipelineError::interrupted("draw").is_recoverable());
        assert!(!PipelineError::configuration("gate.max_in_flight", "must be positive").is_recoverable());
    }

    #[test]
    fn categories_and_messages() {
        let err = PipelineError::grammatical("velocity");
        assert_eq!(err.category(), "grammatical");
        assert_eq!(err.to_string(), "Grammatical error: unrecognized symbol 'velocity'");

        let err = PipelineError::limit("expression too long", 10, 12);
        assert_eq!(err.category(), "limit");
        assert_eq!(err.to_string(), "Limit exceeded: expression too long (limit 10, got 12)");
    }
}
