//! Error types for querylike.

use thiserror::Error;

/// The main error type for querylike operations.
#[derive(Debug, Error)]
pub enum LikeError {
    /// Failed to parse an expression in the textual notation.
    #[error("Parse error at position {position}: {message}")]
    Parse { position: usize, message: String },

    /// Regex evaluation ran past the match budget.
    #[error("Pattern '{pattern}' exceeded the {budget_ms}ms match budget")]
    PatternTimeout { pattern: String, budget_ms: u128 },

    /// The derived regex could not be compiled (size limit, usually).
    #[error("Invalid pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// An expression could not be evaluated against a row.
    #[error("Evaluation error: {0}")]
    Evaluation(String),

    /// A provider-only function reached the in-memory evaluator.
    #[error("'{0}' can only be evaluated by the database provider; rewrite the tree first")]
    ClientEvaluation(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl LikeError {
    /// Create a parse error at the given position.
    pub fn parse(position: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            position,
            message: message.into(),
        }
    }

    /// Create an evaluation error.
    pub fn eval(message: impl Into<String>) -> Self {
        Self::Evaluation(message.into())
    }

    /// Whether this is a match budget timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::PatternTimeout { .. })
    }
}

/// Result type alias for querylike operations.
pub type LikeResult<T> = Result<T, LikeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = LikeError::parse(5, "unexpected character");
        assert_eq!(
            err.to_string(),
            "Parse error at position 5: unexpected character"
        );
    }

    #[test]
    fn test_timeout_display() {
        let err = LikeError::PatternTimeout {
            pattern: "a%b".to_string(),
            budget_ms: 1000,
        };
        assert!(err.is_timeout());
        assert_eq!(
            err.to_string(),
            "Pattern 'a%b' exceeded the 1000ms match budget"
        );
    }
}
