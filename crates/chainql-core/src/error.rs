//! Error types for chainql
//!
//! Parsing and translation failures are raised before anything reaches the
//! execution client; execution failures are passed through from the driver.

use thiserror::Error;

/// Failure to turn callback source text into an expression tree
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The body is neither a single expression nor a block returning an object literal
    #[error("Unsupported callback shape: {0}")]
    UnsupportedShape(String),

    #[error("Unexpected character '{character}' at offset {offset}")]
    UnexpectedCharacter { character: char, offset: usize },

    #[error("Unexpected token {found} at offset {offset}, expected {expected}")]
    UnexpectedToken {
        found: String,
        expected: String,
        offset: usize,
    },

    #[error("Unexpected end of input, expected {0}")]
    UnexpectedEnd(String),

    #[error("Duplicate parameter name: {0}")]
    DuplicateParameter(String),

    #[error("Callback takes {found} parameter(s), expected {expected}")]
    ParameterCount { expected: usize, found: usize },
}

/// Failure to lower a query chain or an expression to SQL
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TranslationError {
    /// An expression construct with no SQL mapping
    #[error("Unsupported expression: {0}")]
    UnsupportedExpression(String),

    /// A query node kind with no clause rule
    #[error("Unknown query operation: {0}")]
    UnknownOperation(String),

    /// A root or join target that is not registered with the context
    #[error("Unknown set: {0}")]
    UnknownSet(String),
}

/// The main error type for chainql operations
#[derive(Error, Debug)]
pub enum Error {
    // ========== Compilation Errors ==========
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Translation error: {0}")]
    Translation(#[from] TranslationError),

    // ========== Execution Errors ==========
    /// Opaque failure reported by the execution client
    #[error("Execution error: {0}")]
    Execution(String),

    // ========== Configuration Errors ==========
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // ========== Serialization Errors ==========
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // ========== IO Errors ==========
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for chainql operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Returns true if the error was raised while compiling a chain, before execution
    pub fn is_translation_failure(&self) -> bool {
        matches!(self, Error::Parse(_) | Error::Translation(_))
    }

    /// Returns true if the error came back from the execution client
    pub fn is_execution_failure(&self) -> bool {
        matches!(self, Error::Execution(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::from(TranslationError::UnsupportedExpression("call to foo()".to_string()));
        assert_eq!(
            err.to_string(),
            "Translation error: Unsupported expression: call to foo()"
        );

        let err = ParseError::ParameterCount {
            expected: 2,
            found: 1,
        };
        assert_eq!(err.to_string(), "Callback takes 1 parameter(s), expected 2");
    }

    #[test]
    fn test_error_classification() {
        assert!(Error::from(ParseError::UnsupportedShape("empty block".into())).is_translation_failure());
        assert!(Error::from(TranslationError::UnknownSet("Comment".into())).is_translation_failure());
        assert!(!Error::Execution("connection refused".into()).is_translation_failure());
        assert!(Error::Execution("connection refused".into()).is_execution_failure());
    }
}
