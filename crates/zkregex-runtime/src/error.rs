//! Error types for circuit program evaluation and rendering

use thiserror::Error;

/// Result type alias for runtime operations
pub type Result<T> = std::result::Result<T, RuntimeError>;

/// Errors raised while checking, evaluating or rendering a circuit program
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// The operation list references something it is not allowed to
    #[error("Malformed program: {0}")]
    MalformedProgram(String),

    /// The input handed to the evaluator does not fit the program
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Other errors not covered by specific variants
    #[error("{0}")]
    Other(String),
}

impl RuntimeError {
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedProgram(msg.into())
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }
}
