//! Compiler error types

use thiserror::Error;

/// Parse failure with the byte offset it was detected at
///
/// Errors from [`crate::compile`] carry offsets into the pattern as written.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} at offset {offset}")]
pub struct ParseError {
    pub message: String,
    pub offset: usize,
}

impl ParseError {
    pub fn new(message: impl Into<String>, offset: usize) -> Self {
        Self { message: message.into(), offset }
    }
}

#[derive(Debug, Error)]
pub enum CompilerError {
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Range error: {0}")]
    Range(String),

    #[error("Structural invariant violated: {0}")]
    StructuralInvariant(String),

    #[error("Sub-pattern not found: {0}")]
    SubPatternNotFound(String),

    #[error("Invalid reveal: {0}")]
    InvalidReveal(String),

    #[error("Invalid graph: {0}")]
    InvalidGraph(String),

    #[error("Circuit error: {0}")]
    Circuit(String),

    #[error(transparent)]
    Runtime(#[from] zkregex_runtime::RuntimeError),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, CompilerError>;
