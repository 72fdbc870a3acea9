//! Error types for LexRAG.
//!
//! One enum covers every failure category of an answering run. Which of these
//! are fatal to a run is decided by the orchestrator, not here: retrieval
//! errors degrade to empty evidence, grading errors abort the run.

use std::time::Duration;
use thiserror::Error;

/// Unified error type for LexRAG.
///
/// All fallible functions return `Result<T, AppError>`.
/// We never panic: errors must be represented and propagated.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// LLM provider errors (transport, HTTP status, unparseable body)
    #[error("LLM error: {0}")]
    Llm(String),

    /// Evidence source errors
    #[error("Retrieval error: {0}")]
    Retrieval(String),

    /// A grader could not produce a verdict
    #[error("Grading error: {0}")]
    Grading(String),

    /// Answer generation errors
    #[error("Generation error: {0}")]
    Generation(String),

    /// Prompt system errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// An external call exceeded its deadline
    #[error("{operation} timed out after {}s", .after.as_secs_f64())]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    /// The caller abandoned the request
    #[error("Run cancelled")]
    Cancelled,

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl AppError {
    /// Whether this error was caused by a deadline rather than a bad response.
    pub fn is_timeout(&self) -> bool {
        matches!(self, AppError::Timeout { .. })
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;
