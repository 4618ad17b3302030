//! Error types for the clustering pipeline.

use athena_core::MessageError;
use athena_llm::LlmError;
use thiserror::Error;

/// Errors that can occur while analyzing or clustering a message batch.
#[derive(Error, Debug)]
pub enum ClusterError {
    /// A message failed validation.
    #[error(transparent)]
    Message(#[from] MessageError),

    /// The embedding provider kept failing.
    #[error("embedding provider failed after {attempts} attempts: {source}")]
    Provider {
        /// Number of attempts made.
        attempts: u32,
        /// Error from the last attempt.
        source: LlmError,
    },

    /// Provider returned vectors that do not line up with the inputs.
    #[error("embedding shape mismatch: {0}")]
    EmbeddingShape(String),

    /// Feature matrix and scored messages disagree in length.
    #[error("feature matrix has {rows} rows for {messages} messages")]
    Misaligned {
        /// Rows in the feature matrix.
        rows: usize,
        /// Scored messages supplied.
        messages: usize,
    },

    /// Invalid configuration value.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

impl ClusterError {
    pub fn invalid_parameter(message: impl Into<String>) -> Self {
        Self::InvalidParameter(message.into())
    }
}

/// Result type for clustering operations.
pub type Result<T> = std::result::Result<T, ClusterError>;
