//! Error types for summarization.

use athena_cluster::ClusterError;
use athena_llm::LlmError;
use thiserror::Error;

/// Errors that can occur while summarizing a chat.
#[derive(Error, Debug)]
pub enum SummarizerError {
    /// Filtering, embedding or clustering failed.
    #[error("clustering failed: {0}")]
    Pipeline(#[from] ClusterError),

    /// The generation call failed.
    #[error("generation failed: {0}")]
    Provider(#[from] LlmError),

    /// The model answered with JSON that does not fit the expected shape.
    #[error("failed to parse model response: {0}")]
    ResponseParse(String),

    /// A prompt payload could not be serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for summarization.
pub type Result<T> = std::result::Result<T, SummarizerError>;
