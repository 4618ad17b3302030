//! Error types for provider calls.

use thiserror::Error;

/// Errors that can occur when calling an LLM provider.
#[derive(Error, Debug)]
pub enum LlmError {
    /// HTTP request could not be sent or completed.
    #[error("request failed: {0}")]
    Request(String),

    /// Provider answered with a non-success status.
    #[error("{provider} API error {status}: {body}")]
    Api {
        /// Provider name.
        provider: String,
        /// HTTP status code.
        status: u16,
        /// Response body, as returned.
        body: String,
    },

    /// Response did not have the expected shape.
    #[error("failed to parse response: {0}")]
    ResponseParse(String),

    /// Missing key or invalid model settings.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The backend does not offer this capability.
    #[error("unsupported operation: {0}")]
    Unsupported(String),

    /// Call did not finish within its deadline.
    #[error("request timed out after {0} ms")]
    Timeout(u64),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for provider operations.
pub type Result<T> = std::result::Result<T, LlmError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = LlmError::Api {
            provider: "OpenAI".into(),
            status: 429,
            body: "rate limited".into(),
        };
        assert_eq!(err.to_string(), "OpenAI API error 429: rate limited");

        let err = LlmError::Timeout(1500);
        assert_eq!(err.to_string(), "request timed out after 1500 ms");
    }

    #[test]
    fn test_error_from_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("{oops").unwrap_err();
        let err: LlmError = json_err.into();
        assert!(matches!(err, LlmError::Serialization(_)));
    }
}
