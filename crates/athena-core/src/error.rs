//! Error types for message validation.

use thiserror::Error;

/// Errors raised when a chat message does not have the shape the
/// scoring and clustering stages require.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MessageError {
    /// The message is malformed (e.g. empty body, out-of-range media score).
    #[error("invalid message {message_id}: {reason}")]
    Validation {
        /// Identifier of the offending message.
        message_id: i64,
        /// What is wrong with it.
        reason: String,
    },
}

impl MessageError {
    /// Build a validation error for the given message.
    pub fn validation(message_id: i64, reason: impl Into<String>) -> Self {
        Self::Validation {
            message_id,
            reason: reason.into(),
        }
    }
}

/// Result type for message operations.
pub type Result<T> = std::result::Result<T, MessageError>;
