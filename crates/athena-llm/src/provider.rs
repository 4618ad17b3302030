//! The capability interface Athena needs from a language model.
//!
//! Only two operations are used: batch text embedding for clustering, and
//! structured generation for summaries. Any backend (hosted API, local
//! model, test stub) implements [`LlmProvider`] and is injected where needed.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A structured generation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateRequest {
    /// System prompt, if any.
    pub system: Option<String>,

    /// User prompt.
    pub prompt: String,

    /// JSON schema the response must follow.
    pub schema: Option<serde_json::Value>,

    pub temperature: Option<f32>,

    pub top_p: Option<f32>,

    pub max_tokens: Option<u32>,
}

impl GenerateRequest {
    /// Create a request with only a user prompt.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            system: None,
            prompt: prompt.into(),
            schema: None,
            temperature: None,
            top_p: None,
            max_tokens: None,
        }
    }

    /// Set the system prompt.
    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Require the response to follow a JSON schema.
    pub fn with_schema(mut self, schema: serde_json::Value) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Set sampling temperature and nucleus cutoff.
    pub fn with_sampling(mut self, temperature: f32, top_p: f32) -> Self {
        self.temperature = Some(temperature);
        self.top_p = Some(top_p);
        self
    }

    /// Cap the number of generated tokens.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// Embedding and generation capabilities of a model backend.
///
/// Implementations must be safe to share across tasks.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Short provider name for logs and errors.
    fn name(&self) -> &str;

    /// Embed a batch of texts.
    ///
    /// Returns one vector per input, in input order.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Generate a JSON response for the request.
    async fn generate(&self, request: &GenerateRequest) -> Result<serde_json::Value>;
}
