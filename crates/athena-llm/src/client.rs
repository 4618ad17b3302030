//! HTTP client for OpenAI-compatible embedding and chat completion APIs.
//!
//! Supports OpenAI directly and OpenRouter as a fallback. Structured
//! generation uses the `response_format` JSON schema extension and parses
//! the returned message content as JSON.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, trace, warn};

use crate::error::{LlmError, Result};
use crate::provider::{GenerateRequest, LlmProvider};

/// Environment variable for OpenAI API key.
pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Environment variable for OpenRouter API key (fallback).
pub const OPENROUTER_API_KEY_ENV: &str = "OPENROUTER_API_KEY";

/// Overrides the embedding model name.
pub const EMBEDDING_MODEL_ENV: &str = "ATHENA_EMBEDDING_MODEL";

/// Overrides the chat model name.
pub const CHAT_MODEL_ENV: &str = "ATHENA_CHAT_MODEL";

/// Default embedding model.
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

/// Default chat model.
pub const DEFAULT_CHAT_MODEL: &str = "gpt-4o-mini";

/// Embedding dimension of `text-embedding-3-small`.
pub const DEFAULT_EMBEDDING_DIM: usize = 1536;

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// Which backend to talk to.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderConfig {
    /// OpenAI API.
    OpenAI {
        api_key: String,
        embedding_model: String,
        chat_model: String,
    },
    /// OpenRouter API (OpenAI-compatible).
    OpenRouter {
        api_key: String,
        embedding_model: String,
        chat_model: String,
    },
    /// Hash-based embeddings, no generation.
    HashBased { dimension: usize },
}

impl ProviderConfig {
    /// Create provider config from environment variables.
    ///
    /// Priority:
    /// 1. OPENAI_API_KEY -> OpenAI
    /// 2. OPENROUTER_API_KEY -> OpenRouter
    /// 3. None -> HashBased fallback
    pub fn from_env() -> Self {
        let embedding_model = std::env::var(EMBEDDING_MODEL_ENV).ok();
        let chat_model = std::env::var(CHAT_MODEL_ENV).ok();

        if let Ok(api_key) = std::env::var(OPENAI_API_KEY_ENV) {
            debug!("Using OpenAI provider");
            return Self::OpenAI {
                api_key,
                embedding_model: embedding_model
                    .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string()),
                chat_model: chat_model.unwrap_or_else(|| DEFAULT_CHAT_MODEL.to_string()),
            };
        }

        if let Ok(api_key) = std::env::var(OPENROUTER_API_KEY_ENV) {
            debug!("Using OpenRouter provider");
            return Self::OpenRouter {
                api_key,
                embedding_model: embedding_model
                    .unwrap_or_else(|| format!("openai/{}", DEFAULT_EMBEDDING_MODEL)),
                chat_model: chat_model.unwrap_or_else(|| format!("openai/{}", DEFAULT_CHAT_MODEL)),
            };
        }

        warn!("No provider API key found, using hash-based embeddings");
        Self::HashBased {
            dimension: DEFAULT_EMBEDDING_DIM,
        }
    }

    /// Whether this config talks to a real model.
    pub fn is_real(&self) -> bool {
        !matches!(self, Self::HashBased { .. })
    }
}

/// Client for an OpenAI-compatible HTTP API.
#[derive(Clone)]
pub struct LlmClient {
    client: reqwest::Client,
    provider: String,
    base_url: String,
    api_key: String,
    embedding_model: String,
    chat_model: String,
}

impl LlmClient {
    /// Create a client for an OpenAI-compatible endpoint.
    pub fn new(
        provider: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        embedding_model: impl Into<String>,
        chat_model: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            provider: provider.into(),
            base_url: base_url.into(),
            api_key: api_key.into(),
            embedding_model: embedding_model.into(),
            chat_model: chat_model.into(),
        }
    }

    /// Build a client from a provider config.
    ///
    /// # Errors
    /// Returns [`LlmError::Configuration`] for the hash-based config, which
    /// has no HTTP backend.
    pub fn from_config(config: &ProviderConfig) -> Result<Self> {
        match config {
            ProviderConfig::OpenAI {
                api_key,
                embedding_model,
                chat_model,
            } => Ok(Self::new(
                "OpenAI",
                OPENAI_BASE_URL,
                api_key,
                embedding_model,
                chat_model,
            )),
            ProviderConfig::OpenRouter {
                api_key,
                embedding_model,
                chat_model,
            } => Ok(Self::new(
                "OpenRouter",
                OPENROUTER_BASE_URL,
                api_key,
                embedding_model,
                chat_model,
            )),
            ProviderConfig::HashBased { .. } => Err(LlmError::Configuration(
                "hash-based config has no HTTP client".to_string(),
            )),
        }
    }

    async fn post(&self, path: &str, body: &serde_json::Value) -> Result<serde_json::Value> {
        let url = format!("{}/{}", self.base_url, path);
        trace!(url = %url, "Sending request");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| LlmError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                provider: self.provider.clone(),
                status: status.as_u16(),
                body: text,
            });
        }

        response
            .json()
            .await
            .map_err(|e| LlmError::ResponseParse(e.to_string()))
    }
}

#[async_trait]
impl LlmProvider for LlmClient {
    fn name(&self) -> &str {
        &self.provider
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let json = self
            .post(
                "embeddings",
                &serde_json::json!({
                    "model": self.embedding_model,
                    "input": texts,
                }),
            )
            .await?;

        let vectors = parse_embedding_response(json)?;
        if vectors.len() != texts.len() {
            return Err(LlmError::ResponseParse(format!(
                "{} returned {} embeddings for {} inputs",
                self.provider,
                vectors.len(),
                texts.len()
            )));
        }
        debug!(count = vectors.len(), "Embeddings received");
        Ok(vectors)
    }

    async fn generate(&self, request: &GenerateRequest) -> Result<serde_json::Value> {
        let mut messages = Vec::new();
        if let Some(system) = &request.system {
            messages.push(serde_json::json!({"role": "system", "content": system}));
        }
        messages.push(serde_json::json!({"role": "user", "content": request.prompt}));

        let mut body = serde_json::json!({
            "model": self.chat_model,
            "messages": messages,
        });
        if let Some(schema) = &request.schema {
            body["response_format"] = serde_json::json!({
                "type": "json_schema",
                "json_schema": {"name": "response", "schema": schema},
            });
        } else {
            body["response_format"] = serde_json::json!({"type": "json_object"});
        }
        if let Some(temperature) = request.temperature {
            body["temperature"] = serde_json::json!(temperature);
        }
        if let Some(top_p) = request.top_p {
            body["top_p"] = serde_json::json!(top_p);
        }
        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }

        let json = self.post("chat/completions", &body).await?;
        let content = json["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| LlmError::ResponseParse("No content in response".to_string()))?;

        Ok(serde_json::from_str(strip_code_fence(content))?)
    }
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingEntry>,
}

#[derive(Deserialize)]
struct EmbeddingEntry {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

fn parse_embedding_response(json: serde_json::Value) -> Result<Vec<Vec<f32>>> {
    let mut parsed: EmbeddingResponse = serde_json::from_value(json)
        .map_err(|e| LlmError::ResponseParse(format!("Invalid embedding response: {}", e)))?;
    parsed.data.sort_by_key(|entry| entry.index);
    Ok(parsed.data.into_iter().map(|entry| entry.embedding).collect())
}

/// Models sometimes wrap JSON in a markdown fence despite the format hint.
fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}
