//! Language model capabilities for Athena.
//!
//! Everything above this crate sees a single [`LlmProvider`] trait with two
//! operations, `embed` and `generate`. Backends:
//!
//! 1. **OpenAI** (set `OPENAI_API_KEY`)
//! 2. **OpenRouter** (set `OPENROUTER_API_KEY`)
//! 3. **Hash-based** (no API key): deterministic embeddings, no generation
//!
//! ```no_run
//! # async fn example() -> athena_llm::Result<()> {
//! let provider = athena_llm::create_provider();
//! let vectors = provider.embed(&["gm".to_string()]).await?;
//! assert_eq!(vectors.len(), 1);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
pub mod hash;
pub mod provider;

use std::sync::Arc;

use tracing::warn;

pub use client::{LlmClient, ProviderConfig, DEFAULT_EMBEDDING_DIM};
pub use error::{LlmError, Result};
pub use hash::{hash_based_embedding, HashEmbedder};
pub use provider::{GenerateRequest, LlmProvider};

/// Build the provider described by a config.
pub fn provider_from_config(config: &ProviderConfig) -> Arc<dyn LlmProvider> {
    match config {
        ProviderConfig::HashBased { dimension } => Arc::new(HashEmbedder::new(*dimension)),
        real => match LlmClient::from_config(real) {
            Ok(client) => Arc::new(client),
            Err(e) => {
                warn!(error = %e, "Falling back to hash-based embeddings");
                Arc::new(HashEmbedder::new(DEFAULT_EMBEDDING_DIM))
            }
        },
    }
}

/// Create a provider from environment variables.
///
/// Checks OPENAI_API_KEY, then OPENROUTER_API_KEY, and falls back to
/// hash-based embeddings.
pub fn create_provider() -> Arc<dyn LlmProvider> {
    provider_from_config(&ProviderConfig::from_env())
}
