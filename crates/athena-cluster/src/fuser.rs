//! Semantic + temporal feature vectors.
//!
//! Message texts are embedded in fixed-size batches, strictly in order, and
//! each row gets the message's z-scored timestamp appended as its last
//! column. Timestamps are normalized once over the whole set, so a failed
//! batch fails the whole call: a partial matrix would not line up with the
//! time column.

use std::sync::Arc;
use std::time::Duration;

use athena_core::ChatMessage;
use athena_llm::{LlmError, LlmProvider};
use tracing::{debug, error, warn};

use crate::config::ProcessorConfig;
use crate::error::{ClusterError, Result};
use crate::matrix::{zscore, FeatureMatrix};

/// Builds one feature row per message from an embedding provider.
#[derive(Clone)]
pub struct EmbeddingFuser {
    provider: Arc<dyn LlmProvider>,
    batch_size: usize,
    max_attempts: u32,
    retry_backoff: Duration,
    timeout: Option<Duration>,
}

impl EmbeddingFuser {
    /// A fuser with default batching and retry settings.
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self::from_config(provider, &ProcessorConfig::default())
    }

    pub fn from_config(provider: Arc<dyn LlmProvider>, config: &ProcessorConfig) -> Self {
        Self {
            provider,
            batch_size: config.embedding_batch_size,
            max_attempts: config.embedding_attempts,
            retry_backoff: config.retry_backoff,
            timeout: config.embedding_timeout,
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Embed `messages` and append the normalized time feature.
    ///
    /// # Errors
    /// - [`ClusterError::InvalidParameter`] if the batch size is zero.
    /// - [`ClusterError::Provider`] once a batch has failed every attempt.
    /// - [`ClusterError::EmbeddingShape`] if the provider returns the wrong
    ///   number of vectors or inconsistent dimensions.
    pub async fn fuse(&self, messages: &[ChatMessage]) -> Result<FeatureMatrix> {
        if self.batch_size == 0 {
            return Err(ClusterError::invalid_parameter(
                "embedding batch size must be >= 1",
            ));
        }
        if messages.is_empty() {
            return Ok(FeatureMatrix::empty());
        }

        let texts: Vec<String> = messages.iter().map(ChatMessage::embedding_text).collect();
        let mut embeddings: Vec<Vec<f32>> = Vec::with_capacity(texts.len());
        let mut dimension: Option<usize> = None;

        for (batch_index, batch) in texts.chunks(self.batch_size).enumerate() {
            let vectors = self.embed_with_retry(batch_index, batch).await?;
            if vectors.len() != batch.len() {
                return Err(ClusterError::EmbeddingShape(format!(
                    "batch {} returned {} vectors for {} texts",
                    batch_index,
                    vectors.len(),
                    batch.len()
                )));
            }
            for vector in vectors {
                let expected = *dimension.get_or_insert(vector.len());
                if vector.len() != expected {
                    return Err(ClusterError::EmbeddingShape(format!(
                        "batch {} returned a {}-dimensional vector, expected {}",
                        batch_index,
                        vector.len(),
                        expected
                    )));
                }
                embeddings.push(vector);
            }
            debug!(
                batch = batch_index,
                size = batch.len(),
                "Embedded message batch"
            );
        }

        let seconds: Vec<f64> = messages
            .iter()
            .map(|m| m.timestamp.timestamp() as f64)
            .collect();
        let time_feature = zscore(&seconds);

        let rows = embeddings
            .into_iter()
            .zip(time_feature)
            .map(|(vector, time)| {
                let mut row: Vec<f64> = vector.into_iter().map(f64::from).collect();
                row.push(time);
                row
            })
            .collect();
        FeatureMatrix::from_rows(rows)
    }

    async fn embed_with_retry(&self, batch_index: usize, batch: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match self.embed_once(batch).await {
                Ok(vectors) => return Ok(vectors),
                Err(e) if attempt < self.max_attempts => {
                    let delay = self.backoff(attempt);
                    warn!(
                        provider = self.provider.name(),
                        batch = batch_index,
                        attempt,
                        max_attempts = self.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Embedding request failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    error!(
                        provider = self.provider.name(),
                        batch = batch_index,
                        attempts = attempt,
                        error = %e,
                        "Embedding request failed, giving up"
                    );
                    return Err(ClusterError::Provider {
                        attempts: attempt,
                        source: e,
                    });
                }
            }
        }
    }

    async fn embed_once(&self, batch: &[String]) -> std::result::Result<Vec<Vec<f32>>, LlmError> {
        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, self.provider.embed(batch))
                .await
                .map_err(|_| LlmError::Timeout(limit.as_millis() as u64))?,
            None => self.provider.embed(batch).await,
        }
    }

    /// Doubling delay, capped at 32x the base.
    fn backoff(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(5);
        self.retry_backoff * (1u32 << shift)
    }
}

impl std::fmt::Debug for EmbeddingFuser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingFuser")
            .field("provider", &self.provider.name())
            .field("batch_size", &self.batch_size)
            .field("max_attempts", &self.max_attempts)
            .field("retry_backoff", &self.retry_backoff)
            .field("timeout", &self.timeout)
            .finish()
    }
}
