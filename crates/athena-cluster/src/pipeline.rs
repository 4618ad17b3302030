//! The clustering pipeline: filter, weigh, embed, cluster.

use std::sync::Arc;

use athena_core::{ChatMessage, ScoredMessage};
use athena_llm::LlmProvider;
use tracing::info;

use crate::config::ProcessorConfig;
use crate::density::DensityClusterer;
use crate::error::Result;
use crate::filter::MessageFilter;
use crate::fuser::EmbeddingFuser;
use crate::lexical::{composite_scores, iqr_threshold, LexicalWeighter};
use crate::matrix::FeatureMatrix;

/// Turns a raw message batch into representative topic clusters.
///
/// Stages hold no state between calls, so one pipeline can serve
/// independent batches concurrently.
#[derive(Debug, Clone)]
pub struct ClusterPipeline {
    filter: MessageFilter,
    weighter: LexicalWeighter,
    fuser: EmbeddingFuser,
    clusterer: DensityClusterer,
}

impl ClusterPipeline {
    /// # Errors
    /// Returns `ClusterError::InvalidParameter` if `config` does not validate.
    pub fn new(provider: Arc<dyn LlmProvider>, config: ProcessorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            filter: MessageFilter::from_config(&config),
            weighter: LexicalWeighter::default(),
            fuser: EmbeddingFuser::from_config(provider, &config),
            clusterer: DensityClusterer::from_config(&config)?,
        })
    }

    /// Filter, weigh and embed `messages`.
    ///
    /// Returns the surviving messages with their lexical weights and one
    /// feature row per survivor, in the same order.
    pub async fn analyze(
        &self,
        messages: &[ChatMessage],
    ) -> Result<(Vec<ScoredMessage>, FeatureMatrix)> {
        let filtered = self.filter.filter(messages)?;
        if filtered.is_empty() {
            return Ok((Vec::new(), FeatureMatrix::empty()));
        }

        let weights = self.weighter.weigh(&filtered);
        let vectors = self.fuser.fuse(&filtered).await?;
        let scored = filtered
            .into_iter()
            .zip(weights)
            .map(|(message, weight)| ScoredMessage::new(message, weight))
            .collect();
        Ok((scored, vectors))
    }

    /// Group analyzed messages into clusters of representatives.
    pub fn cluster(
        &self,
        scored: &[ScoredMessage],
        vectors: &FeatureMatrix,
    ) -> Result<Vec<Vec<ChatMessage>>> {
        self.clusterer.cluster(scored, vectors)
    }

    /// [`analyze`](Self::analyze) followed by [`cluster`](Self::cluster).
    pub async fn run(&self, messages: &[ChatMessage]) -> Result<Vec<Vec<ChatMessage>>> {
        let (scored, vectors) = self.analyze(messages).await?;
        let clusters = self.cluster(&scored, &vectors)?;
        info!(
            input = messages.len(),
            filtered = scored.len(),
            clusters = clusters.len(),
            "Clustering complete"
        );
        Ok(clusters)
    }

    /// Messages whose composite score (lexical and engagement blended) sits
    /// above the batch's upper IQR fence, in input order.
    ///
    /// Works on the whole batch without filtering or embedding.
    pub fn highlights(&self, messages: &[ChatMessage]) -> Result<Vec<ChatMessage>> {
        let lexical = self.weighter.weigh(messages);
        let scores = composite_scores(messages, &lexical)?;
        let Some(threshold) = iqr_threshold(&scores) else {
            return Ok(Vec::new());
        };
        Ok(messages
            .iter()
            .zip(&scores)
            .filter(|(_, &score)| score > threshold)
            .map(|(m, _)| m.clone())
            .collect())
    }
}
