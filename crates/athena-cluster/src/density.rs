//! Topic clusters from fused feature vectors.

use std::collections::HashMap;

use athena_core::{ChatMessage, ScoredMessage};
use tracing::debug;

use crate::config::ProcessorConfig;
use crate::error::{ClusterError, Result};
use crate::hdbscan::{Hdbscan, HdbscanParams, NOISE};
use crate::matrix::FeatureMatrix;

/// Groups messages with HDBSCAN and keeps the best few per group.
#[derive(Debug, Clone)]
pub struct DensityClusterer {
    hdbscan: Hdbscan,
    representatives: usize,
}

impl DensityClusterer {
    /// # Errors
    /// Returns `ClusterError::InvalidParameter` for unusable parameters.
    pub fn new(params: HdbscanParams, representatives: usize) -> Result<Self> {
        if representatives == 0 {
            return Err(ClusterError::invalid_parameter(
                "representatives per cluster must be >= 1",
            ));
        }
        Ok(Self {
            hdbscan: Hdbscan::new(params)?,
            representatives,
        })
    }

    pub fn from_config(config: &ProcessorConfig) -> Result<Self> {
        Self::new(config.hdbscan.clone(), config.representatives_per_cluster)
    }

    /// Raw HDBSCAN labels for `vectors` after standardization.
    pub fn labels(&self, vectors: &FeatureMatrix) -> Vec<i32> {
        if vectors.is_empty() {
            return Vec::new();
        }
        self.hdbscan.fit(&vectors.standardize())
    }

    /// Cluster `scored` by their rows in `vectors`.
    ///
    /// Noise is dropped. Each cluster holds its members with the highest
    /// lexical score, best first. Clusters come out in the order their
    /// first member appears in `scored`.
    ///
    /// # Errors
    /// Returns [`ClusterError::Misaligned`] if `vectors` does not have one
    /// row per scored message.
    pub fn cluster(
        &self,
        scored: &[ScoredMessage],
        vectors: &FeatureMatrix,
    ) -> Result<Vec<Vec<ChatMessage>>> {
        if vectors.is_empty() {
            return Ok(Vec::new());
        }
        if vectors.nrows() != scored.len() {
            return Err(ClusterError::Misaligned {
                rows: vectors.nrows(),
                messages: scored.len(),
            });
        }

        let labels = self.labels(vectors);

        let mut order: Vec<i32> = Vec::new();
        let mut members: HashMap<i32, Vec<&ScoredMessage>> = HashMap::new();
        for (message, &label) in scored.iter().zip(&labels) {
            if label == NOISE {
                continue;
            }
            members
                .entry(label)
                .or_insert_with(|| {
                    order.push(label);
                    Vec::new()
                })
                .push(message);
        }

        let clusters: Vec<Vec<ChatMessage>> = order
            .into_iter()
            .filter_map(|label| members.remove(&label))
            .map(|mut group| {
                group.sort_by(|a, b| b.lexical_score.total_cmp(&a.lexical_score));
                group
                    .into_iter()
                    .take(self.representatives)
                    .map(|s| s.message.clone())
                    .collect()
            })
            .collect();

        debug!(
            messages = scored.len(),
            clusters = clusters.len(),
            noise = labels.iter().filter(|&&l| l == NOISE).count(),
            "Clustered messages"
        );
        Ok(clusters)
    }
}
