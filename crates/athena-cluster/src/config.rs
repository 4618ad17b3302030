//! Pipeline configuration.

use std::time::Duration;

use crate::error::{ClusterError, Result};
use crate::hdbscan::HdbscanParams;

/// Tunables for one clustering pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessorConfig {
    /// Engagement a message must exceed to survive the initial filter.
    pub engagement_threshold: f64,
    /// Share of the batch the filter must keep before falling back.
    pub min_fraction: f64,
    /// Hard floor on the fallback sample size.
    pub max_messages: usize,
    /// Texts per embedding request.
    pub embedding_batch_size: usize,
    /// Attempts per embedding request before giving up.
    pub embedding_attempts: u32,
    /// Base delay between attempts, doubled on each retry.
    pub retry_backoff: Duration,
    /// Deadline for a single embedding request.
    pub embedding_timeout: Option<Duration>,
    /// Representatives kept per cluster.
    pub representatives_per_cluster: usize,
    pub hdbscan: HdbscanParams,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            engagement_threshold: 0.75,
            min_fraction: 0.1,
            max_messages: 1000,
            embedding_batch_size: 256,
            embedding_attempts: 3,
            retry_backoff: Duration::from_millis(500),
            embedding_timeout: Some(Duration::from_secs(60)),
            representatives_per_cluster: 2,
            hdbscan: HdbscanParams::default(),
        }
    }
}

impl ProcessorConfig {
    /// Creates a new config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_engagement_threshold(mut self, threshold: f64) -> Self {
        self.engagement_threshold = threshold;
        self
    }

    pub fn with_min_fraction(mut self, fraction: f64) -> Self {
        self.min_fraction = fraction;
        self
    }

    pub fn with_max_messages(mut self, max: usize) -> Self {
        self.max_messages = max;
        self
    }

    pub fn with_embedding_batch_size(mut self, size: usize) -> Self {
        self.embedding_batch_size = size;
        self
    }

    pub fn with_embedding_attempts(mut self, attempts: u32) -> Self {
        self.embedding_attempts = attempts;
        self
    }

    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    pub fn with_embedding_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.embedding_timeout = timeout;
        self
    }

    pub fn with_hdbscan(mut self, params: HdbscanParams) -> Self {
        self.hdbscan = params;
        self
    }

    /// Check every value is usable.
    ///
    /// # Errors
    /// Returns [`ClusterError::InvalidParameter`] naming the first bad value.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.engagement_threshold) {
            return Err(ClusterError::invalid_parameter(format!(
                "engagement_threshold must be in [0, 1], got {}",
                self.engagement_threshold
            )));
        }
        if !(0.0..=1.0).contains(&self.min_fraction) {
            return Err(ClusterError::invalid_parameter(format!(
                "min_fraction must be in [0, 1], got {}",
                self.min_fraction
            )));
        }
        if self.embedding_batch_size == 0 {
            return Err(ClusterError::invalid_parameter(
                "embedding_batch_size must be >= 1",
            ));
        }
        if self.embedding_attempts == 0 {
            return Err(ClusterError::invalid_parameter(
                "embedding_attempts must be >= 1",
            ));
        }
        if self.representatives_per_cluster == 0 {
            return Err(ClusterError::invalid_parameter(
                "representatives_per_cluster must be >= 1",
            ));
        }
        self.hdbscan.validate()
    }
}
