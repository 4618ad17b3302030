//! Engagement-based pre-filtering.
//!
//! Embedding every message in a busy chat is expensive, so the batch is cut
//! down to messages whose engagement clears a threshold. When too few clear
//! it, the filter falls back to the top messages by engagement, taking the
//! larger of the percentage share and the hard cap.

use athena_core::{ChatMessage, EngagementScorer};
use tracing::debug;

use crate::config::ProcessorConfig;
use crate::error::Result;

/// Selects the messages worth embedding.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MessageFilter {
    engagement_threshold: f64,
    min_fraction: f64,
    max_messages: usize,
}

impl MessageFilter {
    pub fn new(engagement_threshold: f64, min_fraction: f64, max_messages: usize) -> Self {
        Self {
            engagement_threshold,
            min_fraction,
            max_messages,
        }
    }

    pub fn from_config(config: &ProcessorConfig) -> Self {
        Self::new(
            config.engagement_threshold,
            config.min_fraction,
            config.max_messages,
        )
    }

    /// Reduce `messages` to the important subset.
    ///
    /// # Errors
    /// Fails on the first message that does not pass validation.
    pub fn filter(&self, messages: &[ChatMessage]) -> Result<Vec<ChatMessage>> {
        if messages.is_empty() {
            return Ok(Vec::new());
        }

        let scores = messages
            .iter()
            .map(EngagementScorer::score)
            .collect::<std::result::Result<Vec<f64>, _>>()?;

        let total = messages.len();
        let kept: Vec<ChatMessage> = messages
            .iter()
            .zip(&scores)
            .filter(|(_, &score)| score > self.engagement_threshold)
            .map(|(m, _)| m.clone())
            .collect();

        if (kept.len() as f64) >= total as f64 * self.min_fraction {
            debug!(total, kept = kept.len(), "Engagement filter kept messages");
            return Ok(kept);
        }

        let take = self.fallback_size(total);
        let mut order: Vec<usize> = (0..total).collect();
        order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));

        debug!(
            total,
            above_threshold = kept.len(),
            take,
            "Too few messages above threshold, taking top by engagement"
        );

        Ok(order
            .into_iter()
            .take(take)
            .map(|i| messages[i].clone())
            .collect())
    }

    /// `max(floor(total * min_fraction), max_messages)`, at most `total`.
    pub fn fallback_size(&self, total: usize) -> usize {
        let by_fraction = (total as f64 * self.min_fraction) as usize;
        by_fraction.max(self.max_messages).min(total)
    }
}

impl Default for MessageFilter {
    fn default() -> Self {
        Self::from_config(&ProcessorConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn batch(n: usize) -> Vec<ChatMessage> {
        let start = Utc.with_ymd_and_hms(2025, 1, 15, 12, 0, 0).unwrap();
        (0..n)
            .map(|i| {
                ChatMessage::new(
                    i as i64,
                    format!("message number {i}"),
                    start + Duration::minutes(i as i64),
                )
            })
            .collect()
    }

    #[test]
    fn test_empty_input() {
        assert!(MessageFilter::default().filter(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_keeps_messages_above_threshold() {
        let mut messages = batch(10);
        messages[2] = messages[2].clone().with_reactions(10);
        messages[7] = messages[7].clone().with_reactions(10);

        let filtered = MessageFilter::default().filter(&messages).unwrap();
        let ids: Vec<i64> = filtered.iter().map(|m| m.message_id).collect();
        assert_eq!(ids, vec![2, 7]);
    }

    #[test]
    fn test_fallback_is_generous() {
        // Nothing clears the bar: fallback takes max(10%, cap) = everything.
        let messages = batch(50);
        let filtered = MessageFilter::default().filter(&messages).unwrap();
        assert_eq!(filtered.len(), 50);
    }

    #[test]
    fn test_fallback_orders_by_engagement() {
        let mut messages = batch(20);
        messages[5] = messages[5].clone().with_reactions(1);
        let filter = MessageFilter::new(0.99, 0.1, 3);
        let filtered = filter.filter(&messages).unwrap();
        assert_eq!(filtered.len(), 3);
        assert_eq!(filtered[0].message_id, 5);
    }

    #[test]
    fn test_fallback_uses_fraction_when_larger_than_cap() {
        let filter = MessageFilter::new(0.75, 0.1, 5);
        assert_eq!(filter.fallback_size(200), 20);
        assert_eq!(filter.fallback_size(20), 5);
        assert_eq!(filter.fallback_size(3), 3);
    }

    #[test]
    fn test_minimum_recall_property() {
        for n in [1, 7, 30, 120] {
            let messages = batch(n);
            let filtered = MessageFilter::default().filter(&messages).unwrap();
            let floor = n.min(((n as f64 * 0.1) as usize).max(1000));
            assert!(filtered.len() >= floor, "n={n}: got {}", filtered.len());
        }
    }

    #[test]
    fn test_invalid_message_fails_fast() {
        let mut messages = batch(3);
        messages[1].message = String::new();
        assert!(MessageFilter::default().filter(&messages).is_err());
    }
}
