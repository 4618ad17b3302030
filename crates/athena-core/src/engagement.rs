//! Heuristic engagement scoring.
//!
//! Scores a message from structural signals only (length, reactions,
//! sender attributes, links and media). The raw weighted sum is mapped
//! through fixed bounds so scores from independent batches are comparable.

use crate::error::Result;
use crate::message::ChatMessage;

/// Messages shorter than this (body plus preview) get a flat length score.
pub const SHORT_MESSAGE_LENGTH: usize = 20;

/// Length score assigned to short messages.
pub const SHORT_MESSAGE_SCORE: f64 = 0.1;

/// Lower bound of the affine normalization.
pub const MIN_SCORE: f64 = -5.0;

/// Upper bound of the affine normalization.
pub const MAX_SCORE: f64 = 3.0;

/// Per-feature weights of the engagement sum.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngagementWeights {
    pub length: f64,
    pub is_self: f64,
    pub is_bot: f64,
    pub reactions: f64,
    pub is_premium: f64,
    pub is_contact: f64,
    pub has_mention: f64,
    pub has_link: f64,
    pub media: f64,
}

/// Weights tuned for conversational relevance: own and bot messages are
/// pushed down hard, reactions are the strongest positive signal.
pub const WEIGHTS: EngagementWeights = EngagementWeights {
    length: 0.3,
    is_self: -5.0,
    is_bot: -3.0,
    reactions: 1.0,
    is_premium: 0.2,
    is_contact: 0.1,
    has_mention: 0.1,
    has_link: 0.4,
    media: 0.5,
};

/// Computes the normalized engagement score of a message.
pub struct EngagementScorer;

impl EngagementScorer {
    /// Score a message into `[0.0, 1.0]`.
    ///
    /// # Errors
    /// Returns a validation error if the message body is blank or its
    /// media ordinal is out of range.
    pub fn score(message: &ChatMessage) -> Result<f64> {
        message.validate()?;
        Ok(Self::normalize(Self::raw_score(message)))
    }

    /// Weighted sum before normalization.
    pub fn raw_score(message: &ChatMessage) -> f64 {
        let w = WEIGHTS;
        w.length * length_score(message.combined_length())
            + w.is_self * flag(message.is_self)
            + w.is_bot * flag(message.is_bot)
            + w.reactions * reaction_score(message.reaction_count)
            + w.is_premium * flag(message.is_premium)
            + w.is_contact * flag(message.is_contact)
            + w.has_mention * flag(message.has_mention)
            + w.has_link * flag(message.has_link)
            + w.media * f64::from(message.media_score)
    }

    /// Map a raw score through the fixed bounds and clip to `[0, 1]`.
    pub fn normalize(raw: f64) -> f64 {
        ((raw - MIN_SCORE) / (MAX_SCORE - MIN_SCORE)).clamp(0.0, 1.0)
    }
}

/// Log-scaled length, flat for very short messages.
pub fn length_score(combined_length: usize) -> f64 {
    if combined_length < SHORT_MESSAGE_LENGTH {
        SHORT_MESSAGE_SCORE
    } else {
        ((combined_length as f64).ln_1p() / 5.0).min(1.0)
    }
}

/// Shifted logistic curve: one reaction already lands at 0.5.
pub fn reaction_score(reaction_count: u32) -> f64 {
    1.0 / (1.0 + (-(f64::from(reaction_count) - 1.0) / 2.0).exp())
}

fn flag(value: bool) -> f64 {
    if value {
        1.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::MediaKind;
    use chrono::{TimeZone, Utc};

    fn msg(text: &str) -> ChatMessage {
        ChatMessage::new(1, text, Utc.with_ymd_and_hms(2025, 1, 15, 12, 0, 0).unwrap())
    }

    #[test]
    fn test_plain_short_message_score() {
        // 0.3 * 0.1 + sigmoid(-0.5) = 0.40754, normalized (x + 5) / 8
        let score = EngagementScorer::score(&msg("hello")).unwrap();
        assert!((score - 0.675_943).abs() < 1e-5, "got {score}");
    }

    #[test]
    fn test_length_score_short_is_flat() {
        assert_eq!(length_score(0), SHORT_MESSAGE_SCORE);
        assert_eq!(length_score(19), SHORT_MESSAGE_SCORE);
    }

    #[test]
    fn test_length_score_log_scaled_and_capped() {
        let expected = (21.0_f64).ln() / 5.0;
        assert!((length_score(20) - expected).abs() < 1e-12);
        assert_eq!(length_score(1_000_000), 1.0);
    }

    #[test]
    fn test_reaction_score_curve() {
        assert!((reaction_score(1) - 0.5).abs() < 1e-12);
        assert!(reaction_score(0) < 0.5);
        assert!(reaction_score(10) > 0.98);
    }

    #[test]
    fn test_self_message_scores_lower() {
        let base = msg("a reasonably long message about the roadmap");
        let own = base.clone().sent_by_self();
        let base_score = EngagementScorer::score(&base).unwrap();
        let own_score = EngagementScorer::score(&own).unwrap();
        assert!(own_score < base_score);
    }

    #[test]
    fn test_self_suppression_holds_at_upper_clip() {
        let mut loud = msg("a reasonably long message about the roadmap and more")
            .with_reactions(50)
            .with_media(MediaKind::Audio);
        loud.has_link = true;
        loud.is_premium = true;
        let own = loud.clone().sent_by_self();
        assert_eq!(EngagementScorer::score(&loud).unwrap(), 1.0);
        assert!(EngagementScorer::score(&own).unwrap() < 1.0);
    }

    #[test]
    fn test_bot_message_scores_lower() {
        let base = msg("deployment finished for the staging cluster");
        let bot = base.clone().sent_by_bot();
        assert!(EngagementScorer::score(&bot).unwrap() < EngagementScorer::score(&base).unwrap());
    }

    #[test]
    fn test_scores_always_in_unit_interval() {
        let mut cases = Vec::new();
        for reactions in [0, 1, 3, 100] {
            for media in [MediaKind::None, MediaKind::Photo, MediaKind::Audio] {
                for (is_self, is_bot) in [(false, false), (true, false), (false, true), (true, true)] {
                    let mut m = msg("some message text that is long enough to count")
                        .with_reactions(reactions)
                        .with_media(media);
                    m.is_self = is_self;
                    m.is_bot = is_bot;
                    m.has_link = reactions % 2 == 1;
                    cases.push(m);
                }
            }
        }
        for m in cases {
            let s = EngagementScorer::score(&m).unwrap();
            assert!((0.0..=1.0).contains(&s), "score {s} out of bounds");
        }
    }

    #[test]
    fn test_blank_message_fails_fast() {
        assert!(EngagementScorer::score(&msg("")).is_err());
    }

    #[test]
    fn test_normalize_bounds() {
        assert_eq!(EngagementScorer::normalize(MIN_SCORE), 0.0);
        assert_eq!(EngagementScorer::normalize(MAX_SCORE), 1.0);
        assert_eq!(EngagementScorer::normalize(-100.0), 0.0);
        assert_eq!(EngagementScorer::normalize(100.0), 1.0);
    }
}
