//! Batch-relative TF-IDF weighting.
//!
//! Each call fits a fresh vocabulary on the batch it is given, so weights
//! only say how distinctive a message is relative to its neighbours in the
//! same batch. Tokens are lowercase runs of two or more word characters;
//! English stop words are dropped before unigrams and bigrams are formed.
//! Rows are L2-normalized and a message's weight is the sum of its row.

use std::collections::HashMap;
use std::sync::OnceLock;

use athena_core::{ChatMessage, EngagementScorer};
use regex::Regex;

use crate::error::Result;
use crate::stopwords::is_stop_word;

/// Share of the composite score taken by the lexical weight.
pub const COMPOSITE_LEXICAL_WEIGHT: f64 = 0.7;

/// Share of the composite score taken by engagement.
pub const COMPOSITE_ENGAGEMENT_WEIGHT: f64 = 0.3;

/// Multiplier on the interquartile range for outlier thresholds.
pub const IQR_MULTIPLIER: f64 = 1.5;

fn token_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?u)\b\w\w+\b").expect("token pattern is valid"))
}

/// TF-IDF settings. The vocabulary itself is never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TfidfSettings {
    /// Smallest n-gram length.
    pub ngram_min: usize,
    /// Largest n-gram length.
    pub ngram_max: usize,
    /// Drop English stop words.
    pub remove_stop_words: bool,
}

impl Default for TfidfSettings {
    fn default() -> Self {
        Self {
            ngram_min: 1,
            ngram_max: 2,
            remove_stop_words: true,
        }
    }
}

/// Computes per-message lexical importance within a batch.
#[derive(Debug, Clone, Default)]
pub struct LexicalWeighter {
    settings: TfidfSettings,
}

impl LexicalWeighter {
    pub fn new(settings: TfidfSettings) -> Self {
        Self { settings }
    }

    /// One weight per message, in input order. Empty in, empty out.
    pub fn weigh(&self, messages: &[ChatMessage]) -> Vec<f64> {
        let texts: Vec<&str> = messages.iter().map(|m| m.message.as_str()).collect();
        self.weigh_texts(&texts)
    }

    /// Row sums of the L2-normalized TF-IDF matrix of `texts`.
    ///
    /// A batch with an empty vocabulary (only stop words or single
    /// characters) weighs zero everywhere.
    pub fn weigh_texts(&self, texts: &[&str]) -> Vec<f64> {
        self.fit_transform(texts)
            .iter()
            .map(|row| row.values().fold(0.0, |acc, v| acc + v))
            .collect()
    }

    /// Fit a vocabulary on `texts` and return each document's normalized
    /// TF-IDF vector, keyed by term.
    pub fn fit_transform(&self, texts: &[&str]) -> Vec<HashMap<String, f64>> {
        if texts.is_empty() {
            return Vec::new();
        }

        let counts: Vec<HashMap<String, usize>> =
            texts.iter().map(|t| self.term_counts(t)).collect();

        let mut document_frequency: HashMap<&str, usize> = HashMap::new();
        for doc in &counts {
            for term in doc.keys() {
                *document_frequency.entry(term.as_str()).or_insert(0) += 1;
            }
        }

        let n_docs = texts.len() as f64;
        counts
            .iter()
            .map(|doc| {
                let mut row: HashMap<String, f64> = doc
                    .iter()
                    .map(|(term, &count)| {
                        let df = document_frequency[term.as_str()] as f64;
                        let idf = ((1.0 + n_docs) / (1.0 + df)).ln() + 1.0;
                        (term.clone(), count as f64 * idf)
                    })
                    .collect();

                let norm = row.values().map(|v| v * v).sum::<f64>().sqrt();
                if norm > 0.0 {
                    row.values_mut().for_each(|v| *v /= norm);
                }
                row
            })
            .collect()
    }

    fn term_counts(&self, text: &str) -> HashMap<String, usize> {
        let lowered = text.to_lowercase();
        let tokens: Vec<&str> = token_pattern()
            .find_iter(&lowered)
            .map(|m| m.as_str())
            .filter(|t| !self.settings.remove_stop_words || !is_stop_word(t))
            .collect();

        let mut counts = HashMap::new();
        for n in self.settings.ngram_min.max(1)..=self.settings.ngram_max {
            for gram in tokens.windows(n) {
                *counts.entry(gram.join(" ")).or_insert(0) += 1;
            }
        }
        counts
    }
}

/// Blend lexical weights with engagement scores:
/// `0.7 * lexical + 0.3 * engagement`.
///
/// # Errors
/// Propagates validation errors from engagement scoring.
pub fn composite_scores(messages: &[ChatMessage], lexical: &[f64]) -> Result<Vec<f64>> {
    messages
        .iter()
        .zip(lexical)
        .map(|(message, &weight)| {
            let engagement = EngagementScorer::score(message)?;
            Ok(COMPOSITE_LEXICAL_WEIGHT * weight + COMPOSITE_ENGAGEMENT_WEIGHT * engagement)
        })
        .collect()
}

/// Upper outlier fence `q75 + 1.5 * (q75 - q25)`, or `None` for no scores.
pub fn iqr_threshold(scores: &[f64]) -> Option<f64> {
    if scores.is_empty() {
        return None;
    }
    let mut sorted = scores.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let q75 = percentile(&sorted, 75.0);
    let q25 = percentile(&sorted, 25.0);
    Some(q75 + IQR_MULTIPLIER * (q75 - q25))
}

/// Linear-interpolated percentile of sorted values.
fn percentile(sorted: &[f64], q: f64) -> f64 {
    let rank = q / 100.0 * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    sorted[lower] + (sorted[upper] - sorted[lower]) * (rank - lower as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_empty_batch() {
        assert!(LexicalWeighter::default().weigh(&[]).is_empty());
    }

    #[test]
    fn test_single_term_document_weighs_one() {
        let weights = LexicalWeighter::default().weigh_texts(&["rust"]);
        assert_eq!(weights.len(), 1);
        assert!(approx(weights[0], 1.0));
    }

    #[test]
    fn test_bigrams_are_counted() {
        let rows = LexicalWeighter::default().fit_transform(&["validator rewards"]);
        assert!(rows[0].contains_key("validator"));
        assert!(rows[0].contains_key("rewards"));
        assert!(rows[0].contains_key("validator rewards"));
        // Three equally weighted terms in one document.
        let sum: f64 = rows[0].values().sum();
        assert!(approx(sum, 3.0_f64.sqrt()));
    }

    #[test]
    fn test_stop_words_and_short_tokens_dropped() {
        let rows = LexicalWeighter::default().fit_transform(&["the a I of and"]);
        assert!(rows[0].is_empty());
        let weights = LexicalWeighter::default().weigh_texts(&["the a I of and"]);
        assert_eq!(weights, vec![0.0]);
        assert!(weights[0].is_sign_positive());
    }

    #[test]
    fn test_common_content_words_are_kept() {
        let weights = LexicalWeighter::default()
            .weigh_texts(&["research information problem world million test", "rust coffee"]);
        assert!(weights[0] > 0.0);
        assert!(weights[1] > 0.0);
    }

    #[test]
    fn test_rare_terms_weigh_more() {
        let weighter = LexicalWeighter::default();
        let rows = weighter.fit_transform(&["token launch", "token staking", "token airdrop"]);
        let row = &rows[0];
        assert!(row["launch"] > row["token"]);
    }

    #[test]
    fn test_idf_formula() {
        // "alpha" appears in 1 of 2 docs, "beta" in both.
        let rows = LexicalWeighter::new(TfidfSettings {
            ngram_min: 1,
            ngram_max: 1,
            remove_stop_words: false,
        })
        .fit_transform(&["alpha beta", "beta"]);
        let idf_alpha = (3.0_f64 / 2.0).ln() + 1.0;
        let idf_beta = 1.0;
        let norm = (idf_alpha * idf_alpha + idf_beta * idf_beta).sqrt();
        assert!(approx(rows[0]["alpha"], idf_alpha / norm));
        assert!(approx(rows[0]["beta"], idf_beta / norm));
        assert!(approx(rows[1]["beta"], 1.0));
    }

    #[test]
    fn test_richer_message_outweighs_generic_one() {
        let weights = LexicalWeighter::default().weigh_texts(&[
            "gm",
            "ethereum validators rewards restaking yields compared",
            "ok",
        ]);
        assert!(weights[1] > weights[0]);
        assert!(weights[1] > weights[2]);
    }

    #[test]
    fn test_weigh_is_refit_per_call() {
        let weighter = LexicalWeighter::default();
        let first = weighter.weigh_texts(&["solana hackathon", "solana grants"]);
        let alone = weighter.weigh_texts(&["solana hackathon"]);
        let again = weighter.weigh_texts(&["solana hackathon", "solana grants"]);
        assert_eq!(first, again);
        assert!(!approx(first[0], alone[0]));
    }

    #[test]
    fn test_composite_scores() {
        let ts = Utc.with_ymd_and_hms(2025, 1, 15, 12, 0, 0).unwrap();
        let messages = vec![ChatMessage::new(1, "hello", ts)];
        let engagement = EngagementScorer::score(&messages[0]).unwrap();
        let scores = composite_scores(&messages, &[2.0]).unwrap();
        assert!(approx(scores[0], 0.7 * 2.0 + 0.3 * engagement));
    }

    #[test]
    fn test_iqr_threshold() {
        // q25 = 2, q75 = 4 for 1..=5
        let threshold = iqr_threshold(&[5.0, 1.0, 3.0, 2.0, 4.0]).unwrap();
        assert!(approx(threshold, 4.0 + 1.5 * 2.0));
        assert!(iqr_threshold(&[]).is_none());
    }
}
