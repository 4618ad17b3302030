//! Deterministic hash-based embeddings.
//!
//! Used when no API key is configured, and in tests. Vectors carry no
//! semantics: identical texts map to identical unit vectors, different
//! texts to unrelated ones.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use async_trait::async_trait;

use crate::error::{LlmError, Result};
use crate::provider::{GenerateRequest, LlmProvider};

/// Embedding-only backend producing hash-derived vectors.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dimension: usize,
}

impl HashEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }
}

#[async_trait]
impl LlmProvider for HashEmbedder {
    fn name(&self) -> &str {
        "hash"
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .map(|t| hash_based_embedding(t, self.dimension))
            .collect())
    }

    async fn generate(&self, _request: &GenerateRequest) -> Result<serde_json::Value> {
        Err(LlmError::Unsupported(
            "hash embedder cannot generate text; set OPENAI_API_KEY or OPENROUTER_API_KEY"
                .to_string(),
        ))
    }
}

/// Hash the text with each component index, map into `[-1, 1]` and
/// normalize to a unit vector.
pub fn hash_based_embedding(text: &str, dimension: usize) -> Vec<f32> {
    let mut embedding: Vec<f32> = (0..dimension)
        .map(|i| {
            let mut hasher = DefaultHasher::new();
            text.hash(&mut hasher);
            i.hash(&mut hasher);
            ((hasher.finish() as f64 / u64::MAX as f64) * 2.0 - 1.0) as f32
        })
        .collect();

    let magnitude: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
    if magnitude > 0.0 {
        for x in &mut embedding {
            *x /= magnitude;
        }
    }

    embedding
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deterministic() {
        assert_eq!(hash_based_embedding("gm", 16), hash_based_embedding("gm", 16));
    }

    #[test]
    fn test_different_texts_differ() {
        assert_ne!(hash_based_embedding("hello", 16), hash_based_embedding("world", 16));
    }

    #[test]
    fn test_unit_length() {
        let e = hash_based_embedding("test", 100);
        let magnitude: f32 = e.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((magnitude - 1.0).abs() < 1e-4);
    }

    #[tokio::test]
    async fn test_embed_batch_shape() {
        let embedder = HashEmbedder::new(32);
        let texts = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let vectors = embedder.embed(&texts).await.unwrap();
        assert_eq!(vectors.len(), 3);
        assert!(vectors.iter().all(|v| v.len() == 32));
    }

    #[tokio::test]
    async fn test_generate_unsupported() {
        let embedder = HashEmbedder::new(8);
        let err = embedder
            .generate(&GenerateRequest::new("hi"))
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::Unsupported(_)));
    }
}
