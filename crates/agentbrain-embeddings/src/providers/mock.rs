//! Deterministic embedding provider for tests.

use async_trait::async_trait;

use crate::error::EmbeddingResult;
use crate::traits::{EmbeddingProvider, ProgressCallback};

/// Produces a reproducible vector for any input by hashing its bytes into
/// `dimensions` buckets. Identical text always yields identical vectors;
/// different text (almost always) yields a different vector, which is
/// enough for exercising ranking logic in tests without a real model.
pub struct MockEmbeddingProvider {
    dimensions: usize,
}

impl MockEmbeddingProvider {
    #[must_use]
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }

    fn hash_embed(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0_f32; self.dimensions];
        for (i, byte) in text.bytes().enumerate() {
            let bucket = i % self.dimensions;
            vector[bucket] += f32::from(byte) / 255.0;
        }
        let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for value in &mut vector {
                *value /= norm;
            }
        }
        vector
    }
}

impl Default for MockEmbeddingProvider {
    fn default() -> Self {
        Self::new(768)
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    async fn embed_query(&self, text: &str) -> EmbeddingResult<Vec<f32>> {
        Ok(self.hash_embed(text))
    }

    async fn embed_texts(
        &self,
        texts: &[String],
        progress: Option<ProgressCallback<'_>>,
    ) -> EmbeddingResult<Vec<Vec<f32>>> {
        let vectors: Vec<Vec<f32>> = texts.iter().map(|t| self.hash_embed(t)).collect();
        if let Some(callback) = progress {
            callback(vectors.len(), texts.len());
        }
        Ok(vectors)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn provider_name(&self) -> &str {
        "mock"
    }

    fn model_name(&self) -> &str {
        "mock-deterministic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn same_text_yields_same_vector() {
        let provider = MockEmbeddingProvider::new(16);
        let a = provider.embed_query("hello world").await.unwrap();
        let b = provider.embed_query("hello world").await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn different_text_yields_different_vector() {
        let provider = MockEmbeddingProvider::new(16);
        let a = provider.embed_query("hello").await.unwrap();
        let b = provider.embed_query("goodbye").await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn embed_texts_preserves_order_and_reports_progress() {
        let provider = MockEmbeddingProvider::new(8);
        let texts = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let seen = std::sync::Mutex::new(Vec::new());
        let callback = |processed: usize, total: usize| seen.lock().unwrap().push((processed, total));
        let vectors = provider.embed_texts(&texts, Some(&callback)).await.unwrap();
        assert_eq!(vectors.len(), 3);
        assert_eq!(vectors[0], provider.embed_query("a").await.unwrap());
        assert_eq!(*seen.lock().unwrap(), vec![(3, 3)]);
    }
}
