//! The embedding provider contract.

use async_trait::async_trait;

use crate::error::EmbeddingResult;

/// Invoked after each embedding batch completes: `(processed, total)`.
pub type ProgressCallback<'a> = &'a (dyn Fn(usize, usize) + Send + Sync);

/// A client that turns text into vectors.
///
/// Implementations fail fast on transport/HTTP errors; retrying the
/// enclosing job is the caller's responsibility, not this trait's.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single query string.
    async fn embed_query(&self, text: &str) -> EmbeddingResult<Vec<f32>>;

    /// Embed many texts, batched internally. Returns vectors in input
    /// order. `progress`, if given, is invoked after each batch.
    async fn embed_texts(
        &self,
        texts: &[String],
        progress: Option<ProgressCallback<'_>>,
    ) -> EmbeddingResult<Vec<Vec<f32>>>;

    /// Output vector dimensionality.
    fn dimensions(&self) -> usize;

    /// Provider identifier, e.g. `"openai"`, `"local"`, `"mock"`.
    fn provider_name(&self) -> &str;

    /// Model identifier, e.g. `"text-embedding-3-small"`.
    fn model_name(&self) -> &str;
}
