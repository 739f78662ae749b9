//! Provider clients: embedding, summarization, and reranking.
//!
//! Three narrow async traits, each with an HTTP implementation speaking
//! an OpenAI-compatible API and a deterministic mock used in tests.
//! Batching, retries of the enclosing job, and progress reporting all
//! live on the caller's side of the embedding trait.

pub mod error;
pub mod providers;
pub mod traits;

pub use error::{EmbeddingError, EmbeddingResult};
pub use providers::{
    HttpEmbeddingProvider, HttpSummarizationProvider, MockEmbeddingProvider,
    MockSummarizationProvider, PassThroughReranker, RerankerProvider, SummarizationProvider,
};
pub use traits::{EmbeddingProvider, ProgressCallback};

use std::sync::Arc;

use agentbrain_config::ProviderConfig;

/// Build the configured embedding provider from `config.embedding`.
///
/// # Errors
/// Returns [`EmbeddingError::Config`] if an API key is required (provider
/// is not `"mock"`) but cannot be resolved from `api_key`/`api_key_env`.
pub fn build_provider(config: &ProviderConfig) -> EmbeddingResult<Arc<dyn EmbeddingProvider>> {
    if config.provider == "mock" {
        let dimensions = config.dimensions.unwrap_or(768);
        return Ok(Arc::new(MockEmbeddingProvider::new(dimensions)));
    }

    let base_url = config
        .base_url
        .clone()
        .unwrap_or_else(|| "https://api.openai.com/v1".to_string());
    let api_key = config.resolve_api_key();
    let dimensions = config.dimensions.unwrap_or(768);

    Ok(Arc::new(HttpEmbeddingProvider::new(
        base_url,
        api_key,
        config.model.clone(),
        dimensions,
    )))
}

/// Build the configured summarization provider from `config.summarization`.
/// A `provider` of `"disabled"` or `"mock"` yields the deterministic mock.
#[must_use]
pub fn build_summarization_provider(config: &ProviderConfig) -> Arc<dyn SummarizationProvider> {
    if config.provider == "disabled" || config.provider == "mock" {
        return Arc::new(MockSummarizationProvider);
    }

    let base_url = config
        .base_url
        .clone()
        .unwrap_or_else(|| "https://api.openai.com/v1".to_string());
    let api_key = config.resolve_api_key();
    Arc::new(HttpSummarizationProvider::new(base_url, api_key, config.model.clone()))
}
