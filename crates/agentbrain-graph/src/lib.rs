//! Knowledge-graph triple store and extractors.
//!
//! Two extractors turn chunks into [`models::GraphTriple`]s: a
//! deterministic one grounded in AST metadata, and an optional LLM-based
//! one that degrades to nothing when unavailable. [`store::GraphStore`]
//! persists the result as a single JSON file plus a metadata sidecar;
//! [`query::query_triples`] answers free-text queries against it.

pub mod error;
pub mod extractors;
pub mod models;
pub mod query;
pub mod store;

pub use error::{GraphError, GraphResult};
pub use extractors::{
    extract_from_metadata, extract_from_text, module_name_from_path, CodeChunkFacts,
    HttpLlmTripleExtractor, LlmTripleExtractor, NullLlmTripleExtractor,
};
pub use models::{GraphMetadata, GraphQueryMatch, GraphTriple};
pub use query::{extract_query_entities, query_triples};
pub use store::GraphStore;

use std::sync::Arc;

use agentbrain_config::ProviderConfig;

/// Build the configured LLM triple extractor. A `provider` of
/// `"disabled"` or `"mock"` yields the null extractor, matching the
/// "gracefully degrades to empty output" contract.
#[must_use]
pub fn build_llm_extractor(config: &ProviderConfig) -> Arc<dyn LlmTripleExtractor> {
    if config.provider == "disabled" || config.provider == "mock" {
        return Arc::new(NullLlmTripleExtractor);
    }

    let base_url = config
        .base_url
        .clone()
        .unwrap_or_else(|| "https://api.openai.com/v1".to_string());
    let api_key = config.resolve_api_key();
    Arc::new(HttpLlmTripleExtractor::new(base_url, api_key, config.model.clone()))
}
