//! Centralized configuration for agent-brain.
//!
//! Configuration is YAML, resolved from the first path that exists (see
//! [`source::resolve_config_path`]), then overridden field-by-field by
//! environment variables of the form `AGENT_BRAIN_<SECTION>_<FIELD>`.
//! The merged tree is validated once before lifecycle startup proceeds.

pub mod error;
pub mod source;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
use validation::Validate;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

// =============================================================================
// SAFE DEFAULTS
// =============================================================================

const DEFAULT_SERVER_HOST: &str = "127.0.0.1";
const DEFAULT_SERVER_PORT: u16 = 8000;

const DEFAULT_EMBEDDING_PROVIDER: &str = "local";
const DEFAULT_EMBEDDING_MODEL: &str = "jinaai/jina-embeddings-v2-base-code";
const DEFAULT_EMBEDDING_DIMENSIONS: usize = 768;
const DEFAULT_EMBEDDING_BATCH_SIZE: usize = 64;

const DEFAULT_CHUNK_SIZE: u64 = 512;
const DEFAULT_CHUNK_OVERLAP: u64 = 50;
const DEFAULT_MAX_QUEUE: usize = 10;
const DEFAULT_MAX_RUNTIME_SECONDS: u64 = 7200;
const DEFAULT_PROGRESS_CHECKPOINT_INTERVAL: usize = 50;
const DEFAULT_POLL_INTERVAL_SECONDS: f64 = 1.0;
const DEFAULT_COMPACT_THRESHOLD: usize = 100;
const DEFAULT_MAX_RETRIES: u32 = 3;
const DEFAULT_WORKER_STOP_TIMEOUT_SECONDS: u64 = 30;

const DEFAULT_QDRANT_URL: &str = "http://localhost:6334";
const DEFAULT_COLLECTION_NAME: &str = "agent_brain";
const DEFAULT_BM25_K1: f64 = 1.5;
const DEFAULT_BM25_B: f64 = 0.75;
const DEFAULT_HNSW_M: u32 = 16;
const DEFAULT_HNSW_EF_CONSTRUCTION: u32 = 64;

const DEFAULT_GRAPH_MAX_ENTITIES: usize = 10;
const DEFAULT_GRAPH_TOP_K_PER_ENTITY: usize = 5;

const DEFAULT_QUERY_TOP_K: u64 = 5;
const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.7;
const DEFAULT_ALPHA: f64 = 0.5;
const DEFAULT_RRF_K: u64 = 60;

/// Root configuration tree for one agent-brain project.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub project: ProjectConfig,
    #[serde(default = "ProviderConfig::default_embedding")]
    pub embedding: ProviderConfig,
    #[serde(default = "ProviderConfig::default_summarization")]
    pub summarization: ProviderConfig,
    #[serde(default = "ProviderConfig::default_reranker")]
    pub reranker: ProviderConfig,
    #[serde(default)]
    pub indexing: IndexingConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub graph: GraphConfig,
    #[serde(default)]
    pub query: QueryConfig,
}

/// `server` section: bind address and discovery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Externally-advertised base URL; when absent, derived from host/port at bind time.
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    /// Fall forward to the next free port instead of failing when `port` is in use.
    pub auto_port: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            url: None,
            host: DEFAULT_SERVER_HOST.to_string(),
            port: DEFAULT_SERVER_PORT,
            auto_port: true,
        }
    }
}

/// `project` section: where persisted state lives.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProjectConfig {
    /// Absolute path to the state directory; defaults to `<root>/.claude/agent-brain`.
    pub state_dir: Option<PathBuf>,
}

impl ProjectConfig {
    /// Resolve the state directory for `project_root`, honoring an explicit override.
    #[must_use]
    pub fn resolve_state_dir(&self, project_root: &Path) -> PathBuf {
        self.state_dir
            .clone()
            .unwrap_or_else(|| project_root.join(".claude").join("agent-brain"))
    }
}

/// Narrow provider contract shared by embedding/summarization/reranker sections.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub provider: String,
    pub model: String,
    pub api_key: Option<String>,
    pub api_key_env: Option<String>,
    pub base_url: Option<String>,
    /// Only meaningful for `embedding`; the dimensionality of the configured model.
    pub dimensions: Option<usize>,
    #[serde(default)]
    pub params: HashMap<String, serde_json::Value>,
}

impl ProviderConfig {
    fn default_embedding() -> Self {
        Self {
            provider: DEFAULT_EMBEDDING_PROVIDER.to_string(),
            model: DEFAULT_EMBEDDING_MODEL.to_string(),
            api_key: None,
            api_key_env: None,
            base_url: None,
            dimensions: Some(DEFAULT_EMBEDDING_DIMENSIONS),
            params: HashMap::new(),
        }
    }

    fn default_summarization() -> Self {
        Self {
            provider: "disabled".to_string(),
            model: String::new(),
            api_key: None,
            api_key_env: None,
            base_url: None,
            dimensions: None,
            params: HashMap::new(),
        }
    }

    fn default_reranker() -> Self {
        Self::default_summarization()
    }

    /// Resolve the api key, preferring the literal `api_key` over `$api_key_env`.
    #[must_use]
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key.clone().or_else(|| {
            self.api_key_env
                .as_ref()
                .and_then(|name| std::env::var(name).ok())
        })
    }
}

/// Indexing pipeline and job-worker tunables (§4.6/§4.7/§4.9).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexingConfig {
    pub chunk_size: u64,
    pub chunk_overlap: u64,
    pub embedding_batch_size: usize,
    pub max_queue: usize,
    pub max_runtime_seconds: u64,
    pub progress_checkpoint_interval: usize,
    pub poll_interval_seconds: f64,
    pub compact_threshold: usize,
    pub max_retries: u32,
    pub worker_stop_timeout_seconds: u64,
    /// Fail startup (rather than degrade) when a configured provider is unreachable.
    pub strict_provider_mode: bool,
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            embedding_batch_size: DEFAULT_EMBEDDING_BATCH_SIZE,
            max_queue: DEFAULT_MAX_QUEUE,
            max_runtime_seconds: DEFAULT_MAX_RUNTIME_SECONDS,
            progress_checkpoint_interval: DEFAULT_PROGRESS_CHECKPOINT_INTERVAL,
            poll_interval_seconds: DEFAULT_POLL_INTERVAL_SECONDS,
            compact_threshold: DEFAULT_COMPACT_THRESHOLD,
            max_retries: DEFAULT_MAX_RETRIES,
            worker_stop_timeout_seconds: DEFAULT_WORKER_STOP_TIMEOUT_SECONDS,
            strict_provider_mode: false,
        }
    }
}

/// Which of the two storage backends is active, and its tunables.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum StorageVariant {
    #[default]
    ColumnarEmbedded,
    RelationalVector,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub variant: StorageVariant,
    pub qdrant_url: String,
    pub collection_name: String,
    pub postgres_url: Option<String>,
    pub bm25_k1: f64,
    pub bm25_b: f64,
    pub hnsw_m: u32,
    pub hnsw_ef_construction: u32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            variant: StorageVariant::default(),
            qdrant_url: DEFAULT_QDRANT_URL.to_string(),
            collection_name: DEFAULT_COLLECTION_NAME.to_string(),
            postgres_url: None,
            bm25_k1: DEFAULT_BM25_K1,
            bm25_b: DEFAULT_BM25_B,
            hnsw_m: DEFAULT_HNSW_M,
            hnsw_ef_construction: DEFAULT_HNSW_EF_CONSTRUCTION,
        }
    }
}

/// Knowledge-graph extraction/query tunables (§4.5).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphConfig {
    pub enabled: bool,
    pub use_llm_extractor: bool,
    pub max_entities: usize,
    pub top_k_per_entity: usize,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            use_llm_extractor: false,
            max_entities: DEFAULT_GRAPH_MAX_ENTITIES,
            top_k_per_entity: DEFAULT_GRAPH_TOP_K_PER_ENTITY,
        }
    }
}

/// Query-fusion defaults (§4.8), overridable per-request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    pub default_top_k: u64,
    pub default_similarity_threshold: f64,
    pub default_alpha: f64,
    pub rrf_k: u64,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_top_k: DEFAULT_QUERY_TOP_K,
            default_similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            default_alpha: DEFAULT_ALPHA,
            rrf_k: DEFAULT_RRF_K,
        }
    }
}

impl AppConfig {
    /// Load configuration for `project_root`: resolve a YAML file (if any), then
    /// apply environment-variable overrides, then validate.
    ///
    /// # Errors
    /// Returns [`ConfigError`] if the YAML file is malformed or validation fails.
    pub fn load(project_root: &Path) -> ConfigResult<Self> {
        let mut config = match source::resolve_config_path(project_root) {
            Some(path) => {
                tracing::debug!(path = %path.display(), "Loading configuration file");
                source::load_yaml_file(&path)?
            }
            None => {
                tracing::debug!("No configuration file found; using defaults");
                Self::default()
            }
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Overlay environment variables onto an already-loaded configuration.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("AGENT_BRAIN_URL") {
            self.server.url = Some(v);
        }
        env_override_string("AGENT_BRAIN_SERVER_HOST", &mut self.server.host);
        env_override_parsed("AGENT_BRAIN_SERVER_PORT", &mut self.server.port);
        env_override_parsed("AGENT_BRAIN_SERVER_AUTO_PORT", &mut self.server.auto_port);

        if let Ok(v) = std::env::var("AGENT_BRAIN_STATE_DIR") {
            self.project.state_dir = Some(PathBuf::from(v));
        }

        env_override_string("AGENT_BRAIN_EMBEDDING_PROVIDER", &mut self.embedding.provider);
        env_override_string("AGENT_BRAIN_EMBEDDING_MODEL", &mut self.embedding.model);
        if let Ok(v) = std::env::var("AGENT_BRAIN_EMBEDDING_API_KEY") {
            self.embedding.api_key = Some(v);
        }
        if let Ok(v) = std::env::var("AGENT_BRAIN_EMBEDDING_BASE_URL") {
            self.embedding.base_url = Some(v);
        }
        if let Ok(v) = std::env::var("AGENT_BRAIN_EMBEDDING_DIMENSIONS")
            && let Ok(parsed) = v.parse()
        {
            self.embedding.dimensions = Some(parsed);
        }

        env_override_parsed("AGENT_BRAIN_CHUNK_SIZE", &mut self.indexing.chunk_size);
        env_override_parsed("AGENT_BRAIN_CHUNK_OVERLAP", &mut self.indexing.chunk_overlap);
        env_override_parsed("AGENT_BRAIN_MAX_QUEUE", &mut self.indexing.max_queue);
        env_override_parsed(
            "AGENT_BRAIN_MAX_RUNTIME_SECONDS",
            &mut self.indexing.max_runtime_seconds,
        );
        env_override_parsed(
            "AGENT_BRAIN_STRICT_PROVIDER_MODE",
            &mut self.indexing.strict_provider_mode,
        );

        env_override_parsed("AGENT_BRAIN_STORAGE_VARIANT", &mut self.storage.variant);
        env_override_string("AGENT_BRAIN_QDRANT_URL", &mut self.storage.qdrant_url);
        env_override_string(
            "AGENT_BRAIN_COLLECTION_NAME",
            &mut self.storage.collection_name,
        );
        if let Ok(v) = std::env::var("AGENT_BRAIN_POSTGRES_URL") {
            self.storage.postgres_url = Some(v);
        }

        env_override_parsed("AGENT_BRAIN_GRAPH_ENABLED", &mut self.graph.enabled);
        env_override_parsed(
            "AGENT_BRAIN_GRAPH_USE_LLM_EXTRACTOR",
            &mut self.graph.use_llm_extractor,
        );

        env_override_parsed("AGENT_BRAIN_QUERY_TOP_K", &mut self.query.default_top_k);
        env_override_parsed(
            "AGENT_BRAIN_QUERY_SIMILARITY_THRESHOLD",
            &mut self.query.default_similarity_threshold,
        );
        env_override_parsed("AGENT_BRAIN_QUERY_ALPHA", &mut self.query.default_alpha);
    }
}

fn env_override_string(var: &str, target: &mut String) {
    if let Ok(v) = std::env::var(var) {
        *target = v;
    }
}

fn env_override_parsed<T: std::str::FromStr>(var: &str, target: &mut T) {
    if let Ok(v) = std::env::var(var)
        && let Ok(parsed) = v.parse()
    {
        *target = parsed;
    }
}

impl std::str::FromStr for StorageVariant {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "columnar_embedded" | "columnar" | "embedded" => Ok(Self::ColumnarEmbedded),
            "relational_vector" | "relational" | "postgres" => Ok(Self::RelationalVector),
            other => Err(ConfigError::Generic {
                message: format!("unknown storage variant: {other}"),
            }),
        }
    }
}

impl Validate for AppConfig {
    fn validate(&self) -> ConfigResult<()> {
        validation::validate_port(self.server.port, "server.port")?;
        validation::validate_range(self.indexing.chunk_size, 128, 2048, "indexing.chunk_size")?;
        validation::validate_range(self.indexing.chunk_overlap, 0, 200, "indexing.chunk_overlap")?;
        validation::validate_non_empty(&self.embedding.provider, "embedding.provider")?;
        validation::validate_non_empty(&self.embedding.model, "embedding.model")?;

        if !(0.0..=1.0).contains(&self.query.default_alpha) {
            return Err(ConfigError::OutOfRange {
                field: "query.default_alpha".to_string(),
                value: 0,
                min: 0,
                max: 1,
            });
        }
        if !(0.0..=1.0).contains(&self.query.default_similarity_threshold) {
            return Err(ConfigError::OutOfRange {
                field: "query.default_similarity_threshold".to_string(),
                value: 0,
                min: 0,
                max: 1,
            });
        }

        if self.storage.variant == StorageVariant::RelationalVector
            && self.storage.postgres_url.is_none()
        {
            return Err(ConfigError::MissingField {
                field: "storage.postgres_url".to_string(),
            });
        }

        if let Some(base_url) = &self.embedding.base_url {
            validation::validate_url(base_url, "embedding.base_url")?;
        }

        Ok(())
    }
}

/// Cross-check a live embedding dimensionality against the configured one.
///
/// # Errors
/// Returns [`ConfigError::DimensionMismatch`] when they differ.
pub fn validate_embedding_dimensions(configured: usize, live: usize) -> ConfigResult<()> {
    if configured != live {
        return Err(ConfigError::DimensionMismatch {
            embedding: live,
            storage: configured,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate_cleanly() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_chunk_size_out_of_range() {
        let mut config = AppConfig::default();
        config.indexing.chunk_size = 16;
        assert!(config.validate().is_err());
    }

    #[test]
    fn relational_variant_requires_postgres_url() {
        let mut config = AppConfig::default();
        config.storage.variant = StorageVariant::RelationalVector;
        assert!(config.validate().is_err());
        config.storage.postgres_url = Some("postgres://localhost/agent_brain".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn env_override_wins_over_default() {
        let mut config = AppConfig::default();
        // SAFETY: test-only env var scoped to this process and restored immediately after.
        unsafe {
            std::env::set_var("AGENT_BRAIN_SERVER_PORT", "9999");
        }
        config.apply_env_overrides();
        unsafe {
            std::env::remove_var("AGENT_BRAIN_SERVER_PORT");
        }
        assert_eq!(config.server.port, 9999);
    }

    #[test]
    fn resolve_state_dir_defaults_under_project_root() {
        let project = ProjectConfig::default();
        let root = Path::new("/x/project");
        assert_eq!(
            project.resolve_state_dir(root),
            root.join(".claude").join("agent-brain")
        );
    }

    #[test]
    fn provider_config_prefers_literal_api_key_over_env() {
        let mut provider = ProviderConfig::default_embedding();
        provider.api_key = Some("literal".to_string());
        provider.api_key_env = Some("SOME_UNSET_VAR_AGENT_BRAIN_TEST".to_string());
        assert_eq!(provider.resolve_api_key().as_deref(), Some("literal"));
    }
}
