//! Application bootstrap: configuration loading, dependency wiring, the
//! per-project lock, and the runtime descriptor used for CLI discovery.

use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use fs2::FileExt;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use agentbrain_chunking::{FsDocumentLoader, TiktokenCounter};
use agentbrain_config::AppConfig;
use agentbrain_queue::JobQueueStore;
use agentbrain_query::FusionQueryService;
use agentbrain_storage::{validate_embedding_compatibility, EmbeddingMetadata};
use agentbrain_worker::{PipelineContext, Worker};

use crate::state::AppState;

pub type BootstrapResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

const RUNTIME_FILE: &str = "runtime.json";
const LOCK_FILE: &str = ".lock";

/// Per-project runtime descriptor, written before the server accepts
/// requests and removed on clean shutdown. The CLI reads this file to
/// find a running server without being told its port explicitly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeDescriptor {
    pub mode: String,
    pub project_root: PathBuf,
    pub bind_host: String,
    pub port: u16,
    pub pid: u32,
    pub base_url: String,
}

/// Holds the project-level advisory lock and the runtime descriptor path
/// for the lifetime of the server process.
pub struct ProjectLock {
    _lock_file: fs::File,
    runtime_path: PathBuf,
}

impl ProjectLock {
    /// Remove the runtime descriptor on clean shutdown. The OS-level lock
    /// itself releases when this value's file handle is dropped.
    pub fn shutdown(&self) {
        if let Err(err) = fs::remove_file(&self.runtime_path) {
            if err.kind() != std::io::ErrorKind::NotFound {
                warn!(error = %err, "failed to remove runtime descriptor on shutdown");
            }
        }
    }
}

fn acquire_lock(state_dir: &Path) -> BootstrapResult<fs::File> {
    let lock_file = fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(state_dir.join(LOCK_FILE))?;
    lock_file.try_lock_exclusive().map_err(|_| {
        format!(
            "another agent-brain process already holds the project lock in {}",
            state_dir.display()
        )
    })?;
    writeln!(&lock_file, "{}", std::process::id())?;
    Ok(lock_file)
}

/// Initialize all services and wire them into [`AppState`], acquiring the
/// per-project lock and writing the runtime descriptor as the final step
/// before the caller starts accepting connections.
///
/// # Errors
/// Returns an error if configuration loading/validation fails, the
/// project lock is already held, any backing service fails to
/// initialize, or the embedding fingerprint stored on disk does not
/// match the configured provider.
pub async fn bootstrap(project_root: PathBuf) -> BootstrapResult<(AppState, ProjectLock)> {
    let config = AppConfig::load(&project_root)?;
    let state_dir = config.project.resolve_state_dir(&project_root);
    fs::create_dir_all(state_dir.join("data"))?;
    fs::create_dir_all(state_dir.join("jobs"))?;
    fs::create_dir_all(state_dir.join("logs"))?;

    let lock_file = acquire_lock(&state_dir)?;

    let backend = agentbrain_storage::build_backend(&config, &state_dir).await?;
    backend.initialize().await?;

    let embedding_provider = agentbrain_embeddings::build_provider(&config.embedding)?;
    let summarization_provider = agentbrain_embeddings::build_summarization_provider(&config.summarization);

    let live_metadata = EmbeddingMetadata {
        provider: config.embedding.provider.clone(),
        model: config.embedding.model.clone(),
        dimensions: config.embedding.dimensions.unwrap_or(768),
    };
    let backend_name = match config.storage.variant {
        agentbrain_config::StorageVariant::ColumnarEmbedded => "columnar",
        agentbrain_config::StorageVariant::RelationalVector => "relational",
    };
    let stored_metadata = backend.get_embedding_metadata().await?;
    validate_embedding_compatibility(backend_name, &live_metadata, stored_metadata.as_ref())?;
    backend.set_embedding_metadata(live_metadata).await?;

    let graph_store = if config.graph.enabled {
        let graph_dir = state_dir.join("data").join("graph");
        Some(Arc::new(agentbrain_graph::GraphStore::open(graph_dir).await?))
    } else {
        None
    };

    let queue = Arc::new(JobQueueStore::open(state_dir.join("jobs")).await?);

    let token_counter: Arc<dyn agentbrain_chunking::TokenCounter> =
        Arc::new(TiktokenCounter::new(&config.embedding.model, 8192).or_else(|_| TiktokenCounter::new("gpt-4", 8192))?);

    let pipeline_ctx = PipelineContext {
        loader: Arc::new(FsDocumentLoader),
        token_counter,
        embedding_provider: Arc::clone(&embedding_provider),
        summarization_provider,
        backend: Arc::clone(&backend),
        graph_store: graph_store.clone(),
        graph_use_code_metadata: true,
    };

    let worker = Arc::new(Worker::new(
        Arc::clone(&queue),
        pipeline_ctx,
        std::time::Duration::from_secs_f64(config.indexing.poll_interval_seconds),
        config.indexing.max_runtime_seconds,
    ));

    let query_service = Arc::new(FusionQueryService::new(
        embedding_provider,
        Arc::clone(&backend),
        graph_store.clone(),
        config.query.rrf_k as u32,
    ));

    let bind_host = config.server.host.clone();
    let port = config.server.port;
    let base_url = config
        .server
        .url
        .clone()
        .unwrap_or_else(|| format!("http://{bind_host}:{port}"));

    let descriptor = RuntimeDescriptor {
        mode: "server".to_string(),
        project_root: project_root.clone(),
        bind_host,
        port,
        pid: std::process::id(),
        base_url,
    };
    let runtime_path = state_dir.join(RUNTIME_FILE);
    fs::write(&runtime_path, serde_json::to_string_pretty(&descriptor)?)?;

    info!(state_dir = %state_dir.display(), port, "agent-brain server bootstrapped");

    let state = AppState {
        config: Arc::new(config),
        backend,
        graph_store,
        queue,
        worker,
        query_service,
        started_at: Instant::now(),
    };

    Ok((
        state,
        ProjectLock {
            _lock_file: lock_file,
            runtime_path,
        },
    ))
}
