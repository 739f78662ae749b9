//! Test doubles for building an [`AppState`](crate::state::AppState) without
//! a running embedding provider, vector database, or job worker.

use std::sync::Arc;
use std::time::{Duration, Instant};

use agentbrain_chunking::{FsDocumentLoader, TiktokenCounter};
use agentbrain_config::AppConfig;
use agentbrain_embeddings::{MockEmbeddingProvider, MockSummarizationProvider};
use agentbrain_query::test_utils::MockQueryService;
use agentbrain_queue::JobQueueStore;
use agentbrain_storage::MockStorage;
use agentbrain_worker::{PipelineContext, Worker};

use crate::state::AppState;

/// Standard test result type for all test functions.
pub type TestResult = Result<(), Box<dyn std::error::Error>>;

/// Build an [`AppState`] wired entirely to in-memory/mock services, backed
/// by a fresh temp directory for the job queue. The returned [`tempfile::TempDir`]
/// must be kept alive for as long as `AppState` is used.
pub async fn test_state() -> (tempfile::TempDir, AppState) {
    let dir = tempfile::tempdir().expect("create temp dir");
    let config = AppConfig::default();

    let backend = Arc::new(MockStorage::new());
    let embedding_provider = Arc::new(MockEmbeddingProvider::new(768));
    let queue = Arc::new(JobQueueStore::open(dir.path().join("jobs")).await.expect("open queue"));
    let token_counter = Arc::new(TiktokenCounter::new("gpt-4", 8192).expect("tokenizer"));

    let pipeline_ctx = PipelineContext {
        loader: Arc::new(FsDocumentLoader),
        token_counter,
        embedding_provider: embedding_provider.clone(),
        summarization_provider: Arc::new(MockSummarizationProvider),
        backend: backend.clone(),
        graph_store: None,
        graph_use_code_metadata: true,
    };
    let worker = Arc::new(Worker::new(queue.clone(), pipeline_ctx, Duration::from_secs(1), 7200));

    let state = AppState {
        config: Arc::new(config),
        backend,
        graph_store: None,
        queue,
        worker,
        query_service: Arc::new(MockQueryService::empty()),
        started_at: Instant::now(),
    };

    (dir, state)
}
