//! Shared application state handed to every Axum handler.
//!
//! Built once at startup by [`crate::lifecycle::bootstrap`] and cloned
//! (cheaply, since every field is an `Arc`) into each request.

use std::sync::Arc;
use std::time::Instant;

use agentbrain_config::AppConfig;
use agentbrain_graph::GraphStore;
use agentbrain_query::QueryService;
use agentbrain_queue::JobQueueStore;
use agentbrain_storage::StorageBackend;
use agentbrain_worker::Worker;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub backend: Arc<dyn StorageBackend>,
    pub graph_store: Option<Arc<GraphStore>>,
    pub queue: Arc<JobQueueStore>,
    pub worker: Arc<Worker>,
    pub query_service: Arc<dyn QueryService>,
    pub started_at: Instant,
}
