//! Liveness, aggregate status, and per-provider health.

use std::collections::HashSet;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};

use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health/", get(health_handler))
        .route("/health/status", get(status_handler))
        .route("/health/providers", get(providers_handler))
}

fn overall_status(queue_stats: &agentbrain_queue::QueueStats) -> &'static str {
    if queue_stats.running > 0 {
        "indexing"
    } else if queue_stats.failed > 0 && queue_stats.failed >= queue_stats.completed {
        "degraded"
    } else {
        "healthy"
    }
}

async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    let stats = state.queue.get_queue_stats().await;
    Json(json!({ "status": overall_status(&stats) }))
}

async fn status_handler(State(state): State<AppState>) -> crate::error::ApiResult<Json<Value>> {
    let stats = state.queue.get_queue_stats().await;
    let total_chunks = state.backend.get_count(&agentbrain_storage::SearchFilter::default()).await?;

    let jobs = state.queue.get_all_jobs(1000, 0).await;
    let indexed_folders: HashSet<String> = jobs
        .iter()
        .filter(|j| matches!(j.status, agentbrain_queue::JobStatus::Done))
        .map(|j| j.folder_path.clone())
        .collect();

    let graph = match &state.graph_store {
        Some(store) => json!({
            "enabled": true,
            "entity_count": store.entity_count().await,
        }),
        None => json!({ "enabled": false }),
    };

    Ok(Json(json!({
        "status": overall_status(&stats),
        "uptime_seconds": state.started_at.elapsed().as_secs(),
        "total_chunks": total_chunks,
        "indexed_folders": indexed_folders.len(),
        "queue": stats,
        "graph": graph,
    })))
}

fn provider_snapshot(config: &agentbrain_config::ProviderConfig) -> Value {
    if config.provider == "disabled" {
        json!({ "provider": "disabled", "configured": false })
    } else {
        json!({
            "provider": config.provider,
            "model": config.model,
            "configured": true,
        })
    }
}

async fn providers_handler(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "embedding": provider_snapshot(&state.config.embedding),
        "summarization": provider_snapshot(&state.config.summarization),
        "reranker": provider_snapshot(&state.config.reranker),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::test_state;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    #[tokio::test]
    async fn health_reports_healthy_when_idle() {
        let (_dir, state) = test_state().await;
        let app = routes().with_state(state);

        let response = app
            .oneshot(Request::builder().uri("/health/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }
}
