//! Indexing job submission, listing, and cancellation.

use std::path::Path;

use axum::extract::{Path as AxumPath, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};

use agentbrain_queue::{generate_job_id, EnqueueOutcome, JobRecord, JobStatus};
use agentbrain_worker::pipeline::normalize_folder_path;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/index/", post(index_handler).delete(reset_handler))
        .route("/index/add", post(add_handler))
        .route("/index/jobs/", get(list_jobs_handler))
        .route("/index/jobs/{id}", get(get_job_handler).delete(cancel_job_handler))
}

#[derive(Debug, Deserialize)]
struct IndexRequestBody {
    folder_path: String,
    #[serde(default = "default_true")]
    recursive: bool,
    #[serde(default = "default_true")]
    include_code: bool,
    include_patterns: Option<Vec<String>>,
    exclude_patterns: Option<Vec<String>>,
    supported_languages: Option<Vec<String>>,
    chunk_size: Option<u32>,
    chunk_overlap: Option<u32>,
    #[serde(default)]
    generate_summaries: bool,
}

fn default_true() -> bool {
    true
}

async fn index_handler(State(state): State<AppState>, Json(body): Json<IndexRequestBody>) -> ApiResult<(StatusCode, Json<Value>)> {
    enqueue(state, "index", body).await
}

async fn add_handler(State(state): State<AppState>, Json(body): Json<IndexRequestBody>) -> ApiResult<(StatusCode, Json<Value>)> {
    enqueue(state, "add", body).await
}

async fn enqueue(state: AppState, operation: &str, body: IndexRequestBody) -> ApiResult<(StatusCode, Json<Value>)> {
    let chunk_size = body.chunk_size.unwrap_or(state.config.indexing.chunk_size as u32);
    let chunk_overlap = body.chunk_overlap.unwrap_or(state.config.indexing.chunk_overlap as u32);
    if chunk_size == 0 {
        return Err(ApiError::Validation("chunk_size must be greater than zero".to_string()));
    }
    if chunk_overlap >= chunk_size {
        return Err(ApiError::Validation("chunk_overlap must be smaller than chunk_size".to_string()));
    }

    let resolved = normalize_folder_path(Path::new(&body.folder_path))?;
    let resolved_str = resolved.to_string_lossy().to_string();

    let dedupe_key = JobRecord::compute_dedupe_key(
        &resolved_str,
        body.include_code,
        operation,
        body.include_patterns.as_deref(),
        body.exclude_patterns.as_deref(),
    );

    let job = JobRecord {
        id: generate_job_id(),
        dedupe_key,
        folder_path: resolved_str,
        include_code: body.include_code,
        operation: operation.to_string(),
        chunk_size,
        chunk_overlap,
        recursive: body.recursive,
        generate_summaries: body.generate_summaries,
        supported_languages: body.supported_languages,
        include_patterns: body.include_patterns,
        exclude_patterns: body.exclude_patterns,
        status: JobStatus::Pending,
        cancel_requested: false,
        enqueued_at: Utc::now(),
        started_at: None,
        finished_at: None,
        error: None,
        retry_count: 0,
        progress: None,
        total_chunks: 0,
        total_documents: 0,
    };
    let job_id = job.id.clone();
    match state.queue.try_enqueue(job, state.config.indexing.max_queue).await? {
        EnqueueOutcome::Deduplicated(existing) => Ok((
            StatusCode::ACCEPTED,
            Json(json!({
                "job_id": existing.id,
                "status": existing.status,
                "dedupe_hit": true,
            })),
        )),
        EnqueueOutcome::Enqueued { queue_position } => Ok((
            StatusCode::ACCEPTED,
            Json(json!({
                "job_id": job_id,
                "status": "pending",
                "queue_position": queue_position,
                "dedupe_hit": false,
            })),
        )),
    }
}

async fn reset_handler(State(state): State<AppState>) -> ApiResult<StatusCode> {
    if state.queue.get_running_job().await.is_some() {
        return Err(ApiError::Conflict("cannot reset while a job is running".to_string()));
    }
    state.backend.reset().await?;
    if let Some(graph_store) = &state.graph_store {
        graph_store.clear().await?;
    }
    Ok(StatusCode::OK)
}

#[derive(Debug, Deserialize)]
struct JobListParams {
    #[serde(default = "default_limit")]
    limit: usize,
    #[serde(default)]
    offset: usize,
}

fn default_limit() -> usize {
    50
}

async fn list_jobs_handler(State(state): State<AppState>, Query(params): Query<JobListParams>) -> Json<Value> {
    let jobs = state.queue.get_all_jobs(params.limit, params.offset).await;
    Json(json!({ "jobs": jobs }))
}

async fn get_job_handler(State(state): State<AppState>, AxumPath(id): AxumPath<String>) -> ApiResult<Json<JobRecord>> {
    let job = state.queue.get_job(&id).await.ok_or_else(|| ApiError::NotFound(id.clone()))?;
    Ok(Json(job))
}

async fn cancel_job_handler(State(state): State<AppState>, AxumPath(id): AxumPath<String>) -> ApiResult<Json<JobRecord>> {
    let job = state.queue.get_job(&id).await.ok_or_else(|| ApiError::NotFound(id.clone()))?;
    match job.status {
        JobStatus::Pending => {
            let updated = state
                .queue
                .update_job(&id, |job| {
                    job.status = JobStatus::Cancelled;
                    job.finished_at = Some(Utc::now());
                })
                .await?;
            Ok(Json(updated))
        }
        JobStatus::Running => {
            let updated = state
                .queue
                .update_job(&id, |job| job.cancel_requested = true)
                .await?;
            Ok(Json(updated))
        }
        JobStatus::Done | JobStatus::Failed | JobStatus::Cancelled => {
            Err(ApiError::Conflict(format!("job {id} already finished")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::test_state;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    #[tokio::test]
    async fn index_rejects_missing_folder() {
        let (_dir, state) = test_state().await;
        let app = routes().with_state(state);

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/index/")
                    .header("content-type", "application/json")
                    .body(Body::from(json!({ "folder_path": "/does/not/exist" }).to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn index_enqueues_job_for_real_folder() {
        let folder = tempfile::tempdir().unwrap();
        let (_dir, state) = test_state().await;
        let app = routes().with_state(state);

        let body = json!({ "folder_path": folder.path().to_string_lossy() }).to_string();
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/index/")
                    .header("content-type", "application/json")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::ACCEPTED);
    }

    #[tokio::test]
    async fn cancel_missing_job_is_not_found() {
        let (_dir, state) = test_state().await;
        let app = routes().with_state(state);

        let response = app
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri("/index/jobs/job_missing")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
