//! Error taxonomy for the HTTP API, mapped to the status codes in the
//! external-interfaces error table: validation and conflict errors map to
//! 4xx, backend/provider failures to 5xx.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    #[error("job {0} not found")]
    NotFound(String),

    #[error(transparent)]
    Storage(#[from] agentbrain_storage::StorageError),

    #[error(transparent)]
    Queue(#[from] agentbrain_queue::QueueError),

    #[error(transparent)]
    Query(#[from] agentbrain_query::QueryError),

    #[error(transparent)]
    Worker(#[from] agentbrain_worker::WorkerError),

    #[error("{0}")]
    Other(String),
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::NotFound(_) | Self::Queue(agentbrain_queue::QueueError::NotFound(_)) => StatusCode::NOT_FOUND,
            Self::Queue(agentbrain_queue::QueueError::Capacity(_)) => StatusCode::TOO_MANY_REQUESTS,
            Self::Query(agentbrain_query::QueryError::GraphDisabled) => StatusCode::BAD_REQUEST,
            Self::Worker(agentbrain_worker::WorkerError::InvalidFolder(_)) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        // 4xx messages are safe to return verbatim; 5xx bodies come from
        // backend/provider errors that may carry paths or connection details.
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            agentbrain_common::error_sanitizer::sanitize_error(&self, "api_request")
        } else {
            self.to_string()
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}
