//! `POST /query/`: the five-mode retrieval endpoint.

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use agentbrain_query::{QueryMatch, QueryRequest, SearchMode};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/query/", post(query_handler))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum ModeParam {
    Vector,
    Bm25,
    Graph,
    Hybrid,
    Multi,
}

impl From<ModeParam> for SearchMode {
    fn from(mode: ModeParam) -> Self {
        match mode {
            ModeParam::Vector => Self::Vector,
            ModeParam::Bm25 => Self::Bm25,
            ModeParam::Graph => Self::Graph,
            ModeParam::Hybrid => Self::Hybrid,
            ModeParam::Multi => Self::Multi,
        }
    }
}

#[derive(Debug, Deserialize)]
struct QueryRequestBody {
    query: String,
    #[serde(default = "default_mode")]
    mode: ModeParam,
    #[serde(default = "default_top_k")]
    top_k: usize,
    #[serde(default = "default_threshold")]
    similarity_threshold: f32,
    #[serde(default = "default_alpha")]
    alpha: f32,
    source_types: Option<Vec<String>>,
    languages: Option<Vec<String>>,
    file_paths: Option<Vec<String>>,
}

fn default_mode() -> ModeParam {
    ModeParam::Hybrid
}
fn default_top_k() -> usize {
    5
}
fn default_threshold() -> f32 {
    0.7
}
fn default_alpha() -> f32 {
    0.5
}

#[derive(Debug, Serialize)]
struct MatchResponse {
    chunk_id: String,
    text: String,
    metadata: std::collections::HashMap<String, Value>,
    score: f32,
    vector_score: Option<f32>,
    bm25_score: Option<f32>,
    graph_score: Option<f32>,
}

impl From<QueryMatch> for MatchResponse {
    fn from(m: QueryMatch) -> Self {
        Self {
            chunk_id: m.chunk_id,
            text: m.text,
            metadata: m.metadata,
            score: m.score,
            vector_score: m.vector_score,
            bm25_score: m.bm25_score,
            graph_score: m.graph_score,
        }
    }
}

#[derive(Debug, Serialize)]
struct QueryResponseBody {
    matches: Vec<MatchResponse>,
    query_time_ms: u64,
}

async fn query_handler(State(state): State<AppState>, Json(body): Json<QueryRequestBody>) -> ApiResult<Json<QueryResponseBody>> {
    if body.query.is_empty() || body.query.len() > 1000 {
        return Err(ApiError::Validation("query must be between 1 and 1000 characters".to_string()));
    }
    if body.top_k == 0 || body.top_k > 50 {
        return Err(ApiError::Validation("top_k must be between 1 and 50".to_string()));
    }
    if !(0.0..=1.0).contains(&body.similarity_threshold) {
        return Err(ApiError::Validation("similarity_threshold must be between 0 and 1".to_string()));
    }
    if !(0.0..=1.0).contains(&body.alpha) {
        return Err(ApiError::Validation("alpha must be between 0 and 1".to_string()));
    }

    let request = QueryRequest {
        query: body.query,
        mode: body.mode.into(),
        top_k: body.top_k,
        similarity_threshold: body.similarity_threshold,
        alpha: body.alpha,
        source_types: body.source_types,
        languages: body.languages,
        file_paths: body.file_paths,
    };

    let outcome = state.query_service.query(request).await?;
    Ok(Json(QueryResponseBody {
        matches: outcome.matches.into_iter().map(MatchResponse::from).collect(),
        query_time_ms: outcome.query_time_ms,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::test_state;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::json;
    use tower::ServiceExt;

    #[tokio::test]
    async fn query_rejects_empty_text() {
        let (_dir, state) = test_state().await;
        let app = routes().with_state(state);

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/query/")
                    .header("content-type", "application/json")
                    .body(Body::from(json!({ "query": "" }).to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn query_accepts_well_formed_request() {
        let (_dir, state) = test_state().await;
        let app = routes().with_state(state);

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/query/")
                    .header("content-type", "application/json")
                    .body(Body::from(json!({ "query": "find the parser" }).to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }
}
