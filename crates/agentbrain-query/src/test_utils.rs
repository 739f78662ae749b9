//! Test double for [`QueryService`].

use async_trait::async_trait;

use crate::error::QueryResult;
use crate::models::{QueryMatch, QueryOutcome, QueryRequest};
use crate::service::QueryService;

/// Mock query service that returns a fixed list of matches, ignoring the
/// request's mode and filters.
pub struct MockQueryService {
    matches: Vec<QueryMatch>,
}

impl MockQueryService {
    #[must_use]
    pub fn with_matches(matches: Vec<QueryMatch>) -> Self {
        Self { matches }
    }

    #[must_use]
    pub fn empty() -> Self {
        Self { matches: Vec::new() }
    }
}

#[async_trait]
impl QueryService for MockQueryService {
    async fn query(&self, request: QueryRequest) -> QueryResult<QueryOutcome> {
        let matches = self.matches.iter().take(request.top_k.max(1)).cloned().collect();
        Ok(QueryOutcome {
            matches,
            query_time_ms: 0,
        })
    }
}
