pub mod health;
pub mod index;
pub mod query;

use axum::Router;

use crate::state::AppState;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(health::routes())
        .merge(index::routes())
        .merge(query::routes())
        .with_state(state)
}
