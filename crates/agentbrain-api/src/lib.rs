pub mod error;
pub mod lifecycle;
pub mod routes;
pub mod state;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use error::{ApiError, ApiResult};
pub use lifecycle::{bootstrap, BootstrapResult, ProjectLock, RuntimeDescriptor};
pub use state::AppState;
