//! Common utilities and patterns shared across agent-brain crates.
//!
//! This crate provides shared functionality to reduce duplication across
//! the various agent-brain components: error handling traits/macros,
//! cross-boundary correlation ids, and process-wide environment init.

pub mod error;
pub mod error_sanitizer;
pub mod init;
pub mod tracing;

pub use error::{CommonError, ErrorContext};
pub use init::{initialize_environment, initialize_test_environment};
pub use tracing::CorrelationId;
