//! Durable, single-worker job queue for indexing requests.
//!
//! Jobs are appended to a JSONL log and periodically compacted into a
//! snapshot so that restart replay stays bounded. Only one job runs at a
//! time; queued jobs wait in FIFO order. See [`JobQueueStore`] for the
//! storage layer and [`JobRecord`] for the job shape.

pub mod error;
pub mod models;
pub mod store;

pub use error::{QueueError, QueueResult};
pub use models::{generate_job_id, JobProgress, JobRecord, JobStatus, QueueStats};
pub use store::{EnqueueOutcome, JobQueueStore, MAX_RETRIES};
