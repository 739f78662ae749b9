//! Indexing pipeline and single-job FIFO worker.
//!
//! [`pipeline::run`] turns one folder into stored, searchable chunks:
//! load, chunk, optionally summarize, embed, upsert, rebuild the lexical
//! index, and extract graph triples. [`worker::Worker`] polls the job
//! queue and drives that pipeline through a job's full lifecycle, one job
//! at a time.

pub mod error;
pub mod pipeline;
pub mod worker;

pub use error::{WorkerError, WorkerResult};
pub use pipeline::{IndexOutcome, IndexRequest, PipelineContext, ProgressSink};
pub use worker::Worker;
