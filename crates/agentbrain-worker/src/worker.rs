//! Single-job FIFO worker: polls the queue, runs one job at a time through
//! the indexing pipeline, and maintains its lifecycle (timeout, cooperative
//! cancellation, retry bookkeeping, graceful shutdown).

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::sleep;
use tracing::{error, info, warn};

use agentbrain_queue::{JobProgress, JobQueueStore, JobRecord, JobStatus};
use agentbrain_storage::SearchFilter;

use crate::error::{WorkerError, WorkerResult};
use crate::pipeline::{self, IndexRequest, PipelineContext, ProgressSink};

/// Writes pipeline progress onto the job record and turns a
/// `cancel_requested` flag into an abort.
struct JobProgressSink {
    queue: Arc<JobQueueStore>,
    job_id: String,
}

#[async_trait::async_trait]
impl ProgressSink for JobProgressSink {
    async fn on_progress(&self, files_processed: usize, files_total: usize, current_file: &str) -> WorkerResult<()> {
        let progress = JobProgress {
            files_processed: files_processed as u64,
            files_total: files_total as u64,
            chunks_created: 0,
            current_file: current_file.to_string(),
            updated_at: Utc::now(),
        };
        let record = self.queue.update_job(&self.job_id, move |job| job.progress = Some(progress)).await?;
        if record.cancel_requested {
            return Err(WorkerError::Cancelled);
        }
        Ok(())
    }
}

/// Runs the poll loop and owns the shutdown signal.
pub struct Worker {
    queue: Arc<JobQueueStore>,
    ctx: PipelineContext,
    poll_interval: Duration,
    max_runtime_seconds: u64,
    shutdown: Arc<AtomicBool>,
}

impl Worker {
    #[must_use]
    pub fn new(queue: Arc<JobQueueStore>, ctx: PipelineContext, poll_interval: Duration, max_runtime_seconds: u64) -> Self {
        Self {
            queue,
            ctx,
            poll_interval,
            max_runtime_seconds,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    #[must_use]
    pub fn shutdown_signal(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    /// Poll for pending jobs and process them one at a time, FIFO, until
    /// `shutdown_signal()` is set.
    pub async fn run(&self) {
        info!("job worker starting");
        while !self.shutdown.load(Ordering::Relaxed) {
            let Some(job) = self.queue.get_pending_jobs().await.into_iter().next() else {
                sleep(self.poll_interval).await;
                continue;
            };

            if let Err(err) = self.process(job.id.clone()).await {
                error!(job_id = %job.id, error = %err, "job processing failed unexpectedly");
            }
        }
        info!("job worker stopped");
    }

    /// Request a graceful stop: sets the shutdown flag and waits up to
    /// `timeout` for the current job to finish or hit a progress
    /// checkpoint. Does not abort an in-flight job.
    pub async fn stop(&self, timeout: Duration) {
        self.shutdown.store(true, Ordering::Relaxed);
        let deadline = tokio::time::Instant::now() + timeout;
        while tokio::time::Instant::now() < deadline {
            if self.queue.get_running_job().await.is_none() {
                return;
            }
            sleep(Duration::from_millis(200)).await;
        }
        warn!("worker stop timed out with a job still running");
    }

    /// Run the eight-step job lifecycle for `job_id`: transition to
    /// running, execute the pipeline under a runtime timeout with
    /// cooperative cancellation, verify the result, and finalize status.
    ///
    /// # Errors
    /// Returns a [`WorkerError`] only for queue-store failures; pipeline
    /// failures are captured on the job record itself, not propagated.
    pub async fn process(&self, job_id: String) -> WorkerResult<()> {
        let job = self
            .queue
            .update_job(&job_id, |job| {
                job.status = JobStatus::Running;
                job.started_at = Some(Utc::now());
                job.error = None;
            })
            .await?;

        let count_before = self.count_for_folder(&job.folder_path).await.unwrap_or(0);

        let progress_sink = JobProgressSink {
            queue: Arc::clone(&self.queue),
            job_id: job.id.clone(),
        };

        let request = IndexRequest {
            folder_path: Path::new(&job.folder_path),
            recursive: job.recursive,
            include_code: job.include_code,
            include_patterns: job.include_patterns.clone().unwrap_or_default(),
            exclude_patterns: job.exclude_patterns.clone().unwrap_or_default(),
            supported_languages: job.supported_languages.clone(),
            chunk_size: job.chunk_size as usize,
            chunk_overlap: job.chunk_overlap as usize,
            generate_summaries: job.generate_summaries,
            progress_checkpoint_interval: 1,
        };

        let timeout = Duration::from_secs(self.max_runtime_seconds);
        let outcome = tokio::time::timeout(timeout, pipeline::run(&self.ctx, &request, &progress_sink)).await;

        match outcome {
            Err(_) => {
                self.finish_job(
                    &job_id,
                    JobStatus::Failed,
                    Some(format!("Job timed out after {} seconds", self.max_runtime_seconds)),
                    None,
                )
                .await?;
            }
            Ok(Err(WorkerError::Cancelled)) => {
                self.finish_job(
                    &job_id,
                    JobStatus::Cancelled,
                    Some("Job was cancelled by user request".to_string()),
                    None,
                )
                .await?;
            }
            Ok(Err(err)) => {
                self.finish_job(&job_id, JobStatus::Failed, Some(err.to_string()), None).await?;
            }
            Ok(Ok(result)) => {
                let count_after = self.count_for_folder(&job.folder_path).await.unwrap_or(count_before);
                let delta = count_after.saturating_sub(count_before);
                if delta == 0 && result.chunks_created == 0 {
                    self.finish_job(
                        &job_id,
                        JobStatus::Failed,
                        Some("Verification failed: No chunks found in vector store".to_string()),
                        Some(result),
                    )
                    .await?;
                } else {
                    if delta == 0 && result.chunks_created > 0 {
                        warn!(
                            job_id = %job_id,
                            chunks_created = result.chunks_created,
                            "re-indexed content already present in the vector store; collection size unchanged"
                        );
                    }
                    self.finish_job(&job_id, JobStatus::Done, None, Some(result)).await?;
                }
            }
        }

        Ok(())
    }

    async fn count_for_folder(&self, folder_path: &str) -> WorkerResult<usize> {
        let filter = SearchFilter {
            file_paths_glob: Some(format!("{}/**", folder_path.trim_end_matches('/'))),
            ..Default::default()
        };
        Ok(self.ctx.backend.get_count(&filter).await?)
    }

    async fn finish_job(
        &self,
        job_id: &str,
        status: JobStatus,
        error: Option<String>,
        outcome: Option<pipeline::IndexOutcome>,
    ) -> WorkerResult<JobRecord> {
        let record = self
            .queue
            .update_job(job_id, move |job| {
                job.status = status;
                job.finished_at = Some(Utc::now());
                job.error = error;
                if let Some(outcome) = outcome {
                    job.total_documents = outcome.documents_processed as u64;
                    job.total_chunks = outcome.chunks_created as u64;
                }
            })
            .await?;
        info!(job_id, status = ?record.status, "job finished");
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use agentbrain_chunking::{FsDocumentLoader, TiktokenCounter};
    use agentbrain_embeddings::{MockEmbeddingProvider, MockSummarizationProvider};
    use agentbrain_storage::MockStorage;

    fn pipeline_context() -> PipelineContext {
        PipelineContext {
            loader: Arc::new(FsDocumentLoader),
            token_counter: Arc::new(TiktokenCounter::new("gpt-4", 8192).expect("tiktoken init")),
            embedding_provider: Arc::new(MockEmbeddingProvider::new(16)),
            summarization_provider: Arc::new(MockSummarizationProvider),
            backend: Arc::new(MockStorage::new()),
            graph_store: None,
            graph_use_code_metadata: true,
        }
    }

    fn sample_job(folder_path: &str) -> JobRecord {
        JobRecord {
            id: agentbrain_queue::generate_job_id(),
            dedupe_key: "dedupe".to_string(),
            folder_path: folder_path.to_string(),
            include_code: true,
            operation: "index".to_string(),
            chunk_size: 200,
            chunk_overlap: 0,
            recursive: true,
            generate_summaries: false,
            supported_languages: None,
            include_patterns: None,
            exclude_patterns: None,
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
        }
    }

    #[tokio::test]
    async fn process_marks_job_done_after_successful_indexing() {
        let project_dir = tempfile::tempdir().unwrap();
        std::fs::write(project_dir.path().join("lib.rs"), "fn run() {}\n").unwrap();

        let queue_dir = tempfile::tempdir().unwrap();
        let queue = Arc::new(JobQueueStore::open(queue_dir.path()).await.unwrap());
        let job = sample_job(project_dir.path().to_str().unwrap());
        let job_id = job.id.clone();
        queue.append_job(job).await.unwrap();

        let worker = Worker::new(Arc::clone(&queue), pipeline_context(), Duration::from_millis(10), 60);
        worker.process(job_id.clone()).await.unwrap();

        let record = queue.get_job(&job_id).await.unwrap();
        assert_eq!(record.status, JobStatus::Done);
        assert!(record.total_chunks > 0);
    }

    #[tokio::test]
    async fn process_marks_job_cancelled_when_requested_mid_run() {
        let project_dir = tempfile::tempdir().unwrap();
        for i in 0..5 {
            std::fs::write(project_dir.path().join(format!("f{i}.rs")), format!("fn f{i}() {{}}\n")).unwrap();
        }

        let queue_dir = tempfile::tempdir().unwrap();
        let queue = Arc::new(JobQueueStore::open(queue_dir.path()).await.unwrap());
        let mut job = sample_job(project_dir.path().to_str().unwrap());
        job.cancel_requested = true;
        let job_id = job.id.clone();
        queue.append_job(job).await.unwrap();

        let worker = Worker::new(Arc::clone(&queue), pipeline_context(), Duration::from_millis(10), 60);
        worker.process(job_id.clone()).await.unwrap();

        let record = queue.get_job(&job_id).await.unwrap();
        assert_eq!(record.status, JobStatus::Cancelled);
        assert_eq!(record.error.as_deref(), Some("Job was cancelled by user request"));
    }
}
