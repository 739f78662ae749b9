//! Durable, file-backed job queue.
//!
//! State lives as an append-only JSONL log (`index_queue.jsonl`) plus a
//! periodic snapshot (`index_queue.snapshot`) that lets startup replay stay
//! bounded. A sidecar lock file (`.queue.lock`) is held via an OS-level
//! advisory lock for the duration of the process so a second `agent-brain`
//! instance against the same state directory fails fast instead of
//! corrupting the log.

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write as _};
use std::path::{Path, PathBuf};

use chrono::Utc;
use fs2::FileExt;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::error::{QueueError, QueueResult};
use crate::models::{JobRecord, JobStatus, QueueStats};

const QUEUE_FILE: &str = "index_queue.jsonl";
const SNAPSHOT_FILE: &str = "index_queue.snapshot";
const LOCK_FILE: &str = ".queue.lock";
pub const MAX_RETRIES: u32 = 3;
const COMPACT_THRESHOLD: u64 = 100;

struct Inner {
    jobs: HashMap<String, JobRecord>,
    updates_since_compact: u64,
}

/// Result of [`JobQueueStore::try_enqueue`].
#[derive(Debug, Clone)]
pub enum EnqueueOutcome {
    /// A new job was inserted; `queue_position` counts pending jobs ahead of it.
    Enqueued { queue_position: usize },
    /// An in-flight job with the same dedupe key already exists.
    Deduplicated(JobRecord),
}

/// Durable FIFO job queue backed by a directory on disk.
pub struct JobQueueStore {
    dir: PathBuf,
    inner: Mutex<Inner>,
    _lock_file: File,
}

impl JobQueueStore {
    /// Open (creating if absent) the queue rooted at `dir`, replaying the
    /// snapshot and log and reconciling any job left `Running` by a prior
    /// process that died mid-job.
    ///
    /// # Errors
    /// Returns [`QueueError::Io`] if `dir` cannot be created, the lock file
    /// is already held by another process, or the log/snapshot cannot be
    /// read. Returns [`QueueError::Corrupt`] if a JSONL line fails to parse.
    pub async fn open(dir: impl Into<PathBuf>) -> QueueResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;

        let lock_file = OpenOptions::new()
            .create(true)
            .write(true)
            .open(dir.join(LOCK_FILE))?;
        lock_file.try_lock_exclusive().map_err(|_| {
            QueueError::Other(format!(
                "another process already holds the queue lock in {}",
                dir.display()
            ))
        })?;

        let mut jobs = load_snapshot(&dir)?;
        replay_log(&dir, &mut jobs)?;
        reconcile_stale_running(&mut jobs);

        Ok(Self {
            dir,
            inner: Mutex::new(Inner {
                jobs,
                updates_since_compact: 0,
            }),
            _lock_file: lock_file,
        })
    }

    /// Append a new job, returning its queue position (count of other
    /// pending jobs ahead of it).
    ///
    /// # Errors
    /// Returns [`QueueError::Io`] if the log cannot be written.
    pub async fn append_job(&self, job: JobRecord) -> QueueResult<usize> {
        let mut inner = self.inner.lock().await;
        let position = inner
            .jobs
            .values()
            .filter(|j| j.status == JobStatus::Pending)
            .count();
        self.persist(&mut inner, &job)?;
        inner.jobs.insert(job.id.clone(), job);
        Ok(position)
    }

    /// Atomically dedupe-check, capacity-check, and insert `job` under a
    /// single lock acquisition, so two concurrent submissions for the same
    /// folder can't both pass the dedupe check before either is inserted.
    ///
    /// # Errors
    /// Returns [`QueueError::Capacity`] if `max_queue` in-flight jobs are
    /// already pending or running, or [`QueueError::Io`] if the log cannot
    /// be written.
    pub async fn try_enqueue(&self, job: JobRecord, max_queue: usize) -> QueueResult<EnqueueOutcome> {
        let mut inner = self.inner.lock().await;

        if let Some(existing) = inner
            .jobs
            .values()
            .find(|j| {
                j.dedupe_key == job.dedupe_key
                    && matches!(j.status, JobStatus::Pending | JobStatus::Running)
            })
            .cloned()
        {
            return Ok(EnqueueOutcome::Deduplicated(existing));
        }

        let in_flight = inner
            .jobs
            .values()
            .filter(|j| matches!(j.status, JobStatus::Pending | JobStatus::Running))
            .count();
        if in_flight >= max_queue {
            return Err(QueueError::Capacity(in_flight));
        }

        let queue_position = inner
            .jobs
            .values()
            .filter(|j| j.status == JobStatus::Pending)
            .count();
        self.persist(&mut inner, &job)?;
        inner.jobs.insert(job.id.clone(), job);
        Ok(EnqueueOutcome::Enqueued { queue_position })
    }

    /// Apply `mutate` to the job with id `job_id` and persist the result.
    ///
    /// # Errors
    /// Returns [`QueueError::NotFound`] if no job with that id exists, or
    /// [`QueueError::Io`] if the log cannot be written.
    pub async fn update_job(
        &self,
        job_id: &str,
        mutate: impl FnOnce(&mut JobRecord),
    ) -> QueueResult<JobRecord> {
        let mut inner = self.inner.lock().await;
        let mut job = inner
            .jobs
            .get(job_id)
            .cloned()
            .ok_or_else(|| QueueError::NotFound(job_id.to_string()))?;
        mutate(&mut job);
        self.persist(&mut inner, &job)?;
        inner.jobs.insert(job.id.clone(), job.clone());
        Ok(job)
    }

    /// Look up a job by dedupe key, restricted to jobs still in flight
    /// (`Pending` or `Running`).
    pub async fn find_by_dedupe_key(&self, dedupe_key: &str) -> Option<JobRecord> {
        let inner = self.inner.lock().await;
        inner
            .jobs
            .values()
            .find(|j| {
                j.dedupe_key == dedupe_key
                    && matches!(j.status, JobStatus::Pending | JobStatus::Running)
            })
            .cloned()
    }

    /// Fetch a single job by id.
    pub async fn get_job(&self, job_id: &str) -> Option<JobRecord> {
        let inner = self.inner.lock().await;
        inner.jobs.get(job_id).cloned()
    }

    /// All pending jobs, oldest first.
    pub async fn get_pending_jobs(&self) -> Vec<JobRecord> {
        let inner = self.inner.lock().await;
        let mut pending: Vec<JobRecord> = inner
            .jobs
            .values()
            .filter(|j| j.status == JobStatus::Pending)
            .cloned()
            .collect();
        pending.sort_by_key(|j| j.enqueued_at);
        pending
    }

    /// The single running job, if any.
    pub async fn get_running_job(&self) -> Option<JobRecord> {
        let inner = self.inner.lock().await;
        inner
            .jobs
            .values()
            .find(|j| j.status == JobStatus::Running)
            .cloned()
    }

    /// All jobs newest-first, paginated.
    pub async fn get_all_jobs(&self, limit: usize, offset: usize) -> Vec<JobRecord> {
        let inner = self.inner.lock().await;
        let mut all: Vec<JobRecord> = inner.jobs.values().cloned().collect();
        all.sort_by(|a, b| b.enqueued_at.cmp(&a.enqueued_at));
        all.into_iter().skip(offset).take(limit).collect()
    }

    /// Aggregate counts across all statuses plus the currently running job.
    pub async fn get_queue_stats(&self) -> QueueStats {
        let inner = self.inner.lock().await;
        let mut stats = QueueStats {
            pending: 0,
            running: 0,
            completed: 0,
            failed: 0,
            cancelled: 0,
            total: inner.jobs.len() as u64,
            current_job_id: None,
            current_job_running_time_ms: None,
        };
        for job in inner.jobs.values() {
            match job.status {
                JobStatus::Pending => stats.pending += 1,
                JobStatus::Running => {
                    stats.running += 1;
                    stats.current_job_id = Some(job.id.clone());
                    stats.current_job_running_time_ms = job.execution_time_ms();
                }
                JobStatus::Done => stats.completed += 1,
                JobStatus::Failed => stats.failed += 1,
                JobStatus::Cancelled => stats.cancelled += 1,
            }
        }
        stats
    }

    /// Pending plus running job count.
    pub async fn get_queue_length(&self) -> usize {
        let inner = self.inner.lock().await;
        inner
            .jobs
            .values()
            .filter(|j| matches!(j.status, JobStatus::Pending | JobStatus::Running))
            .count()
    }

    fn persist(&self, inner: &mut Inner, job: &JobRecord) -> QueueResult<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.dir.join(QUEUE_FILE))?;
        let line = serde_json::to_string(job)?;
        writeln!(file, "{line}")?;
        file.sync_all()?;

        inner.updates_since_compact += 1;
        if inner.updates_since_compact >= COMPACT_THRESHOLD {
            self.compact(inner)?;
        }
        Ok(())
    }

    fn compact(&self, inner: &mut Inner) -> QueueResult<()> {
        let snapshot_path = self.dir.join(SNAPSHOT_FILE);
        let tmp_path = self.dir.join(format!("{SNAPSHOT_FILE}.tmp"));

        let jobs: Vec<&JobRecord> = inner.jobs.values().collect();
        let mut tmp = File::create(&tmp_path)?;
        for job in &jobs {
            let line = serde_json::to_string(job)?;
            writeln!(tmp, "{line}")?;
        }
        tmp.sync_all()?;
        fs::rename(&tmp_path, &snapshot_path)?;

        File::create(self.dir.join(QUEUE_FILE))?;
        inner.updates_since_compact = 0;
        info!(jobs = jobs.len(), "compacted job queue snapshot");
        Ok(())
    }
}

fn load_snapshot(dir: &Path) -> QueueResult<HashMap<String, JobRecord>> {
    let path = dir.join(SNAPSHOT_FILE);
    if !path.exists() {
        return Ok(HashMap::new());
    }
    let file = File::open(&path)?;
    let mut jobs = HashMap::new();
    for line in BufReader::new(file).lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let job: JobRecord = serde_json::from_str(&line)?;
        jobs.insert(job.id.clone(), job);
    }
    Ok(jobs)
}

fn replay_log(dir: &Path, jobs: &mut HashMap<String, JobRecord>) -> QueueResult<()> {
    let path = dir.join(QUEUE_FILE);
    if !path.exists() {
        return Ok(());
    }
    let file = File::open(&path)?;
    for line in BufReader::new(file).lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let job: JobRecord = serde_json::from_str(&line)?;
        jobs.insert(job.id.clone(), job);
    }
    Ok(())
}

/// Reconcile jobs left `Running` by a process that crashed or was killed
/// mid-job: bump the retry count, and either reschedule or give up.
fn reconcile_stale_running(jobs: &mut HashMap<String, JobRecord>) {
    for job in jobs.values_mut() {
        if job.status != JobStatus::Running {
            continue;
        }
        job.retry_count += 1;
        if job.retry_count > MAX_RETRIES {
            job.status = JobStatus::Failed;
            job.error = Some(format!("Max retries ({MAX_RETRIES}) exceeded after restart"));
            job.finished_at = Some(Utc::now());
            warn!(job_id = %job.id, "job exceeded max retries after restart");
        } else {
            job.status = JobStatus::Pending;
            job.started_at = None;
            job.progress = None;
            warn!(job_id = %job.id, retry_count = job.retry_count, "rescheduling job left running after restart");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::JobRecord;

    fn sample_job(id: &str) -> JobRecord {
        JobRecord {
            id: id.to_string(),
            dedupe_key: format!("dedupe-{id}"),
            folder_path: "/tmp/project".to_string(),
            include_code: true,
            operation: "index".to_string(),
            chunk_size: 512,
            chunk_overlap: 50,
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
    async fn append_then_find_by_dedupe_key() {
        let dir = tempfile::tempdir().unwrap();
        let store = JobQueueStore::open(dir.path()).await.unwrap();
        let job = sample_job("job_a");
        store.append_job(job.clone()).await.unwrap();

        let found = store.find_by_dedupe_key(&job.dedupe_key).await.unwrap();
        assert_eq!(found.id, "job_a");
    }

    #[tokio::test]
    async fn update_job_persists_mutation() {
        let dir = tempfile::tempdir().unwrap();
        let store = JobQueueStore::open(dir.path()).await.unwrap();
        store.append_job(sample_job("job_a")).await.unwrap();

        let updated = store
            .update_job("job_a", |job| job.status = JobStatus::Running)
            .await
            .unwrap();
        assert_eq!(updated.status, JobStatus::Running);

        let stats = store.get_queue_stats().await;
        assert_eq!(stats.running, 1);
        assert_eq!(stats.current_job_id.as_deref(), Some("job_a"));
    }

    #[tokio::test]
    async fn update_job_missing_returns_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = JobQueueStore::open(dir.path()).await.unwrap();
        let err = store
            .update_job("nope", |_| {})
            .await
            .expect_err("should not find job");
        assert!(matches!(err, QueueError::NotFound(_)));
    }

    #[tokio::test]
    async fn reopening_queue_replays_log() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = JobQueueStore::open(dir.path()).await.unwrap();
            store.append_job(sample_job("job_a")).await.unwrap();
        }
        let store = JobQueueStore::open(dir.path()).await.unwrap();
        let job = store.get_job("job_a").await.unwrap();
        assert_eq!(job.status, JobStatus::Pending);
    }

    #[tokio::test]
    async fn reopening_queue_reschedules_stale_running_job() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = JobQueueStore::open(dir.path()).await.unwrap();
            store.append_job(sample_job("job_a")).await.unwrap();
            store
                .update_job("job_a", |job| job.status = JobStatus::Running)
                .await
                .unwrap();
        }
        let store = JobQueueStore::open(dir.path()).await.unwrap();
        let job = store.get_job("job_a").await.unwrap();
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.retry_count, 1);
    }

    #[tokio::test]
    async fn get_all_jobs_sorted_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let store = JobQueueStore::open(dir.path()).await.unwrap();
        let mut first = sample_job("job_a");
        first.enqueued_at = Utc::now() - chrono::Duration::seconds(10);
        store.append_job(first).await.unwrap();
        store.append_job(sample_job("job_b")).await.unwrap();

        let all = store.get_all_jobs(10, 0).await;
        assert_eq!(all[0].id, "job_b");
        assert_eq!(all[1].id, "job_a");
    }
}
