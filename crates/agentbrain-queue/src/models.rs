//! Job queue domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Lifecycle status of an indexing job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Done,
    Failed,
    Cancelled,
}

/// In-flight progress for a running job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobProgress {
    pub files_processed: u64,
    pub files_total: u64,
    pub chunks_created: u64,
    pub current_file: String,
    pub updated_at: DateTime<Utc>,
}

impl JobProgress {
    #[must_use]
    pub fn percent_complete(&self) -> f64 {
        if self.files_total == 0 {
            0.0
        } else {
            ((self.files_processed as f64 / self.files_total as f64) * 100.0 * 10.0).round() / 10.0
        }
    }
}

/// Persistent record for one indexing job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: String,
    pub dedupe_key: String,

    pub folder_path: String,
    pub include_code: bool,
    pub operation: String,

    pub chunk_size: u32,
    pub chunk_overlap: u32,
    pub recursive: bool,
    pub generate_summaries: bool,
    pub supported_languages: Option<Vec<String>>,
    pub include_patterns: Option<Vec<String>>,
    pub exclude_patterns: Option<Vec<String>>,

    pub status: JobStatus,
    pub cancel_requested: bool,

    pub enqueued_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,

    pub error: Option<String>,
    pub retry_count: u32,
    pub progress: Option<JobProgress>,
    pub total_chunks: u64,
    pub total_documents: u64,
}

impl JobRecord {
    /// Milliseconds since the job started, or `None` if it hasn't started yet.
    #[must_use]
    pub fn execution_time_ms(&self) -> Option<i64> {
        let started = self.started_at?;
        let end = self.finished_at.unwrap_or_else(Utc::now);
        Some((end - started).num_milliseconds())
    }

    /// SHA-256 of the normalized request parameters, used to detect a
    /// duplicate request for an identical folder/operation/filter set.
    #[must_use]
    pub fn compute_dedupe_key(
        resolved_folder_path: &str,
        include_code: bool,
        operation: &str,
        include_patterns: Option<&[String]>,
        exclude_patterns: Option<&[String]>,
    ) -> String {
        let mut included: Vec<&str> = include_patterns
            .unwrap_or(&[])
            .iter()
            .map(String::as_str)
            .collect();
        included.sort_unstable();
        let mut excluded: Vec<&str> = exclude_patterns
            .unwrap_or(&[])
            .iter()
            .map(String::as_str)
            .collect();
        excluded.sort_unstable();

        let dedupe_string = format!(
            "{resolved_folder_path}|{include_code}|{operation}|{}|{}",
            included.join(","),
            excluded.join(",")
        );

        let mut hasher = Sha256::new();
        hasher.update(dedupe_string.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

/// Snapshot of queue depth across statuses, plus the currently-running job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueStats {
    pub pending: u64,
    pub running: u64,
    pub completed: u64,
    pub failed: u64,
    pub cancelled: u64,
    pub total: u64,
    pub current_job_id: Option<String>,
    pub current_job_running_time_ms: Option<i64>,
}

/// Generate a new job id: `job_` followed by 12 random hex characters.
#[must_use]
pub fn generate_job_id() -> String {
    use rand::Rng;
    let mut rng = rand::thread_rng();
    let suffix: String = (0..12)
        .map(|_| format!("{:x}", rng.gen_range(0..16u8)))
        .collect();
    format!("job_{suffix}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedupe_key_ignores_pattern_order() {
        let a = JobRecord::compute_dedupe_key(
            "/a",
            true,
            "index",
            Some(&["*.rs".to_string(), "*.py".to_string()]),
            None,
        );
        let b = JobRecord::compute_dedupe_key(
            "/a",
            true,
            "index",
            Some(&["*.py".to_string(), "*.rs".to_string()]),
            None,
        );
        assert_eq!(a, b);
    }

    #[test]
    fn dedupe_key_differs_on_operation() {
        let a = JobRecord::compute_dedupe_key("/a", true, "index", None, None);
        let b = JobRecord::compute_dedupe_key("/a", true, "add", None, None);
        assert_ne!(a, b);
    }

    #[test]
    fn generated_job_ids_have_expected_shape() {
        let id = generate_job_id();
        assert!(id.starts_with("job_"));
        assert_eq!(id.len(), "job_".len() + 12);
    }

    #[test]
    fn percent_complete_handles_zero_total() {
        let progress = JobProgress {
            files_processed: 0,
            files_total: 0,
            chunks_created: 0,
            current_file: String::new(),
            updated_at: Utc::now(),
        };
        assert_eq!(progress.percent_complete(), 0.0);
    }
}
