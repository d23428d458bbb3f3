//! Download jobs and their per-job outcomes.

use std::fmt;
use std::path::PathBuf;

/// One concrete file-download unit of work.
///
/// Jobs are created by the flattener in listing order and are immutable
/// afterwards. `index` is the job's position in that order; results are
/// reported back in the same order regardless of completion time.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DownloadJob {
    /// Position of the job in the flattened sequence (0-based).
    pub index: usize,
    /// Remote URL the file body is fetched from.
    pub url: String,
    /// Destination path, relative to the download root.
    pub destination: PathBuf,
    /// File size advertised by the listing, when known.
    pub expected_size: Option<u64>,
}

impl DownloadJob {
    /// Creates a new job.
    #[must_use]
    pub fn new(
        index: usize,
        url: impl Into<String>,
        destination: impl Into<PathBuf>,
        expected_size: Option<u64>,
    ) -> Self {
        Self {
            index,
            url: url.into(),
            destination: destination.into(),
            expected_size,
        }
    }
}

/// Final state of a single job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// The file was fully written to disk.
    Success,
    /// The job failed; the partial file (if any) has been removed.
    Failed(String),
    /// The job was not executed.
    Skipped(String),
}

impl fmt::Display for JobOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Failed(reason) => write!(f, "failed: {reason}"),
            Self::Skipped(reason) => write!(f, "skipped: {reason}"),
        }
    }
}

/// Result produced by a worker for exactly one job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobResult {
    /// The job this result belongs to.
    pub job: DownloadJob,
    /// What happened.
    pub outcome: JobOutcome,
    /// Bytes written to disk by the final attempt.
    pub bytes_transferred: u64,
    /// Number of fetch attempts made (0 when skipped).
    pub attempts: u32,
}

impl JobResult {
    pub(crate) fn success(job: DownloadJob, bytes_transferred: u64, attempts: u32) -> Self {
        Self {
            job,
            outcome: JobOutcome::Success,
            bytes_transferred,
            attempts,
        }
    }

    pub(crate) fn failed(job: DownloadJob, reason: impl Into<String>, attempts: u32) -> Self {
        Self {
            job,
            outcome: JobOutcome::Failed(reason.into()),
            bytes_transferred: 0,
            attempts,
        }
    }

    pub(crate) fn skipped(job: DownloadJob, reason: impl Into<String>) -> Self {
        Self {
            job,
            outcome: JobOutcome::Skipped(reason.into()),
            bytes_transferred: 0,
            attempts: 0,
        }
    }

    /// Returns true if the job completed successfully.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.outcome == JobOutcome::Success
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_outcome_display() {
        assert_eq!(JobOutcome::Success.to_string(), "success");
        assert_eq!(
            JobOutcome::Failed("HTTP 500".into()).to_string(),
            "failed: HTTP 500"
        );
        assert_eq!(
            JobOutcome::Skipped("cancelled".into()).to_string(),
            "skipped: cancelled"
        );
    }

    #[test]
    fn test_job_result_constructors() {
        let job = DownloadJob::new(0, "http://example.com/f/1", "a.txt", Some(3));

        let ok = JobResult::success(job.clone(), 3, 1);
        assert!(ok.is_success());
        assert_eq!(ok.bytes_transferred, 3);

        let failed = JobResult::failed(job.clone(), "boom", 2);
        assert!(!failed.is_success());
        assert_eq!(failed.attempts, 2);
        assert_eq!(failed.bytes_transferred, 0);

        let skipped = JobResult::skipped(job, "cancelled");
        assert_eq!(skipped.attempts, 0);
        assert_eq!(skipped.outcome, JobOutcome::Skipped("cancelled".into()));
    }
}
