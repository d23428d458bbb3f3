//! Aggregated outcome of a download run.

use std::fmt;

use crate::download::{DownloadJob, JobOutcome, JobResult};
use crate::flatten::UnlistedNode;

/// A job that did not complete, with the reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobFailure {
    /// The failed job.
    pub job: DownloadJob,
    /// Human-readable cause.
    pub reason: String,
}

/// A job that was not executed, with the reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedJob {
    /// The skipped job.
    pub job: DownloadJob,
    /// Why it was skipped (`"already present"`, `"cancelled"`, ...).
    pub reason: String,
}

/// Final report of a [`Downloader`](super::Downloader) run.
///
/// Failures and skips are listed in input order. The summary is built once
/// from the pool's results and never changes afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadSummary {
    total_jobs: usize,
    succeeded: usize,
    failures: Vec<JobFailure>,
    skipped: Vec<SkippedJob>,
    unlisted: Vec<UnlistedNode>,
    bytes_transferred: u64,
    cancelled: bool,
}

impl DownloadSummary {
    pub(crate) fn from_results(
        mut results: Vec<JobResult>,
        unlisted: Vec<UnlistedNode>,
        cancelled: bool,
    ) -> Self {
        let total_jobs = results.len();
        let mut succeeded = 0;
        let mut bytes_transferred = 0;
        let mut failures = Vec::new();
        let mut skipped = Vec::new();

        results.sort_by_key(|result| result.job.index);

        for result in results {
            bytes_transferred += result.bytes_transferred;
            match result.outcome {
                JobOutcome::Success => succeeded += 1,
                JobOutcome::Failed(reason) => failures.push(JobFailure {
                    job: result.job,
                    reason,
                }),
                JobOutcome::Skipped(reason) => skipped.push(SkippedJob {
                    job: result.job,
                    reason,
                }),
            }
        }

        Self {
            total_jobs,
            succeeded,
            failures,
            skipped,
            unlisted,
            bytes_transferred,
            cancelled,
        }
    }

    /// Number of jobs in the plan.
    #[must_use]
    pub fn total_jobs(&self) -> usize {
        self.total_jobs
    }

    /// Number of files written.
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.succeeded
    }

    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.failures.len()
    }

    #[must_use]
    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }

    /// Failed jobs, in input order.
    #[must_use]
    pub fn failures(&self) -> &[JobFailure] {
        &self.failures
    }

    /// Skipped jobs, in input order.
    #[must_use]
    pub fn skipped(&self) -> &[SkippedJob] {
        &self.skipped
    }

    /// Sub-directories whose contents could not be listed.
    #[must_use]
    pub fn unlisted(&self) -> &[UnlistedNode] {
        &self.unlisted
    }

    /// Total bytes written to disk.
    #[must_use]
    pub fn bytes_transferred(&self) -> u64 {
        self.bytes_transferred
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    /// True when nothing failed, nothing was left unlisted and the run was
    /// not cancelled. Files skipped because they were already present count
    /// as complete.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.cancelled && self.failures.is_empty() && self.unlisted.is_empty()
    }
}

impl fmt::Display for DownloadSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} files downloaded, {} failed, {} skipped, {} bytes",
            self.succeeded,
            self.total_jobs,
            self.failures.len(),
            self.skipped.len(),
            self.bytes_transferred
        )?;
        if !self.unlisted.is_empty() {
            write!(f, ", {} directories not listed", self.unlisted.len())?;
        }
        if self.cancelled {
            write!(f, " (cancelled)")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn job(index: usize) -> DownloadJob {
        DownloadJob::new(index, format!("http://host/f/{index}"), format!("{index}.bin"), None)
    }

    #[test]
    fn test_counts_and_order() {
        let results = vec![
            JobResult::failed(job(4), "boom", 1),
            JobResult::success(job(0), 10, 1),
            JobResult::skipped(job(3), "already present"),
            JobResult::failed(job(2), "HTTP 500", 1),
            JobResult::success(job(1), 5, 2),
        ];

        let summary = DownloadSummary::from_results(results, Vec::new(), false);

        assert_eq!(summary.total_jobs(), 5);
        assert_eq!(summary.succeeded(), 2);
        assert_eq!(summary.failed_count(), 2);
        assert_eq!(summary.skipped_count(), 1);
        assert_eq!(summary.bytes_transferred(), 15);
        let failed: Vec<_> = summary.failures().iter().map(|f| f.job.index).collect();
        assert_eq!(failed, vec![2, 4]);
        assert_eq!(summary.failures()[0].reason, "HTTP 500");
        assert!(!summary.is_complete());
    }

    #[test]
    fn test_already_present_is_complete() {
        let results = vec![
            JobResult::success(job(0), 1, 1),
            JobResult::skipped(job(1), "already present"),
        ];
        let summary = DownloadSummary::from_results(results, Vec::new(), false);
        assert!(summary.is_complete());
        assert_eq!(
            summary.to_string(),
            "1/2 files downloaded, 0 failed, 1 skipped, 1 bytes"
        );
    }

    #[test]
    fn test_unlisted_and_cancelled_are_incomplete() {
        let unlisted = vec![UnlistedNode {
            path: PathBuf::from("lost"),
            id: "x".to_string(),
            reason: "HTTP 503".to_string(),
        }];
        let summary = DownloadSummary::from_results(Vec::new(), unlisted, false);
        assert!(!summary.is_complete());
        assert!(summary.to_string().contains("1 directories not listed"));

        let cancelled = DownloadSummary::from_results(Vec::new(), Vec::new(), true);
        assert!(!cancelled.is_complete());
        assert!(cancelled.to_string().ends_with("(cancelled)"));
    }
}
