//! Fixed-size worker pool for concurrent file downloads.
//!
//! The pool coordinates concurrent downloads with a bounded set of worker
//! tasks, with optional retry on transient failures using exponential
//! backoff.
//!
//! # Concurrency Model
//!
//! - `min(concurrency, jobs)` workers are spawned on a [`JoinSet`]
//! - Workers pull jobs one at a time from a shared queue (one consumer per pull)
//! - Each worker finishes its current job before pulling the next, so at most
//!   `concurrency` fetches are ever in flight
//! - Results travel over a channel to a single collector
//!
//! # Cancellation
//!
//! When the [`CancellationToken`] fires, workers stop pulling, in-flight
//! fetches are interrupted and their partial files removed, and jobs still in
//! the queue are reported as skipped.

use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::retry::{RetryDecision, RetryPolicy, classify_error};
use super::{DownloadError, DownloadJob, HttpClient, JobResult};
use crate::config::{ConfigError, validate_concurrency};

/// Reason recorded for jobs that never ran because the run was cancelled.
pub(crate) const CANCELLED_REASON: &str = "cancelled";

/// Reason recorded for jobs whose destination already holds the full file.
pub(crate) const ALREADY_PRESENT_REASON: &str = "already present";

/// Suffix of the temporary file a download streams into before being renamed.
///
/// Remote names ending in it are refused so two jobs never share a temporary file.
pub(crate) const PARTIAL_SUFFIX: &str = ".bricks.part";

/// Fetches one remote file into a local path.
///
/// [`HttpClient`] is the production implementation; tests substitute
/// instrumented fakes.
#[async_trait]
pub trait FileFetcher: Send + Sync {
    /// Streams `url` into `destination`, returning the number of bytes written.
    ///
    /// Implementations must not leave a partial file behind on error.
    async fn fetch(
        &self,
        url: &str,
        destination: &Path,
        expected_size: Option<u64>,
    ) -> Result<u64, DownloadError>;
}

#[async_trait]
impl FileFetcher for HttpClient {
    async fn fetch(
        &self,
        url: &str,
        destination: &Path,
        expected_size: Option<u64>,
    ) -> Result<u64, DownloadError> {
        self.download_to_path(url, destination, expected_size).await
    }
}

/// Bounded pool of download workers.
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use std::sync::Arc;
/// use bricks_core::download::{DownloadJob, HttpClient, RetryPolicy, WorkerPool};
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = WorkerPool::new(Arc::new(HttpClient::new()), 3, RetryPolicy::no_retry())?;
/// let jobs = vec![DownloadJob::new(0, "https://example.com/f/1", "a.txt", None)];
/// let results = pool.run(Path::new("./out"), jobs, &CancellationToken::new()).await;
/// assert_eq!(results.len(), 1);
/// # Ok(())
/// # }
/// ```
pub struct WorkerPool {
    fetcher: Arc<dyn FileFetcher>,
    concurrency: usize,
    retry_policy: RetryPolicy,
    skip_existing: bool,
}

impl fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerPool")
            .field("concurrency", &self.concurrency)
            .field("retry_policy", &self.retry_policy)
            .field("skip_existing", &self.skip_existing)
            .finish_non_exhaustive()
    }
}

impl WorkerPool {
    /// Creates a pool running at most `concurrency` downloads at a time.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidConcurrency`] if `concurrency` is zero or
    /// above [`MAX_CONCURRENCY`](crate::config::MAX_CONCURRENCY).
    #[instrument(level = "debug", skip(fetcher, retry_policy))]
    pub fn new(
        fetcher: Arc<dyn FileFetcher>,
        concurrency: usize,
        retry_policy: RetryPolicy,
    ) -> Result<Self, ConfigError> {
        let concurrency = validate_concurrency(concurrency)?;

        debug!(
            concurrency,
            max_attempts = retry_policy.max_attempts(),
            "creating worker pool"
        );

        Ok(Self {
            fetcher,
            concurrency,
            retry_policy,
            skip_existing: false,
        })
    }

    /// Skips jobs whose destination already exists with the expected size.
    #[must_use]
    pub fn with_skip_existing(mut self, skip_existing: bool) -> Self {
        self.skip_existing = skip_existing;
        self
    }

    /// Returns the configured concurrency limit.
    #[must_use]
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Runs every job to completion and returns one result per job.
    ///
    /// Destinations are resolved against `root`. Results are sorted by job
    /// index (input order), independent of completion order.
    ///
    /// Individual failures never stop sibling jobs; they are reported in the
    /// returned results.
    #[instrument(skip(self, root, jobs, cancel), fields(root = %root.display(), jobs = jobs.len(), concurrency = self.concurrency))]
    pub async fn run(
        &self,
        root: &Path,
        jobs: Vec<DownloadJob>,
        cancel: &CancellationToken,
    ) -> Vec<JobResult> {
        let total = jobs.len();
        if total == 0 {
            debug!("no jobs to run");
            return Vec::new();
        }

        let all_jobs = jobs.clone();
        let queue = Arc::new(JobQueue::new(jobs));
        let context = Arc::new(WorkerContext {
            fetcher: Arc::clone(&self.fetcher),
            retry_policy: self.retry_policy.clone(),
            skip_existing: self.skip_existing,
            root: root.to_path_buf(),
        });

        let (result_tx, mut result_rx) = mpsc::unbounded_channel();
        let worker_count = self.concurrency.min(total);
        let mut workers = JoinSet::new();

        info!(workers = worker_count, "starting download workers");

        for worker_id in 0..worker_count {
            workers.spawn(worker_loop(
                worker_id,
                Arc::clone(&queue),
                Arc::clone(&context),
                result_tx.clone(),
                cancel.clone(),
            ));
        }
        // Collector ends once every worker has dropped its sender.
        drop(result_tx);

        let mut results = Vec::with_capacity(total);
        while let Some(result) = result_rx.recv().await {
            results.push(result);
        }

        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                warn!(error = %e, "download worker panicked");
            }
        }

        let leftover_reason = if cancel.is_cancelled() {
            CANCELLED_REASON
        } else {
            "not dispatched"
        };
        for job in queue.drain() {
            results.push(JobResult::skipped(job, leftover_reason));
        }

        let reported: HashSet<usize> = results.iter().map(|r| r.job.index).collect();
        for job in all_jobs {
            if !reported.contains(&job.index) {
                results.push(JobResult::failed(
                    job,
                    "download worker stopped unexpectedly",
                    0,
                ));
            }
        }

        results.sort_by_key(|r| r.job.index);

        info!(
            succeeded = results.iter().filter(|r| r.is_success()).count(),
            total,
            cancelled = cancel.is_cancelled(),
            "worker pool finished"
        );

        results
    }
}

/// Shared, exhaustible job queue. Each pull hands a job to exactly one worker.
struct JobQueue {
    jobs: Mutex<VecDeque<DownloadJob>>,
}

impl JobQueue {
    fn new(jobs: Vec<DownloadJob>) -> Self {
        Self {
            jobs: Mutex::new(jobs.into()),
        }
    }

    fn pull(&self) -> Option<DownloadJob> {
        self.jobs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
    }

    fn drain(&self) -> Vec<DownloadJob> {
        self.jobs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect()
    }
}

/// Read-only state every worker needs.
struct WorkerContext {
    fetcher: Arc<dyn FileFetcher>,
    retry_policy: RetryPolicy,
    skip_existing: bool,
    root: PathBuf,
}

async fn worker_loop(
    worker_id: usize,
    queue: Arc<JobQueue>,
    context: Arc<WorkerContext>,
    results: mpsc::UnboundedSender<JobResult>,
    cancel: CancellationToken,
) {
    debug!(worker_id, "worker started");

    while !cancel.is_cancelled() {
        let Some(job) = queue.pull() else {
            break;
        };

        let result = context.execute(job, &cancel).await;

        if results.send(result).is_err() {
            warn!(worker_id, "result collector closed; stopping worker");
            break;
        }
    }

    debug!(worker_id, "worker finished");
}

impl WorkerContext {
    /// Executes one job, retrying transient failures per the retry policy.
    #[instrument(skip(self, job, cancel), fields(job = job.index, url = %job.url))]
    async fn execute(&self, job: DownloadJob, cancel: &CancellationToken) -> JobResult {
        if cancel.is_cancelled() {
            return JobResult::skipped(job, CANCELLED_REASON);
        }

        if uses_partial_suffix(&job.destination) {
            warn!(path = %job.destination.display(), "destination uses the temporary file suffix");
            return JobResult::failed(
                job,
                format!("file name uses reserved suffix {PARTIAL_SUFFIX}"),
                0,
            );
        }

        let destination = self.root.join(&job.destination);
        let partial = partial_path(&destination);

        if self.skip_existing && is_already_present(&destination, job.expected_size).await {
            debug!(path = %destination.display(), "file already present, skipping");
            return JobResult::skipped(job, ALREADY_PRESENT_REASON);
        }

        let mut attempt = 0u32;

        loop {
            attempt += 1;
            debug!(attempt, "attempting download");

            let outcome = tokio::select! {
                biased;

                () = cancel.cancelled() => Err(DownloadError::cancelled(&job.url)),

                result = self.fetch_once(&job, &destination, &partial) => result,
            };

            let error = match outcome {
                Ok(bytes) => {
                    info!(path = %destination.display(), bytes, attempt, "job completed");
                    return JobResult::success(job, bytes, attempt);
                }
                Err(error) => error,
            };

            discard_partial(&partial).await;

            if error.is_cancelled() {
                warn!(path = %destination.display(), "download interrupted by cancellation");
                return JobResult::failed(job, error.to_string(), attempt);
            }

            match self.retry_policy.should_retry(classify_error(&error), attempt) {
                RetryDecision::Retry {
                    delay,
                    attempt: next_attempt,
                } => {
                    info!(
                        attempt = next_attempt,
                        max_attempts = self.retry_policy.max_attempts(),
                        delay_ms = delay.as_millis(),
                        error = %error,
                        "retrying download"
                    );
                    tokio::select! {
                        biased;

                        () = cancel.cancelled() => {
                            let reason = DownloadError::cancelled(&job.url).to_string();
                            return JobResult::failed(job, reason, attempt);
                        }

                        () = tokio::time::sleep(delay) => {}
                    }
                }
                RetryDecision::DoNotRetry { reason } => {
                    warn!(
                        error = %error,
                        attempts = attempt,
                        %reason,
                        "download failed"
                    );
                    return JobResult::failed(job, error.to_string(), attempt);
                }
            }
        }
    }

    /// Single attempt: ensure the parent directory, stream into the partial
    /// file, then move it into place.
    async fn fetch_once(
        &self,
        job: &DownloadJob,
        destination: &Path,
        partial: &Path,
    ) -> Result<u64, DownloadError> {
        if let Some(parent) = destination.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| DownloadError::io(parent, e))?;
        }

        let bytes = self
            .fetcher
            .fetch(&job.url, partial, job.expected_size)
            .await?;

        tokio::fs::rename(partial, destination)
            .await
            .map_err(|e| DownloadError::io(destination, e))?;

        Ok(bytes)
    }
}

fn uses_partial_suffix(destination: &Path) -> bool {
    destination
        .file_name()
        .is_some_and(|name| name.to_string_lossy().ends_with(PARTIAL_SUFFIX))
}

fn partial_path(destination: &Path) -> PathBuf {
    let mut name = destination
        .file_name()
        .map(std::ffi::OsStr::to_os_string)
        .unwrap_or_default();
    name.push(PARTIAL_SUFFIX);
    destination.with_file_name(name)
}

async fn is_already_present(destination: &Path, expected_size: Option<u64>) -> bool {
    let Some(expected) = expected_size else {
        return false;
    };
    tokio::fs::metadata(destination)
        .await
        .is_ok_and(|meta| meta.is_file() && meta.len() == expected)
}

async fn discard_partial(partial: &Path) {
    match tokio::fs::remove_file(partial).await {
        Ok(()) => debug!(path = %partial.display(), "removed partial file"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %partial.display(), error = %e, "failed to remove partial file"),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::download::JobOutcome;

    struct NeverCalled;

    #[async_trait]
    impl FileFetcher for NeverCalled {
        async fn fetch(
            &self,
            url: &str,
            _destination: &Path,
            _expected_size: Option<u64>,
        ) -> Result<u64, DownloadError> {
            panic!("fetch should not be called for {url}");
        }
    }

    fn pool(concurrency: usize) -> Result<WorkerPool, ConfigError> {
        WorkerPool::new(Arc::new(NeverCalled), concurrency, RetryPolicy::no_retry())
    }

    #[test]
    fn test_pool_new_valid_concurrency() {
        assert_eq!(pool(1).unwrap().concurrency(), 1);
        assert_eq!(pool(5).unwrap().concurrency(), 5);
    }

    #[test]
    fn test_pool_new_rejects_zero_and_too_high() {
        assert!(matches!(
            pool(0),
            Err(ConfigError::InvalidConcurrency { value: 0 })
        ));
        assert!(matches!(
            pool(6),
            Err(ConfigError::InvalidConcurrency { value: 6 })
        ));
    }

    #[test]
    fn test_partial_path_appends_suffix() {
        let partial = partial_path(Path::new("/tmp/out/b/c.txt"));
        assert_eq!(partial, PathBuf::from("/tmp/out/b/c.txt.bricks.part"));
    }

    #[test]
    fn test_job_queue_hands_out_each_job_once() {
        let queue = JobQueue::new(vec![
            DownloadJob::new(0, "u0", "a", None),
            DownloadJob::new(1, "u1", "b", None),
        ]);
        assert_eq!(queue.pull().unwrap().index, 0);
        assert_eq!(queue.pull().unwrap().index, 1);
        assert!(queue.pull().is_none());
        assert!(queue.drain().is_empty());
    }

    #[tokio::test]
    async fn test_run_with_no_jobs_returns_empty() {
        let temp = tempfile::TempDir::new().unwrap();
        let results = pool(3)
            .unwrap()
            .run(temp.path(), Vec::new(), &CancellationToken::new())
            .await;
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_before_start_skips_everything() {
        let temp = tempfile::TempDir::new().unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let jobs = (0..4)
            .map(|i| DownloadJob::new(i, format!("u{i}"), format!("f{i}"), None))
            .collect();
        let results = pool(2).unwrap().run(temp.path(), jobs, &cancel).await;

        assert_eq!(results.len(), 4);
        assert!(
            results
                .iter()
                .all(|r| r.outcome == JobOutcome::Skipped(CANCELLED_REASON.to_string()))
        );
        assert_eq!(
            results.iter().map(|r| r.job.index).collect::<Vec<_>>(),
            vec![0, 1, 2, 3]
        );
    }

    #[tokio::test]
    async fn test_skip_existing_with_matching_size() {
        let temp = tempfile::TempDir::new().unwrap();
        std::fs::write(temp.path().join("a.txt"), b"abc").unwrap();

        let jobs = vec![DownloadJob::new(0, "u0", "a.txt", Some(3))];
        let results = pool(1)
            .unwrap()
            .with_skip_existing(true)
            .run(temp.path(), jobs, &CancellationToken::new())
            .await;

        assert_eq!(
            results[0].outcome,
            JobOutcome::Skipped(ALREADY_PRESENT_REASON.to_string())
        );
    }
}
