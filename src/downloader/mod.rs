//! Top-level orchestration of a download run.
//!
//! A run moves through [`Phase`]s in order: the root directory is resolved,
//! the tree is flattened into jobs, local directories are prepared, the
//! [`WorkerPool`] downloads every file, and the results are aggregated into
//! a [`DownloadSummary`]. Nothing is written to disk before the whole tree
//! has been resolved and validated.

mod summary;

pub use summary::{DownloadSummary, JobFailure, SkippedJob};

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use crate::config::{ConfigError, DownloaderConfig, validate_concurrency};
use crate::download::{FileFetcher, HttpClient, WorkerPool};
use crate::flatten::{TraversalError, flatten};
use crate::listing::{HttpListingClient, ListingError, ListingSource, Node};

/// Stage of a download run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Fetching the root listing.
    Resolving,
    /// Walking the tree into a flat plan.
    Flattening,
    /// Creating directories under the destination.
    Preparing,
    /// Running the worker pool.
    Downloading,
    /// Results collected into the summary.
    Aggregated,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Resolving => "resolving",
            Self::Flattening => "flattening",
            Self::Preparing => "preparing",
            Self::Downloading => "downloading",
            Self::Aggregated => "aggregated",
        };
        f.write_str(name)
    }
}

/// Errors that abort a whole run.
///
/// Failures of individual files are not errors; they are reported in the
/// [`DownloadSummary`].
#[derive(Debug, Error)]
pub enum DownloaderError {
    /// Concurrency outside `1..=MAX_CONCURRENCY`.
    #[error(
        "invalid concurrency value {value}: must be between 1 and {}",
        crate::config::MAX_CONCURRENCY
    )]
    InvalidConcurrency {
        /// The rejected value.
        value: usize,
    },

    /// Invalid configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The HTTP client could not be built.
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),

    /// The base URL cannot address the remote service.
    #[error("invalid base URL: {url}")]
    InvalidBaseUrl {
        /// The rejected base URL.
        url: String,
    },

    /// The root directory could not be fetched.
    #[error("failed to resolve directory {id}: {source}")]
    Resolution {
        /// The requested identifier.
        id: String,
        /// The listing failure.
        #[source]
        source: ListingError,
    },

    /// The identifier points at a file.
    #[error("{id} is a file, not a directory")]
    RootNotDirectory {
        /// The requested identifier.
        id: String,
    },

    /// The tree contains unsafe or conflicting names.
    #[error(transparent)]
    Traversal(#[from] TraversalError),

    /// A local directory could not be created.
    #[error("failed to create {}: {source}", path.display())]
    Io {
        /// The directory that failed.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The run was cancelled before any download started.
    #[error("cancelled while {phase}")]
    Cancelled {
        /// The phase that was interrupted.
        phase: Phase,
    },
}

/// Downloads a remote directory tree into a local directory.
///
/// # Example
///
/// ```no_run
/// use bricks_core::{Downloader, DownloaderConfig};
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let downloader = Downloader::new("https://example.com", DownloaderConfig::default())?;
/// let summary = downloader
///     .run("5f1c2d2e-8f4b-4a4e-9d8c-0a1b2c3d4e5f", Path::new("./downloads"), 3)
///     .await?;
/// println!("{summary}");
/// # Ok(())
/// # }
/// ```
pub struct Downloader {
    listing: Arc<dyn ListingSource>,
    fetcher: Arc<dyn FileFetcher>,
    config: DownloaderConfig,
}

impl fmt::Debug for Downloader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Downloader")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Downloader {
    /// Creates a downloader talking to the service at `base_url`.
    ///
    /// One [`HttpClient`] is built and shared by listing and file requests.
    ///
    /// # Errors
    ///
    /// Returns [`DownloaderError::Config`] for invalid settings,
    /// [`DownloaderError::InvalidBaseUrl`] for an unusable base URL, or
    /// [`DownloaderError::HttpClient`] if the client cannot be built.
    pub fn new(base_url: &str, config: DownloaderConfig) -> Result<Self, DownloaderError> {
        config.validate()?;

        let client =
            HttpClient::try_new_with_timeouts(config.connect_timeout_secs(), config.read_timeout_secs())
                .map_err(DownloaderError::HttpClient)?;
        let listing =
            HttpListingClient::new(client.clone(), base_url, config.listing_retry().clone())
                .map_err(|_| DownloaderError::InvalidBaseUrl {
                    url: base_url.to_string(),
                })?;

        Ok(Self::with_parts(Arc::new(listing), Arc::new(client), config))
    }

    /// Assembles a downloader from explicit listing and fetching backends.
    #[must_use]
    pub fn with_parts(
        listing: Arc<dyn ListingSource>,
        fetcher: Arc<dyn FileFetcher>,
        config: DownloaderConfig,
    ) -> Self {
        Self {
            listing,
            fetcher,
            config,
        }
    }

    /// Returns the configuration this downloader was built with.
    #[must_use]
    pub fn config(&self) -> &DownloaderConfig {
        &self.config
    }

    /// Downloads directory `directory_id` into `destination`.
    ///
    /// See [`run_with_cancel`](Self::run_with_cancel).
    ///
    /// # Errors
    ///
    /// Same as [`run_with_cancel`](Self::run_with_cancel).
    pub async fn run(
        &self,
        directory_id: &str,
        destination: &Path,
        concurrency: usize,
    ) -> Result<DownloadSummary, DownloaderError> {
        self.run_with_cancel(directory_id, destination, concurrency, CancellationToken::new())
            .await
    }

    /// Downloads directory `directory_id` into `destination`, stopping early
    /// when `cancel` fires.
    ///
    /// Files are placed directly under `destination`, mirroring the remote
    /// layout below the root. Cancellation during the download phase still
    /// yields a summary with [`DownloadSummary::is_cancelled`] set.
    ///
    /// # Errors
    ///
    /// - [`DownloaderError::InvalidConcurrency`] before any network I/O
    /// - [`DownloaderError::Resolution`] / [`DownloaderError::RootNotDirectory`]
    ///   when the root cannot be used; nothing is created on disk
    /// - [`DownloaderError::Traversal`] for unsafe trees; nothing is created
    /// - [`DownloaderError::Io`] when a local directory cannot be created
    /// - [`DownloaderError::Cancelled`] when cancelled before downloading
    #[instrument(skip(self, destination, cancel), fields(destination = %destination.display()))]
    pub async fn run_with_cancel(
        &self,
        directory_id: &str,
        destination: &Path,
        concurrency: usize,
        cancel: CancellationToken,
    ) -> Result<DownloadSummary, DownloaderError> {
        let concurrency = validate_concurrency(concurrency)
            .map_err(|_| DownloaderError::InvalidConcurrency { value: concurrency })?;

        info!(phase = %Phase::Resolving, id = directory_id, "resolving root directory");
        let root = tokio::select! {
            biased;

            () = cancel.cancelled() => return Err(DownloaderError::Cancelled { phase: Phase::Resolving }),

            fetched = self.listing.fetch_node(directory_id) => fetched.map_err(|source| DownloaderError::Resolution {
                id: directory_id.to_string(),
                source,
            })?,
        };
        if let Node::File { .. } = root {
            return Err(DownloaderError::RootNotDirectory {
                id: directory_id.to_string(),
            });
        }

        info!(phase = %Phase::Flattening, name = root.name(), "flattening directory tree");
        let plan = tokio::select! {
            biased;

            () = cancel.cancelled() => return Err(DownloaderError::Cancelled { phase: Phase::Flattening }),

            flattened = flatten(root, self.listing.as_ref()) => flattened?,
        };

        info!(
            phase = %Phase::Preparing,
            jobs = plan.jobs.len(),
            directories = plan.directories.len(),
            "creating local directories"
        );
        if cancel.is_cancelled() {
            return Err(DownloaderError::Cancelled {
                phase: Phase::Preparing,
            });
        }
        create_dir(destination).await?;
        for directory in &plan.directories {
            create_dir(&destination.join(directory)).await?;
        }

        info!(phase = %Phase::Downloading, concurrency, "downloading files");
        let pool = WorkerPool::new(
            Arc::clone(&self.fetcher),
            concurrency,
            self.config.job_retry().clone(),
        )?
        .with_skip_existing(self.config.skip_existing());
        let results = pool.run(destination, plan.jobs, &cancel).await;

        let summary = DownloadSummary::from_results(results, plan.unlisted, cancel.is_cancelled());
        info!(
            phase = %Phase::Aggregated,
            succeeded = summary.succeeded(),
            failed = summary.failed_count(),
            skipped = summary.skipped_count(),
            unlisted = summary.unlisted().len(),
            bytes = summary.bytes_transferred(),
            cancelled = summary.is_cancelled(),
            "run finished"
        );

        Ok(summary)
    }
}

async fn create_dir(path: &Path) -> Result<(), DownloaderError> {
    debug!(path = %path.display(), "ensuring directory");
    tokio::fs::create_dir_all(path)
        .await
        .map_err(|source| DownloaderError::Io {
            path: path.to_path_buf(),
            source,
        })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use async_trait::async_trait;

    use super::*;
    use crate::download::DownloadError;

    struct MapSource(HashMap<String, Node>);

    #[async_trait]
    impl ListingSource for MapSource {
        async fn fetch_node(&self, id: &str) -> Result<Node, ListingError> {
            self.0
                .get(id)
                .cloned()
                .ok_or_else(|| ListingError::not_found(id, 404))
        }
    }

    /// Writes the URL itself as the file body.
    struct EchoFetcher;

    #[async_trait]
    impl FileFetcher for EchoFetcher {
        async fn fetch(
            &self,
            url: &str,
            destination: &Path,
            _expected_size: Option<u64>,
        ) -> Result<u64, DownloadError> {
            tokio::fs::write(destination, url)
                .await
                .map_err(|e| DownloadError::io(destination, e))?;
            Ok(url.len() as u64)
        }
    }

    fn downloader(nodes: Vec<Node>) -> Downloader {
        let map = nodes
            .into_iter()
            .map(|node| (node.id().to_string(), node))
            .collect();
        Downloader::with_parts(
            Arc::new(MapSource(map)),
            Arc::new(EchoFetcher),
            DownloaderConfig::default(),
        )
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(Phase::Resolving.to_string(), "resolving");
        assert_eq!(Phase::Aggregated.to_string(), "aggregated");
    }

    #[tokio::test]
    async fn test_rejects_invalid_concurrency_before_listing() {
        let dir = tempfile::tempdir().unwrap();
        let downloader = downloader(Vec::new());

        for value in [0, crate::config::MAX_CONCURRENCY + 1] {
            let err = downloader.run("root", dir.path(), value).await.unwrap_err();
            assert!(
                matches!(err, DownloaderError::InvalidConcurrency { value: v } if v == value),
                "unexpected: {err:?}"
            );
        }
    }

    #[tokio::test]
    async fn test_file_root_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let downloader = downloader(vec![Node::file("f", "a.txt", "http://h/f/f", None)]);

        let err = downloader.run("f", dir.path(), 1).await.unwrap_err();

        assert!(matches!(err, DownloaderError::RootNotDirectory { .. }));
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let dir = tempfile::tempdir().unwrap();
        let downloader = downloader(vec![Node::directory("root", "r", Vec::new())]);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = downloader
            .run_with_cancel("root", dir.path(), 1, cancel)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DownloaderError::Cancelled {
                phase: Phase::Resolving
            }
        ));
    }

    #[tokio::test]
    async fn test_places_files_directly_under_destination() {
        let dir = tempfile::tempdir().unwrap();
        let downloader = downloader(vec![Node::directory(
            "root",
            "share",
            vec![
                Node::file("f1", "a.txt", "http://h/f/f1", None),
                Node::directory("d1", "empty", Vec::new()),
            ],
        )]);

        let summary = downloader.run("root", dir.path(), 2).await.unwrap();

        assert!(summary.is_complete());
        assert_eq!(summary.succeeded(), 1);
        assert_eq!(
            std::fs::read_to_string(dir.path().join("a.txt")).unwrap(),
            "http://h/f/f1"
        );
        assert!(dir.path().join("empty").is_dir());
        assert!(!dir.path().join("share").exists());
    }
}
