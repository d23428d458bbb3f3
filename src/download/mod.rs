//! HTTP download engine for streaming remote files to disk.
//!
//! This module provides the pieces the orchestrator drives once a directory
//! tree has been flattened into [`DownloadJob`]s.
//!
//! # Features
//!
//! - Streaming downloads (memory-efficient for large files)
//! - Configurable timeouts (30s connect, 5min read by default)
//! - Structured error types with full context
//! - Partial files are removed when a transfer fails or is cancelled
//! - Fixed-size [`WorkerPool`] with a strict in-flight bound
//!
//! # Example
//!
//! ```no_run
//! use bricks_core::download::HttpClient;
//! use std::path::Path;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = HttpClient::new();
//! let bytes = client
//!     .download_to_path("https://example.com/f/1234", Path::new("./movie.mkv"), None)
//!     .await?;
//! println!("Downloaded {bytes} bytes");
//! # Ok(())
//! # }
//! ```

mod client;
pub(crate) mod constants;
mod error;
mod job;
mod pool;
mod retry;

pub use client::HttpClient;
pub use error::DownloadError;
pub use job::{DownloadJob, JobOutcome, JobResult};
pub use pool::{FileFetcher, WorkerPool};
pub use retry::{
    DEFAULT_MAX_RETRIES, FailureType, RetryDecision, RetryPolicy, classify_error,
    classify_http_status,
};
pub(crate) use pool::PARTIAL_SUFFIX;
pub(crate) use retry::classify_network_error;

// Note: we do NOT define module-local Result aliases.
// Use `Result<T, DownloadError>` explicitly in function signatures.
