//! Bricks Core Library
//!
//! This library downloads every file below a shared remote directory,
//! recreating the directory structure locally and fetching files with a
//! bounded number of parallel workers.
//!
//! # Architecture
//!
//! Data flows strictly downward: identifier, listing, flat job list,
//! concurrent execution, aggregated summary.
//!
//! - [`listing`] - Remote directory listings ([`ListingSource`], [`HttpListingClient`])
//! - [`flatten`] - Turns a directory tree into an ordered [`FlatPlan`]
//! - [`download`] - HTTP streaming client, retry policy and the [`WorkerPool`]
//! - [`downloader`] - The [`Downloader`] orchestrator and [`DownloadSummary`]
//! - [`source`] - Share-link parsing and destination resolution
//! - [`config`] - Validated runtime settings

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod download;
pub mod downloader;
pub mod flatten;
pub mod listing;
pub mod source;
mod user_agent;

// Re-export commonly used types
pub use config::{ConfigError, DEFAULT_CONCURRENCY, DownloaderConfig, MAX_CONCURRENCY};
pub use download::{
    DEFAULT_MAX_RETRIES, DownloadError, DownloadJob, FailureType, FileFetcher, HttpClient,
    JobOutcome, JobResult, RetryDecision, RetryPolicy, WorkerPool, classify_error,
};
pub use downloader::{
    DownloadSummary, Downloader, DownloaderError, JobFailure, Phase, SkippedJob,
};
pub use flatten::{FlatPlan, TraversalError, UnlistedNode, flatten};
pub use listing::{Children, HttpListingClient, ListingError, ListingSource, Node};
pub use source::{ShareLink, SourceError, parse_share_link, resolve_destination};
