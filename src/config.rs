//! Runtime configuration for the downloader.
//!
//! Settings are plain values with validated ranges. The CLI builds a
//! [`DownloaderConfig`] from its flags; library users start from
//! [`DownloaderConfig::default`] and override with the `with_*` methods.

use thiserror::Error;

use crate::download::RetryPolicy;
use crate::download::constants::{CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS};

/// Minimum allowed concurrency value.
pub const MIN_CONCURRENCY: usize = 1;

/// Maximum allowed concurrency value.
pub const MAX_CONCURRENCY: usize = 5;

/// Default number of parallel file downloads.
pub const DEFAULT_CONCURRENCY: usize = 3;

/// Default attempts for a directory listing request (initial + retries).
pub const DEFAULT_LISTING_ATTEMPTS: u32 = 3;

/// Allowed range for HTTP timeouts, in seconds.
const TIMEOUT_RANGE_SECS: std::ops::RangeInclusive<u64> = 1..=3600;

/// Invalid configuration values.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Concurrency outside `MIN_CONCURRENCY..=MAX_CONCURRENCY`.
    #[error(
        "invalid concurrency value {value}: must be between {MIN_CONCURRENCY} and {MAX_CONCURRENCY}"
    )]
    InvalidConcurrency {
        /// The invalid value that was provided.
        value: usize,
    },

    /// Timeout outside the supported range.
    #[error("invalid value for `{field}`: {value}. Expected range: 1..=3600 seconds")]
    InvalidTimeout {
        /// Name of the offending setting.
        field: &'static str,
        /// The invalid value that was provided.
        value: u64,
    },
}

/// Checks a concurrency bound, returning it unchanged when valid.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidConcurrency`] for zero or values above
/// [`MAX_CONCURRENCY`].
pub fn validate_concurrency(value: usize) -> Result<usize, ConfigError> {
    if (MIN_CONCURRENCY..=MAX_CONCURRENCY).contains(&value) {
        Ok(value)
    } else {
        Err(ConfigError::InvalidConcurrency { value })
    }
}

/// Settings shared by every run of a [`Downloader`](crate::Downloader).
#[derive(Debug, Clone)]
pub struct DownloaderConfig {
    listing_retry: RetryPolicy,
    job_retry: RetryPolicy,
    skip_existing: bool,
    connect_timeout_secs: u64,
    read_timeout_secs: u64,
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        Self {
            listing_retry: RetryPolicy::with_max_attempts(DEFAULT_LISTING_ATTEMPTS),
            job_retry: RetryPolicy::no_retry(),
            skip_existing: true,
            connect_timeout_secs: CONNECT_TIMEOUT_SECS,
            read_timeout_secs: READ_TIMEOUT_SECS,
        }
    }
}

impl DownloaderConfig {
    /// Retry policy for directory listing requests.
    #[must_use]
    pub fn with_listing_retry(mut self, policy: RetryPolicy) -> Self {
        self.listing_retry = policy;
        self
    }

    /// Retry policy for individual file downloads. Retries are disabled by default.
    #[must_use]
    pub fn with_job_retry(mut self, policy: RetryPolicy) -> Self {
        self.job_retry = policy;
        self
    }

    /// Whether files already on disk with the advertised size are skipped.
    #[must_use]
    pub fn with_skip_existing(mut self, skip_existing: bool) -> Self {
        self.skip_existing = skip_existing;
        self
    }

    /// HTTP connect and read timeouts, in seconds.
    #[must_use]
    pub fn with_timeouts(mut self, connect_timeout_secs: u64, read_timeout_secs: u64) -> Self {
        self.connect_timeout_secs = connect_timeout_secs;
        self.read_timeout_secs = read_timeout_secs;
        self
    }

    #[must_use]
    pub fn listing_retry(&self) -> &RetryPolicy {
        &self.listing_retry
    }

    #[must_use]
    pub fn job_retry(&self) -> &RetryPolicy {
        &self.job_retry
    }

    #[must_use]
    pub fn skip_existing(&self) -> bool {
        self.skip_existing
    }

    #[must_use]
    pub fn connect_timeout_secs(&self) -> u64 {
        self.connect_timeout_secs
    }

    #[must_use]
    pub fn read_timeout_secs(&self) -> u64 {
        self.read_timeout_secs
    }

    /// Validates config values against runtime constraints.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidTimeout`] for timeouts outside 1..=3600 seconds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_timeout_secs("connect_timeout_secs", self.connect_timeout_secs)?;
        validate_timeout_secs("read_timeout_secs", self.read_timeout_secs)?;
        Ok(())
    }
}

fn validate_timeout_secs(field: &'static str, value: u64) -> Result<(), ConfigError> {
    if TIMEOUT_RANGE_SECS.contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::InvalidTimeout { field, value })
    }
}
