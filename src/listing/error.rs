//! Error types for directory listing operations.

use thiserror::Error;

use crate::download::{FailureType, classify_http_status, classify_network_error};

/// Errors that can occur while fetching a directory listing.
#[derive(Debug, Error)]
pub enum ListingError {
    /// The directory identifier does not exist on the remote service.
    #[error("directory {id} not found (HTTP {status})")]
    NotFound {
        /// The identifier that was requested.
        id: String,
        /// The HTTP status code returned (404, 400 or 410).
        status: u16,
    },

    /// Network-level error (DNS resolution, connection refused, TLS errors, etc.)
    #[error("network error listing directory {id}: {source}")]
    Network {
        /// The identifier that was requested.
        id: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// Listing request timed out.
    #[error("timeout listing directory {id}")]
    Timeout {
        /// The identifier that was requested.
        id: String,
    },

    /// Any other non-success HTTP response.
    #[error("HTTP {status} listing directory {id}")]
    HttpStatus {
        /// The identifier that was requested.
        id: String,
        /// The HTTP status code.
        status: u16,
    },

    /// The listing payload could not be understood.
    #[error("malformed listing for directory {id}: {reason}")]
    Parse {
        /// The identifier that was requested.
        id: String,
        /// What was wrong with the payload.
        reason: String,
    },

    /// The base URL cannot be used to build listing or file URLs.
    #[error("invalid base URL: {url}")]
    InvalidBaseUrl {
        /// The rejected base URL.
        url: String,
    },
}

impl ListingError {
    /// Creates a not-found error.
    pub fn not_found(id: impl Into<String>, status: u16) -> Self {
        Self::NotFound {
            id: id.into(),
            status,
        }
    }

    /// Creates a network error from a reqwest error.
    pub fn network(id: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            id: id.into(),
            source,
        }
    }

    /// Creates a timeout error.
    pub fn timeout(id: impl Into<String>) -> Self {
        Self::Timeout { id: id.into() }
    }

    /// Creates an HTTP status error.
    pub fn http_status(id: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            id: id.into(),
            status,
        }
    }

    /// Creates a parse error.
    pub fn parse(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Parse {
            id: id.into(),
            reason: reason.into(),
        }
    }

    /// Returns true if the identifier is missing remotely.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Classifies the error for retry decisions.
    ///
    /// Only transport failures, timeouts, 5xx and 429 responses are worth
    /// retrying; missing identifiers and malformed payloads are not.
    #[must_use]
    pub fn failure_type(&self) -> FailureType {
        match self {
            Self::Network { source, .. } => classify_network_error(source),
            Self::Timeout { .. } => FailureType::Transient,
            Self::HttpStatus { status, .. } => classify_http_status(*status),
            Self::NotFound { .. } | Self::Parse { .. } | Self::InvalidBaseUrl { .. } => {
                FailureType::Permanent
            }
        }
    }
}
