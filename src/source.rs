//! Share-link parsing and destination resolution.
//!
//! A share link looks like `https://host[:port]/<directory-uuid>`. The part
//! before the path addresses the service; the path is the directory
//! identifier.

use std::path::{Path, PathBuf};

use thiserror::Error;
use url::Url;
use uuid::Uuid;

/// Errors from interpreting user input.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("invalid URL {input:?}: {reason}")]
    InvalidUrl { input: String, reason: String },

    #[error("invalid directory identifier {identifier:?}: expected a UUID")]
    InvalidIdentifier { identifier: String },

    #[error("destination {} does not exist", path.display())]
    DestinationMissing { path: PathBuf },

    #[error("destination {} is not a directory", path.display())]
    DestinationNotDirectory { path: PathBuf },

    #[error("cannot access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A parsed share link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareLink {
    /// `scheme://host[:port]` of the service.
    pub base_url: String,
    /// Identifier of the shared directory.
    pub directory_id: String,
}

/// Parses a share link into the service base URL and directory identifier.
///
/// Surrounding whitespace is ignored, as are leading and trailing `/` in the
/// path. Query strings and fragments are dropped.
///
/// # Errors
///
/// - [`SourceError::InvalidUrl`] if the input is not an http(s) URL with a host
/// - [`SourceError::InvalidIdentifier`] if the path is not a UUID
pub fn parse_share_link(raw: &str) -> Result<ShareLink, SourceError> {
    let input = raw.trim();
    let invalid = |reason: &str| SourceError::InvalidUrl {
        input: input.to_string(),
        reason: reason.to_string(),
    };

    let url = Url::parse(input).map_err(|e| invalid(&e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid("scheme must be http or https"));
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(invalid("missing host"));
    }

    let identifier = url.path().trim_matches('/');
    if Uuid::parse_str(identifier).is_err() {
        return Err(SourceError::InvalidIdentifier {
            identifier: identifier.to_string(),
        });
    }

    Ok(ShareLink {
        base_url: url.origin().ascii_serialization(),
        directory_id: identifier.to_string(),
    })
}

/// Resolves `raw` to an absolute path of an existing directory.
///
/// # Errors
///
/// - [`SourceError::DestinationMissing`] if nothing exists at the path
/// - [`SourceError::DestinationNotDirectory`] if it is not a directory
/// - [`SourceError::Io`] if the path cannot be inspected
pub fn resolve_destination(raw: &Path) -> Result<PathBuf, SourceError> {
    let path = std::path::absolute(raw).map_err(|source| SourceError::Io {
        path: raw.to_path_buf(),
        source,
    })?;

    match std::fs::metadata(&path) {
        Ok(metadata) if metadata.is_dir() => Ok(path),
        Ok(_) => Err(SourceError::DestinationNotDirectory { path }),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(SourceError::DestinationMissing { path })
        }
        Err(source) => Err(SourceError::Io { path, source }),
    }
}
