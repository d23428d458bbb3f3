//! Remote directory listings.
//!
//! A listing describes one directory: its name and its immediate entries.
//! Nested directories come back unloaded ([`Children::Pending`]); the
//! flattener asks the [`ListingSource`] for them on demand.
//!
//! # Architecture
//!
//! - [`Node`] - Tagged tree node (file, or directory with loaded/pending children)
//! - [`ListingSource`] - Async trait the flattener and orchestrator depend on
//! - [`HttpListingClient`] - Production implementation over the shared [`HttpClient`](crate::HttpClient)
//! - [`ListingError`] - Not-found / network / parse taxonomy

mod client;
mod error;
mod payload;

pub use client::HttpListingClient;
pub use error::ListingError;

use async_trait::async_trait;

/// One entry of a remote directory tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// A downloadable file.
    File {
        /// Opaque remote identifier.
        id: String,
        /// Remote file name (not yet validated as a path segment).
        name: String,
        /// URL the file body is fetched from.
        url: String,
        /// Size in bytes, when the listing provides it.
        size: Option<u64>,
    },
    /// A directory.
    Directory {
        /// Opaque remote identifier.
        id: String,
        /// Remote directory name (not yet validated as a path segment).
        name: String,
        /// Entries of the directory, or a marker that they must be fetched.
        children: Children,
    },
}

/// Contents of a directory node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Children {
    /// Entries in listing order.
    Loaded(Vec<Node>),
    /// Not fetched yet; resolve with [`ListingSource::fetch_node`].
    Pending,
}

impl Node {
    /// Creates a file node.
    pub fn file(
        id: impl Into<String>,
        name: impl Into<String>,
        url: impl Into<String>,
        size: Option<u64>,
    ) -> Self {
        Self::File {
            id: id.into(),
            name: name.into(),
            url: url.into(),
            size,
        }
    }

    /// Creates a directory node whose entries are already known.
    pub fn directory(id: impl Into<String>, name: impl Into<String>, children: Vec<Node>) -> Self {
        Self::Directory {
            id: id.into(),
            name: name.into(),
            children: Children::Loaded(children),
        }
    }

    /// Creates a directory node whose entries still have to be fetched.
    pub fn pending_directory(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self::Directory {
            id: id.into(),
            name: name.into(),
            children: Children::Pending,
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::File { id, .. } | Self::Directory { id, .. } => id,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::File { name, .. } | Self::Directory { name, .. } => name,
        }
    }

    #[must_use]
    pub fn is_directory(&self) -> bool {
        matches!(self, Self::Directory { .. })
    }
}

/// Source of directory listings.
///
/// The orchestrator owns one implementation and lends it to the flattener,
/// which calls it once per pending directory.
#[async_trait]
pub trait ListingSource: Send + Sync {
    /// Fetches the directory identified by `id`, with its immediate entries.
    ///
    /// # Errors
    ///
    /// - [`ListingError::NotFound`] if the identifier does not exist
    /// - [`ListingError::Network`], [`ListingError::Timeout`] or
    ///   [`ListingError::HttpStatus`] when retries are exhausted
    /// - [`ListingError::Parse`] for malformed payloads
    async fn fetch_node(&self, id: &str) -> Result<Node, ListingError>;
}
