//! Flattening of a remote directory tree into download jobs.
//!
//! The walk is depth-first and keeps listing order, so the same tree always
//! yields the same [`FlatPlan`]. Pending directories are fetched through the
//! [`ListingSource`] before their entries are visited.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::download::{DownloadJob, PARTIAL_SUFFIX};
use crate::listing::{Children, ListingSource, Node};

/// Deepest directory nesting accepted below the root.
pub const MAX_TREE_DEPTH: usize = 64;

/// Errors that make a tree unusable as a download plan.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TraversalError {
    /// A remote name cannot be used as a single relative path segment.
    #[error("unsafe entry name {name:?} in {}", display_parent(parent))]
    UnsafeName {
        /// The rejected remote name.
        name: String,
        /// Relative path of the directory that contains the entry.
        parent: PathBuf,
    },

    /// Two entries map to the same destination.
    #[error("duplicate destination path {}", path.display())]
    DuplicatePath {
        /// The relative path produced twice.
        path: PathBuf,
    },

    /// Directory nesting exceeds [`MAX_TREE_DEPTH`].
    #[error("directory tree deeper than {limit} levels at {}", path.display())]
    TooDeep {
        /// Relative path where the limit was crossed.
        path: PathBuf,
        /// The configured limit.
        limit: usize,
    },

    /// The node handed to the flattener is a file.
    #[error("{id} is a file, not a directory")]
    RootNotDirectory {
        /// Identifier of the root node.
        id: String,
    },
}

fn display_parent(parent: &Path) -> String {
    if parent.as_os_str().is_empty() {
        "<root>".to_string()
    } else {
        parent.display().to_string()
    }
}

/// A sub-directory whose listing could not be fetched.
///
/// Its contents are missing from the plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnlistedNode {
    /// Relative path of the directory.
    pub path: PathBuf,
    /// Remote identifier of the directory.
    pub id: String,
    /// Why its listing failed.
    pub reason: String,
}

/// Output of [`flatten`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlatPlan {
    /// One job per file, in depth-first listing order, indexed from 0.
    pub jobs: Vec<DownloadJob>,
    /// Every directory below the root, parents before children.
    pub directories: Vec<PathBuf>,
    /// Sub-directories that could not be listed.
    pub unlisted: Vec<UnlistedNode>,
}

struct Frame {
    node: Node,
    path: PathBuf,
    depth: usize,
}

/// Flattens `root` into an ordered download plan.
///
/// Destinations are relative to the download root; the root's own name is
/// not part of them. A failed listing of a nested directory is recorded in
/// [`FlatPlan::unlisted`] and the walk continues.
///
/// # Errors
///
/// Returns [`TraversalError`] for unsafe names, duplicate destinations,
/// excessive depth, or a root that is not a directory. No partial plan is
/// returned.
#[instrument(skip_all, fields(root = %root.id()))]
pub async fn flatten(root: Node, source: &dyn ListingSource) -> Result<FlatPlan, TraversalError> {
    if let Node::File { id, .. } = root {
        return Err(TraversalError::RootNotDirectory { id });
    }

    let mut plan = FlatPlan::default();
    let mut seen: HashSet<PathBuf> = HashSet::new();
    let mut stack = vec![Frame {
        node: root,
        path: PathBuf::new(),
        depth: 0,
    }];

    while let Some(Frame { node, path, depth }) = stack.pop() {
        let (id, children) = match node {
            Node::File { url, size, .. } => {
                let index = plan.jobs.len();
                plan.jobs.push(DownloadJob::new(index, url, path, size));
                continue;
            }
            Node::Directory { id, children, .. } => (id, children),
        };

        let entries = match children {
            Children::Loaded(entries) => entries,
            Children::Pending => match load_children(source, &id).await {
                Ok(entries) => entries,
                Err(reason) => {
                    warn!(path = %path.display(), id = %id, %reason, "directory listing failed, skipping subtree");
                    plan.unlisted.push(UnlistedNode { path, id, reason });
                    continue;
                }
            },
        };

        if depth > 0 {
            plan.directories.push(path.clone());
        }

        let mut frames = Vec::with_capacity(entries.len());
        for child in entries {
            let segment = sanitize_segment(child.name(), &path)?;
            let child_path = path.join(segment);
            let child_depth = depth + 1;

            if child.is_directory() && child_depth > MAX_TREE_DEPTH {
                return Err(TraversalError::TooDeep {
                    path: child_path,
                    limit: MAX_TREE_DEPTH,
                });
            }
            if !seen.insert(child_path.clone()) {
                return Err(TraversalError::DuplicatePath { path: child_path });
            }

            frames.push(Frame {
                node: child,
                path: child_path,
                depth: child_depth,
            });
        }
        stack.extend(frames.into_iter().rev());
    }

    debug!(
        jobs = plan.jobs.len(),
        directories = plan.directories.len(),
        unlisted = plan.unlisted.len(),
        "tree flattened"
    );
    Ok(plan)
}

async fn load_children(source: &dyn ListingSource, id: &str) -> Result<Vec<Node>, String> {
    debug!(id, "fetching pending directory");
    match source.fetch_node(id).await {
        Ok(Node::Directory {
            children: Children::Loaded(entries),
            ..
        }) => Ok(entries),
        Ok(Node::Directory {
            children: Children::Pending,
            ..
        }) => Err("listing returned no entries".to_string()),
        Ok(Node::File { .. }) => Err("listing returned a file".to_string()),
        Err(e) => Err(e.to_string()),
    }
}

/// Validates a remote name as one relative path segment.
///
/// Rejects empty names, `.` and `..`, separators, NUL, Windows drive
/// prefixes such as `C:`, and names ending in the temporary download suffix
/// (`.bricks.part`).
///
/// # Errors
///
/// Returns [`TraversalError::UnsafeName`] when the name is rejected.
pub fn sanitize_segment<'a>(name: &'a str, parent: &Path) -> Result<&'a str, TraversalError> {
    let unsafe_name = || TraversalError::UnsafeName {
        name: name.to_string(),
        parent: parent.to_path_buf(),
    };

    if name.is_empty() || name == "." || name == ".." {
        return Err(unsafe_name());
    }
    if name.contains(['/', '\\', '\0']) {
        return Err(unsafe_name());
    }
    let bytes = name.as_bytes();
    if bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' {
        return Err(unsafe_name());
    }
    if name.ends_with(PARTIAL_SUFFIX) {
        return Err(unsafe_name());
    }

    Ok(name)
}
