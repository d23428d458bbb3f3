//! Wire format of the directory listing endpoint.
//!
//! `GET {base}/api/d/{id}` answers with:
//!
//! ```json
//! { "data": { "id": "…", "name": "…", "parent": "…",
//!             "files": [ { "id": "…", "name": "…", "dir": false, "size": 123 } ] } }
//! ```
//!
//! Entries flagged `dir` are nested directories and come back unloaded.

use serde::Deserialize;

use super::{ListingError, Node};

#[derive(Debug, Deserialize)]
pub(crate) struct ListingEnvelope {
    data: DirectoryPayload,
}

#[derive(Debug, Deserialize)]
struct DirectoryPayload {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    files: Option<Vec<EntryPayload>>,
}

#[derive(Debug, Deserialize)]
struct EntryPayload {
    id: String,
    name: String,
    #[serde(default)]
    dir: bool,
    #[serde(default)]
    size: Option<u64>,
}

impl ListingEnvelope {
    /// Parses a raw response body.
    pub(crate) fn from_slice(requested_id: &str, body: &[u8]) -> Result<Self, ListingError> {
        serde_json::from_slice(body).map_err(|e| ListingError::parse(requested_id, e.to_string()))
    }

    /// Converts the payload into a directory node.
    ///
    /// Either the whole listing converts or an error is returned; no partial
    /// node escapes.
    pub(crate) fn into_node(
        self,
        requested_id: &str,
        file_url: impl Fn(&str) -> String,
    ) -> Result<Node, ListingError> {
        let directory = self.data;

        if !directory.id.eq_ignore_ascii_case(requested_id) {
            return Err(ListingError::parse(
                requested_id,
                format!("listing describes directory {}", directory.id),
            ));
        }

        let entries = directory.files.unwrap_or_default();
        let mut children = Vec::with_capacity(entries.len());
        for (position, entry) in entries.into_iter().enumerate() {
            if entry.id.trim().is_empty() {
                return Err(ListingError::parse(
                    requested_id,
                    format!("entry {position} has an empty id"),
                ));
            }
            if entry.name.is_empty() {
                return Err(ListingError::parse(
                    requested_id,
                    format!("entry {} has an empty name", entry.id),
                ));
            }
            let child = if entry.dir {
                Node::pending_directory(entry.id, entry.name)
            } else {
                let url = file_url(&entry.id);
                Node::file(entry.id, entry.name, url, entry.size)
            };
            children.push(child);
        }

        Ok(Node::directory(directory.id, directory.name, children))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::listing::Children;

    fn convert(id: &str, body: &str) -> Result<Node, ListingError> {
        ListingEnvelope::from_slice(id, body.as_bytes())?
            .into_node(id, |file_id| format!("http://host/f/{file_id}"))
    }

    #[test]
    fn test_parses_files_and_pending_directories_in_order() {
        let body = r#"{"data":{"id":"root","name":"Movies","parent":null,"files":[
            {"id":"f1","name":"a.txt","dir":false,"size":3},
            {"id":"d1","name":"b","dir":true},
            {"id":"f2","name":"z.txt","dir":false}
        ]}}"#;

        let node = convert("root", body).unwrap();

        let Node::Directory {
            name,
            children: Children::Loaded(children),
            ..
        } = node
        else {
            panic!("expected loaded directory");
        };
        assert_eq!(name, "Movies");
        assert_eq!(
            children,
            vec![
                Node::file("f1", "a.txt", "http://host/f/f1", Some(3)),
                Node::pending_directory("d1", "b"),
                Node::file("f2", "z.txt", "http://host/f/f2", None),
            ]
        );
    }

    #[test]
    fn test_null_files_means_empty_directory() {
        let node = convert("root", r#"{"data":{"id":"root","name":"x","files":null}}"#).unwrap();
        assert_eq!(node, Node::directory("root", "x", Vec::new()));
    }

    #[test]
    fn test_invalid_json_is_parse_error() {
        let result = convert("root", "<html>oops</html>");
        assert!(matches!(result, Err(ListingError::Parse { .. })));
    }

    #[test]
    fn test_missing_data_is_parse_error() {
        let result = convert("root", r#"{"files":[]}"#);
        assert!(matches!(result, Err(ListingError::Parse { .. })));
    }

    #[test]
    fn test_mismatched_directory_id_is_parse_error() {
        let result = convert("root", r#"{"data":{"id":"other","name":"x","files":[]}}"#);
        assert!(matches!(result, Err(ListingError::Parse { .. })));
    }

    #[test]
    fn test_empty_entry_name_is_parse_error() {
        let body = r#"{"data":{"id":"root","name":"x","files":[{"id":"f1","name":""}]}}"#;
        let result = convert("root", body);
        assert!(matches!(result, Err(ListingError::Parse { .. })));
    }

    #[test]
    fn test_empty_entry_id_is_parse_error() {
        let body = r#"{"data":{"id":"root","name":"x","files":[{"id":"","name":"a"}]}}"#;
        let result = convert("root", body);
        assert!(matches!(result, Err(ListingError::Parse { .. })));
    }
}
