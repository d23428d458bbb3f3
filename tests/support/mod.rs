//! Shared wiremock helpers for the listing and download endpoints.
#![allow(dead_code)]

use serde_json::{Value, json};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// A listing entry: `(id, name, is_dir, size)`.
pub type Entry<'a> = (&'a str, &'a str, bool, Option<u64>);

/// Builds a listing payload in the service's wire format.
pub fn listing_body(id: &str, name: &str, entries: &[Entry<'_>]) -> Value {
    let files: Vec<Value> = entries
        .iter()
        .map(|(entry_id, entry_name, dir, size)| {
            let mut entry = json!({ "id": entry_id, "name": entry_name, "dir": dir });
            if let Some(size) = size {
                entry["size"] = json!(size);
            }
            entry
        })
        .collect();

    json!({ "data": { "id": id, "name": name, "parent": null, "files": files } })
}

/// Serves the listing of directory `id`.
pub async fn mount_listing(server: &MockServer, id: &str, name: &str, entries: &[Entry<'_>]) {
    Mock::given(method("GET"))
        .and(path(format!("/api/d/{id}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing_body(id, name, entries)))
        .mount(server)
        .await;
}

/// Serves the body of file `id`.
pub async fn mount_file(server: &MockServer, id: &str, content: &[u8]) {
    Mock::given(method("GET"))
        .and(path(format!("/f/{id}")))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(content.to_vec()))
        .mount(server)
        .await;
}

/// Responds with `status` for any request to `route`.
pub async fn mount_status(server: &MockServer, route: &str, status: u16) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}
