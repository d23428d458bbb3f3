//! Shared User-Agent string for listing and download HTTP requests.
//!
//! Identifies the tool and its project URL (RFC 9308).

/// Project URL for User-Agent identification.
const PROJECT_UA_URL: &str = "https://github.com/vadapavmov/bricks";

/// Default User-Agent for all requests (identifies the tool).
#[must_use]
pub(crate) fn default_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("bricks/{version} (+{PROJECT_UA_URL})")
}
