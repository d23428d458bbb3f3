//! Constants for the download module (timeouts, listing limits).

/// Default HTTP connect timeout (30 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default idle read timeout: longest wait for the next chunk of a body (5 minutes).
pub const READ_TIMEOUT_SECS: u64 = 300;

/// Per-request timeout for directory listing calls (30 seconds).
pub const LISTING_TIMEOUT_SECS: u64 = 30;
