//! HTTP implementation of [`ListingSource`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use tracing::{debug, info, instrument};
use url::Url;

use super::payload::ListingEnvelope;
use super::{ListingError, ListingSource, Node};
use crate::download::constants::LISTING_TIMEOUT_SECS;
use crate::download::{HttpClient, RetryDecision, RetryPolicy};

/// Listing client for the remote directory service.
///
/// Issues one `GET {base}/api/d/{id}` per directory and retries transient
/// failures according to its [`RetryPolicy`]. File entries are given the
/// download URL `{base}/f/{id}`.
///
/// # Example
///
/// ```no_run
/// use bricks_core::download::{HttpClient, RetryPolicy};
/// use bricks_core::listing::{HttpListingClient, ListingSource};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let listing = HttpListingClient::new(HttpClient::new(), "https://example.com", RetryPolicy::default())?;
/// let root = listing.fetch_node("5f1c2d2e-8f4b-4a4e-9d8c-0a1b2c3d4e5f").await?;
/// println!("{}", root.name());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HttpListingClient {
    client: HttpClient,
    base_url: Url,
    retry_policy: RetryPolicy,
}

impl HttpListingClient {
    /// Creates a listing client rooted at `base_url` (`scheme://host[:port]`).
    ///
    /// # Errors
    ///
    /// Returns [`ListingError::InvalidBaseUrl`] if `base_url` is not an
    /// absolute http(s) URL.
    pub fn new(
        client: HttpClient,
        base_url: &str,
        retry_policy: RetryPolicy,
    ) -> Result<Self, ListingError> {
        let invalid = || ListingError::InvalidBaseUrl {
            url: base_url.to_string(),
        };
        let parsed = Url::parse(base_url).map_err(|_| invalid())?;
        if parsed.cannot_be_a_base() || !matches!(parsed.scheme(), "http" | "https") {
            return Err(invalid());
        }

        Ok(Self {
            client,
            base_url: parsed,
            retry_policy,
        })
    }

    /// Listing endpoint for a directory identifier.
    #[must_use]
    pub fn listing_url(&self, id: &str) -> Url {
        self.endpoint(&["api", "d", id])
    }

    /// Download endpoint for a file identifier.
    #[must_use]
    pub fn file_url(&self, id: &str) -> Url {
        self.endpoint(&["f", id])
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // Checked in `new`: http(s) URLs can always be a base.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn fetch_once(&self, id: &str) -> Result<Node, ListingError> {
        let url = self.listing_url(id);
        debug!(url = %url, "requesting listing");

        let response = self
            .client
            .inner()
            .get(url)
            .header(ACCEPT, "application/json")
            .timeout(Duration::from_secs(LISTING_TIMEOUT_SECS))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ListingError::timeout(id)
                } else {
                    ListingError::network(id, e)
                }
            })?;

        let status = response.status().as_u16();
        if matches!(status, 400 | 404 | 410) {
            return Err(ListingError::not_found(id, status));
        }
        if !response.status().is_success() {
            return Err(ListingError::http_status(id, status));
        }

        let body = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                ListingError::timeout(id)
            } else {
                ListingError::network(id, e)
            }
        })?;

        ListingEnvelope::from_slice(id, &body)?
            .into_node(id, |file_id| self.file_url(file_id).to_string())
    }
}

#[async_trait]
impl ListingSource for HttpListingClient {
    #[instrument(skip(self), fields(base = %self.base_url))]
    async fn fetch_node(&self, id: &str) -> Result<Node, ListingError> {
        let mut attempt = 0u32;

        loop {
            attempt += 1;

            let error = match self.fetch_once(id).await {
                Ok(node) => return Ok(node),
                Err(error) => error,
            };

            match self.retry_policy.should_retry(error.failure_type(), attempt) {
                RetryDecision::Retry {
                    delay,
                    attempt: next_attempt,
                } => {
                    info!(
                        attempt = next_attempt,
                        max_attempts = self.retry_policy.max_attempts(),
                        delay_ms = delay.as_millis(),
                        error = %error,
                        "retrying listing request"
                    );
                    tokio::time::sleep(delay).await;
                }
                RetryDecision::DoNotRetry { reason } => {
                    debug!(%reason, error = %error, "not retrying listing request");
                    return Err(error);
                }
            }
        }
    }
}
