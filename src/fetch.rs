//! HTTP fetching with exponential backoff retry logic.
//!
//! All network access goes through the [`FetchAsync`] trait, implemented by
//! [`Fetcher`], which wraps a shared `reqwest::Client` with retry logic for
//! transient failures. Permanent client errors fail fast; everything else
//! is retried with exponential backoff and jitter. The trait is the seam
//! that lets the pipeline run against canned documents in tests.
//!
//! # Retry Strategy
//!
//! - Transient: connection/timeout errors, every 5xx status, and 429
//! - Permanent: any other 4xx status (retrying cannot fix those)
//! - Delay: `backoff_base * 2^(attempt-1)`, capped at 30 seconds
//! - Random jitter (0-250ms) added to prevent thundering herd

use rand::seq::IndexedRandom;
use rand::{Rng, rng};
use reqwest::StatusCode;
use reqwest::header::{HeaderMap, HeaderValue};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, error, instrument, warn};

/// Browser User-Agent strings rotated per request.
const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/129.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/129.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:123.0) Gecko/20100101 Firefox/123.0",
];

const MAX_DELAY: Duration = Duration::from_secs(30);

/// A fetched response body plus the metadata the pipeline cares about.
#[derive(Debug)]
pub struct RawDocument {
    /// The URL that was fetched.
    pub url: String,
    /// Decoded response body.
    pub body: String,
    /// `Content-Type` header value, if present.
    pub content_type: Option<String>,
}

/// Errors surfaced by [`Fetcher`] after retries are exhausted.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The request kept failing at the transport level (timeout, reset, DNS).
    #[error("request to {url} failed after {attempts} attempts: {source}")]
    Exhausted {
        url: String,
        attempts: usize,
        #[source]
        source: reqwest::Error,
    },
    /// A non-retryable client error status (4xx other than 429).
    #[error("{url} returned client error {status}")]
    ClientError { url: String, status: StatusCode },
    /// A retryable status that never went away.
    #[error("{url} still returned {status} after {attempts} attempts")]
    BadStatus {
        url: String,
        status: StatusCode,
        attempts: usize,
    },
    /// The response arrived but its body could not be read.
    #[error("failed to read response body from {url}: {source}")]
    Body {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    /// Building the HTTP client failed.
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

/// Whether a status code is worth retrying.
///
/// 5xx and 429 are transient; every other 4xx is a permanent client error.
pub fn is_transient(status: StatusCode) -> bool {
    status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
}

/// Backoff delay before retry number `attempt` (1-based), without jitter.
pub fn backoff_delay(base: Duration, attempt: usize) -> Duration {
    let delay = base.saturating_mul(1u32 << (attempt - 1).min(16));
    delay.min(MAX_DELAY)
}

/// Async document retrieval, the pipeline's only way onto the network.
///
/// [`Fetcher`] is the production implementation; tests substitute one
/// backed by canned documents.
pub trait FetchAsync {
    /// Fetch a text document (listing or article page).
    async fn fetch_text(&self, url: &str) -> Result<RawDocument, FetchError>;

    /// Fetch a binary body (image download).
    async fn fetch_bytes(&self, url: &str) -> Result<(Vec<u8>, Option<String>), FetchError>;
}

/// HTTP fetcher with retry/backoff. One instance is shared across the run.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: reqwest::Client,
    max_retries: usize,
    backoff_base: Duration,
}

impl Fetcher {
    pub fn new(
        timeout: Duration,
        max_retries: usize,
        backoff_base: Duration,
    ) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(FetchError::Client)?;
        Ok(Self {
            client,
            max_retries,
            backoff_base,
        })
    }

    async fn get_with_retries(&self, url: &str) -> Result<reqwest::Response, FetchError> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            attempt += 1;
            let result = self
                .client
                .get(url)
                .headers(request_headers())
                .send()
                .await;

            let failure = match result {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return Ok(response);
                    }
                    if !is_transient(status) {
                        error!(%url, %status, "Client error, not retrying");
                        return Err(FetchError::ClientError {
                            url: url.to_string(),
                            status,
                        });
                    }
                    if attempt > self.max_retries {
                        error!(
                            %url,
                            %status,
                            attempts = attempt,
                            elapsed_ms = total_t0.elapsed().as_millis() as u64,
                            "Retries exhausted on bad status"
                        );
                        return Err(FetchError::BadStatus {
                            url: url.to_string(),
                            status,
                            attempts: attempt,
                        });
                    }
                    format!("status {status}")
                }
                Err(source) => {
                    if attempt > self.max_retries {
                        error!(
                            %url,
                            attempts = attempt,
                            elapsed_ms = total_t0.elapsed().as_millis() as u64,
                            error = %source,
                            "Retries exhausted on transport error"
                        );
                        return Err(FetchError::Exhausted {
                            url: url.to_string(),
                            attempts: attempt,
                            source,
                        });
                    }
                    source.to_string()
                }
            };

            let jitter = Duration::from_millis(rng().random_range(0..=250));
            let delay = backoff_delay(self.backoff_base, attempt) + jitter;
            warn!(
                %url,
                attempt,
                max = self.max_retries,
                ?delay,
                failure = %failure,
                "Fetch attempt failed; backing off"
            );
            sleep(delay).await;
        }
    }
}

impl FetchAsync for Fetcher {
    #[instrument(level = "info", skip(self), fields(%url))]
    async fn fetch_text(&self, url: &str) -> Result<RawDocument, FetchError> {
        let response = self.get_with_retries(url).await?;
        let content_type = header_string(response.headers(), "content-type");
        let body = response.text().await.map_err(|source| FetchError::Body {
            url: url.to_string(),
            source,
        })?;
        debug!(bytes = body.len(), "Fetched document");
        Ok(RawDocument {
            url: url.to_string(),
            body,
            content_type,
        })
    }

    #[instrument(level = "info", skip(self), fields(%url))]
    async fn fetch_bytes(&self, url: &str) -> Result<(Vec<u8>, Option<String>), FetchError> {
        let response = self.get_with_retries(url).await?;
        let content_type = header_string(response.headers(), "content-type");
        let bytes = response.bytes().await.map_err(|source| FetchError::Body {
            url: url.to_string(),
            source,
        })?;
        Ok((bytes.to_vec(), content_type))
    }
}

fn request_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    let agent = USER_AGENTS
        .choose(&mut rng())
        .copied()
        .unwrap_or(USER_AGENTS[0]);
    if let Ok(value) = HeaderValue::from_str(agent) {
        headers.insert("User-Agent", value);
    }
    headers.insert(
        "Accept",
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
        ),
    );
    headers.insert(
        "Accept-Language",
        HeaderValue::from_static("es-ES,es;q=0.8,en-US;q=0.5,en;q=0.3"),
    );
    headers.insert("Connection", HeaderValue::from_static("keep-alive"));
    headers
}

fn header_string(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_transient_server_errors() {
        assert!(is_transient(StatusCode::INTERNAL_SERVER_ERROR));
        assert!(is_transient(StatusCode::BAD_GATEWAY));
        assert!(is_transient(StatusCode::SERVICE_UNAVAILABLE));
        assert!(is_transient(StatusCode::GATEWAY_TIMEOUT));
    }

    #[test]
    fn test_is_transient_rate_limit() {
        assert!(is_transient(StatusCode::TOO_MANY_REQUESTS));
    }

    #[test]
    fn test_is_not_transient_client_errors() {
        assert!(!is_transient(StatusCode::NOT_FOUND));
        assert!(!is_transient(StatusCode::FORBIDDEN));
        assert!(!is_transient(StatusCode::BAD_REQUEST));
    }

    #[test]
    fn test_backoff_delay_doubles() {
        let base = Duration::from_millis(500);
        assert_eq!(backoff_delay(base, 1), Duration::from_millis(500));
        assert_eq!(backoff_delay(base, 2), Duration::from_millis(1000));
        assert_eq!(backoff_delay(base, 3), Duration::from_millis(2000));
    }

    #[test]
    fn test_backoff_delay_is_capped() {
        let base = Duration::from_secs(1);
        assert_eq!(backoff_delay(base, 10), Duration::from_secs(30));
        assert_eq!(backoff_delay(base, 60), Duration::from_secs(30));
    }

    #[test]
    fn test_request_headers_have_user_agent() {
        let headers = request_headers();
        let agent = headers.get("User-Agent").unwrap().to_str().unwrap();
        assert!(USER_AGENTS.contains(&agent));
        assert!(headers.contains_key("Accept-Language"));
    }

    #[tokio::test]
    async fn test_body_error_names_the_url() {
        // An unsupported scheme errors inside reqwest without touching the
        // network, which gives us a real `reqwest::Error` to wrap.
        let source = reqwest::Client::new()
            .get("foo://unsupported")
            .send()
            .await
            .unwrap_err();
        let err = FetchError::Body {
            url: "https://vandal.elespanol.com/noticia/1/a".to_string(),
            source,
        };
        let text = err.to_string();
        assert!(text.contains("response body"));
        assert!(text.contains("/noticia/1/a"));
    }
}
