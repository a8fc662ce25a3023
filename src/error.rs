//! Error taxonomy surfaced by the client.

use std::fmt;
use std::time::Duration;

/// Errors returned by [`ODataService`](crate::ODataService) operations.
///
/// A request whose status stays non-successful after every retry is not an
/// error: it is reported as `Ok(None)` after being classified and logged.
#[derive(Debug)]
pub enum ODataError {
    /// Missing or invalid credentials. Never retried.
    Authentication(String),
    /// The server throttled us (HTTP 429). Carries the time left before the
    /// session accepts requests again.
    RateLimited { retry_after: Duration },
    /// Transport fault, timeout, undecodable body or incomplete pagination.
    DataFetch { url: String, source: anyhow::Error },
    /// The server kept sending cursors past the configured page limit.
    PageLimitExceeded { url: String, max_pages: usize },
    /// The session was used after `close()`.
    Closed,
    /// Invalid client configuration.
    Config(String),
}

impl ODataError {
    pub fn data_fetch(url: impl Into<String>, source: impl Into<anyhow::Error>) -> Self {
        ODataError::DataFetch {
            url: url.into(),
            source: source.into(),
        }
    }

    /// True for every failure to fetch data, including a tripped page guard.
    pub fn is_data_fetch(&self) -> bool {
        matches!(
            self,
            ODataError::DataFetch { .. } | ODataError::PageLimitExceeded { .. }
        )
    }

    /// The wait requested by the server, if this is a rate-limit error.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            ODataError::RateLimited { retry_after } => Some(*retry_after),
            _ => None,
        }
    }
}

impl fmt::Display for ODataError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ODataError::Authentication(msg) => write!(f, "Authentication failed: {}", msg),
            ODataError::RateLimited { retry_after } => {
                // Round up so a sub-second wait is never shown as zero
                let secs = retry_after.as_millis().div_ceil(1000);
                write!(f, "Rate limit hit. Retry after {} seconds.", secs)
            }
            ODataError::DataFetch { url, .. } => write!(f, "Error fetching data from {}", url),
            ODataError::PageLimitExceeded { url, max_pages } => write!(
                f,
                "Pagination stopped at {}: more than {} pages",
                url, max_pages
            ),
            ODataError::Closed => write!(f, "Session is closed"),
            ODataError::Config(msg) => write!(f, "Invalid configuration: {}", msg),
        }
    }
}

impl std::error::Error for ODataError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ODataError::DataFetch { source, .. } => Some(&**source),
            _ => None,
        }
    }
}
