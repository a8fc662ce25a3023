//! Retry budget and per-attempt outcomes.

use reqwest::StatusCode;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use serde_json::Value;
use std::fmt;
use std::time::Duration;

/// Retries after the initial attempt.
pub const MAX_RETRIES: usize = 3;

/// Delay between retry attempts in milliseconds.
pub const RETRY_DELAY_MS: u64 = 1000;

/// Upper bound for a single HTTP exchange, body included.
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Outcome of a single HTTP exchange.
#[derive(Debug)]
pub(crate) enum Attempt {
    Success(Value),
    /// HTTP 429 with the parsed `Retry-After` window.
    Throttled(Duration),
    /// Worth another try while budget remains.
    Retryable(Failure),
    /// The server answered successfully but the body is not JSON.
    Malformed(anyhow::Error),
}

#[derive(Debug)]
pub(crate) enum Failure {
    Status { status: StatusCode, body: String },
    Transport(anyhow::Error),
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Failure::Status { status, .. } => write!(f, "HTTP {}", status),
            Failure::Transport(e) => write!(f, "{:#}", e),
        }
    }
}

/// Reads `Retry-After` as whole seconds. Absent or unparsable values
/// count as zero.
pub fn parse_retry_after(headers: &HeaderMap) -> Duration {
    let secs = headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(0);
    Duration::from_secs(secs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_parse_retry_after_seconds() {
        assert_eq!(parse_retry_after(&headers_with("120")), Duration::from_secs(120));
        assert_eq!(parse_retry_after(&headers_with(" 7 ")), Duration::from_secs(7));
    }

    #[test]
    fn test_parse_retry_after_defaults_to_zero() {
        assert_eq!(parse_retry_after(&HeaderMap::new()), Duration::ZERO);
        assert_eq!(
            parse_retry_after(&headers_with("Wed, 21 Oct 2015 07:28:00 GMT")),
            Duration::ZERO
        );
        assert_eq!(parse_retry_after(&headers_with("-5")), Duration::ZERO);
    }

    #[test]
    fn test_failure_display() {
        let failure = Failure::Status {
            status: StatusCode::SERVICE_UNAVAILABLE,
            body: String::new(),
        };
        assert_eq!(failure.to_string(), "HTTP 503 Service Unavailable");

        let failure = Failure::Transport(anyhow::anyhow!("connection reset"));
        assert_eq!(failure.to_string(), "connection reset");
    }
}
