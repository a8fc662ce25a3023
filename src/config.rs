//! Client configuration.

use std::time::Duration;

use crate::http::{DEFAULT_CACHE_TTL_SECS, MAX_RETRIES, REQUEST_TIMEOUT_SECS, RETRY_DELAY_MS};
use crate::service::DEFAULT_MAX_PAGES;

/// Environment variable holding the service base URL.
pub const SERVICE_URL_VAR: &str = "SAP_SERVICE_URL";

/// Settings for one service session.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Base endpoint; requests go to `service_url/endpoint`.
    pub service_url: String,
    /// Bound on a single attempt, including reading the body.
    pub timeout: Duration,
    /// Retries after the initial attempt.
    pub max_retries: usize,
    /// Fixed pause between attempts.
    pub retry_delay: Duration,
    /// Zero disables the response cache.
    pub cache_ttl: Duration,
    /// Pages fetched before pagination gives up.
    pub max_pages: usize,
    pub user_agent: String,
}

impl ClientConfig {
    /// Configuration for `service_url` with the default limits.
    pub fn new(service_url: impl Into<String>) -> Self {
        Self {
            service_url: service_url.into(),
            timeout: Duration::from_secs(REQUEST_TIMEOUT_SECS),
            max_retries: MAX_RETRIES,
            retry_delay: Duration::from_millis(RETRY_DELAY_MS),
            cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
            max_pages: DEFAULT_MAX_PAGES,
            user_agent: concat!("odc/", env!("ODC_VERSION")).to_string(),
        }
    }

    /// Sets the per-attempt timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the number of retries after the first attempt.
    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Sets the pause between attempts.
    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    /// Sets how long successful responses are cached.
    pub fn with_cache_ttl(mut self, cache_ttl: Duration) -> Self {
        self.cache_ttl = cache_ttl;
        self
    }

    /// Sets the pagination guard.
    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages;
        self
    }

    /// Sets the `User-Agent` header sent with every request.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Joins the base URL and an endpoint with exactly one slash.
    pub fn endpoint_url(&self, endpoint: &str) -> String {
        format!(
            "{}/{}",
            self.service_url.trim_end_matches('/'),
            endpoint.trim_start_matches('/')
        )
    }
}
