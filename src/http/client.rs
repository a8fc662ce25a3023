//! Request execution: cache, rate-limit gate, timeout and retry.

use anyhow::{Context, anyhow};
use log::{debug, error, warn};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;

use super::cache::ResponseCache;
use super::classify::classify;
use super::rate_limit::RateLimitGate;
use super::request::Request;
use super::retry::{Attempt, Failure, parse_retry_after};
use crate::config::ClientConfig;
use crate::error::ODataError;

/// Single chokepoint for every HTTP exchange of a session.
///
/// Owns the transport, the response cache and the rate-limit state, so two
/// executors never share either.
#[derive(Debug)]
pub struct Executor {
    client: Client,
    cache: ResponseCache,
    gate: RateLimitGate,
    timeout: Duration,
    max_retries: usize,
    retry_delay: Duration,
}

impl Executor {
    /// Creates an executor around a client that already carries the
    /// session's default headers.
    pub fn new(client: Client, config: &ClientConfig) -> Self {
        Self {
            client,
            cache: ResponseCache::new(config.cache_ttl),
            gate: RateLimitGate::new(),
            timeout: config.timeout,
            max_retries: config.max_retries,
            retry_delay: config.retry_delay,
        }
    }

    /// Response cache owned by this executor.
    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    /// Rate-limit state shared by every request of this executor.
    pub fn gate(&self) -> &RateLimitGate {
        &self.gate
    }

    /// Executes a request.
    ///
    /// Returns `Ok(None)` when the server kept answering with a non-success
    /// status until the retry budget ran out; the last response has been
    /// classified and logged by then. HTTP 429 is never retried here.
    #[tracing::instrument(skip(self, request), fields(method = %request.method(), url = %request.url()))]
    pub async fn execute(&self, request: &Request) -> Result<Option<Value>, ODataError> {
        let key = request.cache_key();
        if let Some(hit) = self.cache.lookup(&key) {
            debug!("Cache hit for {} {}", request.method(), request.url());
            return Ok(Some(hit));
        }

        let attempts = self.max_retries.saturating_add(1);
        let mut attempt = 1;
        loop {
            self.gate.check()?;

            let failure = match self.attempt(request).await {
                Attempt::Success(value) => {
                    self.cache.store(key, value.clone());
                    return Ok(Some(value));
                }
                Attempt::Throttled(retry_after) => {
                    self.gate.record(retry_after);
                    return Err(ODataError::RateLimited { retry_after });
                }
                Attempt::Malformed(e) => {
                    error!("Error making request: {:#}", e);
                    return Err(ODataError::data_fetch(request.url(), e));
                }
                Attempt::Retryable(failure) => failure,
            };

            if attempt >= attempts {
                return self.exhausted(request, failure);
            }

            warn!(
                "{} {}: attempt {}/{} failed ({}), retrying in {:?}...",
                request.method(),
                request.url(),
                attempt,
                attempts,
                failure,
                self.retry_delay
            );
            tokio::time::sleep(self.retry_delay).await;
            attempt += 1;
        }
    }

    fn exhausted(&self, request: &Request, failure: Failure) -> Result<Option<Value>, ODataError> {
        match failure {
            Failure::Status { status, body } => {
                classify(request.url(), status, &body);
                Ok(None)
            }
            Failure::Transport(e) => {
                error!("Error making request: {:#}", e);
                Err(ODataError::data_fetch(request.url(), e))
            }
        }
    }

    /// One exchange bounded by the timeout, which covers reading the body.
    async fn attempt(&self, request: &Request) -> Attempt {
        match tokio::time::timeout(self.timeout, self.exchange(request)).await {
            Ok(Ok(attempt)) => attempt,
            Ok(Err(e)) => Attempt::Retryable(Failure::Transport(e)),
            Err(_) => Attempt::Retryable(Failure::Transport(anyhow!(
                "Request timed out after {:?}",
                self.timeout
            ))),
        }
    }

    async fn exchange(&self, request: &Request) -> anyhow::Result<Attempt> {
        let mut builder = self
            .client
            .request(request.method().clone(), request.url());
        if !request.params().is_empty() {
            builder = builder.query(request.params());
        }
        if let Some(body) = request.body() {
            builder = builder.json(body);
        }

        let response = builder.send().await.context("Failed to send request")?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Ok(Attempt::Throttled(parse_retry_after(response.headers())));
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Ok(Attempt::Retryable(Failure::Status { status, body }));
        }

        let bytes = response
            .bytes()
            .await
            .context("Failed to read response body")?;

        // 204 No Content and friends
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Attempt::Success(Value::Null));
        }

        match serde_json::from_slice(&bytes) {
            Ok(value) => Ok(Attempt::Success(value)),
            Err(e) => Ok(Attempt::Malformed(
                anyhow::Error::from(e).context("Failed to parse JSON response"),
            )),
        }
    }
}
