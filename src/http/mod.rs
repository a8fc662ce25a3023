//! HTTP layer: request descriptors, response cache, rate-limit gate and the
//! retrying executor every call goes through.

mod cache;
mod classify;
mod client;
mod rate_limit;
mod request;
mod retry;

pub use cache::{DEFAULT_CACHE_TTL_SECS, ResponseCache};
pub use classify::{StatusClass, classify};
pub use client::Executor;
pub use rate_limit::RateLimitGate;
pub use request::{CacheKey, Request};
pub use retry::{MAX_RETRIES, REQUEST_TIMEOUT_SECS, RETRY_DELAY_MS, parse_retry_after};
