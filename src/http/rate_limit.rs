//! Server-driven rate limiting.

use log::warn;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crate::error::ODataError;

/// Fails fast while a server-imposed backoff window is open.
///
/// The window end is stored as milliseconds since the gate was created and
/// only ever moves forward. The gate never sleeps; waiting is left to the
/// caller.
#[derive(Debug)]
pub struct RateLimitGate {
    origin: Instant,
    reset_at_ms: AtomicU64,
}

impl RateLimitGate {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            reset_at_ms: AtomicU64::new(0),
        }
    }

    fn now_ms(&self) -> u64 {
        u64::try_from(self.origin.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    /// Time left until requests are accepted again; zero when open.
    pub fn remaining(&self) -> Duration {
        let reset_at = self.reset_at_ms.load(Ordering::Acquire);
        Duration::from_millis(reset_at.saturating_sub(self.now_ms()))
    }

    pub fn check(&self) -> Result<(), ODataError> {
        let remaining = self.remaining();
        if remaining.is_zero() {
            Ok(())
        } else {
            Err(ODataError::RateLimited {
                retry_after: remaining,
            })
        }
    }

    /// Records a `Retry-After` window reported with an HTTP 429.
    pub fn record(&self, retry_after: Duration) {
        let wait_ms = u64::try_from(retry_after.as_millis()).unwrap_or(u64::MAX);
        let until = self.now_ms().saturating_add(wait_ms);
        let previous = self.reset_at_ms.fetch_max(until, Ordering::AcqRel);
        if until > previous {
            warn!("Rate limit hit. Holding requests for {:?}", retry_after);
        }
    }
}

impl Default for RateLimitGate {
    fn default() -> Self {
        Self::new()
    }
}
