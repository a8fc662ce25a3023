//! In-memory response cache with a fixed time-to-live.

use log::debug;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use super::request::CacheKey;

/// Default lifetime of a cached response.
pub const DEFAULT_CACHE_TTL_SECS: u64 = 300;

#[derive(Debug, Clone)]
struct CacheEntry {
    value: Value,
    /// `None` when the TTL reaches past what `Instant` can represent.
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|expires_at| now >= expires_at)
    }
}

/// Successful response payloads keyed by the request that produced them.
///
/// Entries are never served past their expiry. There is no single-flight
/// deduplication: concurrent misses on the same key all reach the network.
/// A zero TTL disables caching.
#[derive(Debug)]
pub struct ResponseCache {
    ttl: Duration,
    entries: Mutex<HashMap<CacheKey, CacheEntry>>,
}

impl ResponseCache {
    /// Creates an empty cache whose entries live for `ttl`.
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// False when the TTL is zero.
    pub fn is_enabled(&self) -> bool {
        !self.ttl.is_zero()
    }

    /// Cached payload for `key`, evicting it if it has expired.
    pub fn lookup(&self, key: &CacheKey) -> Option<Value> {
        if !self.is_enabled() {
            return None;
        }

        let mut entries = self.lock();
        let entry = entries.get(key)?;
        if !entry.is_expired(Instant::now()) {
            return Some(entry.value.clone());
        }

        debug!("Cache entry expired, evicting");
        entries.remove(key);
        None
    }

    /// Stores a payload and drops every expired entry.
    pub fn store(&self, key: CacheKey, value: Value) {
        if !self.is_enabled() {
            return;
        }

        let now = Instant::now();
        let mut entries = self.lock();
        entries.retain(|_, entry| !entry.is_expired(now));
        entries.insert(
            key,
            CacheEntry {
                value,
                expires_at: now.checked_add(self.ttl),
            },
        );
    }

    /// Number of stored entries, including ones that expired but were not
    /// evicted yet.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<CacheKey, CacheEntry>> {
        // A panic while holding the lock cannot leave a half-written entry
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new(Duration::from_secs(DEFAULT_CACHE_TTL_SECS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::Request;
    use serde_json::json;

    #[test]
    fn test_store_and_lookup() {
        let cache = ResponseCache::default();
        let key = Request::get("http://host/entity").cache_key();

        assert_eq!(cache.lookup(&key), None);

        cache.store(key.clone(), json!({"value": [1, 2]}));
        assert_eq!(cache.lookup(&key), Some(json!({"value": [1, 2]})));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_store_overwrites() {
        let cache = ResponseCache::default();
        let key = Request::get("http://host/entity").cache_key();

        cache.store(key.clone(), json!(1));
        cache.store(key.clone(), json!(2));
        assert_eq!(cache.lookup(&key), Some(json!(2)));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_expired_entry_is_absent() {
        let cache = ResponseCache::new(Duration::from_millis(20));
        let key = Request::get("http://host/entity").cache_key();

        cache.store(key.clone(), json!({"id": 1}));
        assert!(cache.lookup(&key).is_some());

        std::thread::sleep(Duration::from_millis(40));
        assert_eq!(cache.lookup(&key), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_distinct_bodies_do_not_collide() {
        let cache = ResponseCache::default();
        let first = Request::post("http://host/entity", json!({"id": 1})).cache_key();
        let second = Request::post("http://host/entity", json!({"id": 2})).cache_key();

        cache.store(first.clone(), json!("first"));
        assert_eq!(cache.lookup(&second), None);
        assert_eq!(cache.lookup(&first), Some(json!("first")));
    }

    #[test]
    fn test_zero_ttl_disables_cache() {
        let cache = ResponseCache::new(Duration::ZERO);
        let key = Request::get("http://host/entity").cache_key();

        cache.store(key.clone(), json!(1));
        assert!(!cache.is_enabled());
        assert_eq!(cache.lookup(&key), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_huge_ttl_never_expires() {
        let cache = ResponseCache::new(Duration::from_secs(u64::MAX));
        let key = Request::get("http://host/entity").cache_key();

        cache.store(key.clone(), json!({"id": 1}));
        assert_eq!(cache.lookup(&key), Some(json!({"id": 1})));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_clear() {
        let cache = ResponseCache::default();
        cache.store(Request::get("http://host/a").cache_key(), json!(1));
        cache.store(Request::get("http://host/b").cache_key(), json!(2));
        assert_eq!(cache.len(), 2);

        cache.clear();
        assert!(cache.is_empty());
    }
}
