//! Key-value cache capability.
//!
//! Models the small slice of a shared cache (Redis-shaped) the geocoder
//! needs: TTL'd string values plus the counter primitives the fixed-window
//! rate limiter is built on.

use dashmap::DashMap;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Key-value cache failures.
///
/// Callers in this crate treat these as soft failures: a broken cache is
/// logged and bypassed, never propagated.
#[derive(Debug, Error)]
pub enum KvError {
    /// The cache backend could not be reached.
    #[error("cache unavailable: {0}")]
    Unavailable(String),
}

/// Shared key-value cache with TTLs and counters.
pub trait KeyValueCache: Send + Sync {
    /// Fetches the value stored under `key`, if present and unexpired.
    fn get(&self, key: &str) -> Result<Option<String>, KvError>;

    /// Stores `value` under `key` with the given time-to-live.
    fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<(), KvError>;

    /// Atomically increments the integer counter under `key`, creating it at
    /// 1 if absent, and returns the new value.
    fn incr(&self, key: &str) -> Result<i64, KvError>;

    /// Sets the time-to-live of an existing key.
    fn expire(&self, key: &str, ttl: Duration) -> Result<(), KvError>;
}

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Instant::now() >= at)
    }
}

/// In-process key-value cache.
///
/// Expiry is lazy: entries are dropped when a read or counter operation
/// observes them past their deadline.
pub struct MemoryKvCache {
    entries: DashMap<String, Entry>,
}

impl MemoryKvCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }
}

impl Default for MemoryKvCache {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyValueCache for MemoryKvCache {
    fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        if let Some(entry) = self.entries.get(key) {
            if !entry.expired() {
                return Ok(Some(entry.value.clone()));
            }
        }
        self.entries.remove_if(key, |_, entry| entry.expired());
        Ok(None)
    }

    fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<(), KvError> {
        self.entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: Some(Instant::now() + ttl),
            },
        );
        Ok(())
    }

    fn incr(&self, key: &str) -> Result<i64, KvError> {
        let mut entry = self.entries.entry(key.to_string()).or_insert(Entry {
            value: "0".to_string(),
            expires_at: None,
        });
        if entry.expired() {
            entry.value = "0".to_string();
            entry.expires_at = None;
        }
        let next = entry.value.parse::<i64>().unwrap_or(0) + 1;
        entry.value = next.to_string();
        Ok(next)
    }

    fn expire(&self, key: &str, ttl: Duration) -> Result<(), KvError> {
        if let Some(mut entry) = self.entries.get_mut(key) {
            entry.expires_at = Some(Instant::now() + ttl);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_get() {
        let cache = MemoryKvCache::new();
        cache
            .set_with_ttl("k", "v", Duration::from_secs(60))
            .unwrap();
        assert_eq!(cache.get("k").unwrap(), Some("v".to_string()));
    }

    #[test]
    fn test_expired_entry_reads_as_none() {
        let cache = MemoryKvCache::new();
        cache
            .set_with_ttl("k", "v", Duration::from_millis(0))
            .unwrap();
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(cache.get("k").unwrap(), None);
    }

    #[test]
    fn test_incr_counts_up_from_one() {
        let cache = MemoryKvCache::new();
        assert_eq!(cache.incr("counter").unwrap(), 1);
        assert_eq!(cache.incr("counter").unwrap(), 2);
        assert_eq!(cache.incr("counter").unwrap(), 3);
    }

    #[test]
    fn test_expired_counter_restarts() {
        let cache = MemoryKvCache::new();
        cache.incr("counter").unwrap();
        cache.expire("counter", Duration::from_millis(0)).unwrap();
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(cache.incr("counter").unwrap(), 1);
    }
}
