//! Fixed-window rate limiting over the shared key-value cache.

use super::{KeyValueCache, KvError};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Fixed-window counter limiter keyed globally, not per-caller.
///
/// The window state lives in the shared cache so the quota holds across all
/// processes talking to the same backend. When the cache is unavailable the
/// limiter answers "allowed" - losing quota enforcement is preferable to
/// refusing requests.
pub struct FixedWindowLimiter {
    cache: Arc<dyn KeyValueCache>,
    key: String,
    window: Duration,
    max_permits: i64,
}

impl FixedWindowLimiter {
    /// Creates a limiter over `cache` with the given window and permit count.
    pub fn new(
        cache: Arc<dyn KeyValueCache>,
        key: impl Into<String>,
        window: Duration,
        max_permits: i64,
    ) -> Self {
        Self {
            cache,
            key: key.into(),
            window,
            max_permits,
        }
    }

    /// Consumes one permit; returns true when the request is allowed.
    ///
    /// The first increment of a window arms its expiry; subsequent calls ride
    /// the same counter until the window lapses.
    pub fn check(&self) -> bool {
        let current = match self.cache.incr(&self.key) {
            Ok(n) => n,
            Err(KvError::Unavailable(msg)) => {
                warn!(key = %self.key, error = %msg, "rate limit check failed, allowing request");
                return true;
            }
        };

        if current == 1 {
            if let Err(KvError::Unavailable(msg)) = self.cache.expire(&self.key, self.window) {
                warn!(key = %self.key, error = %msg, "failed to arm rate limit window");
            }
        }

        current <= self.max_permits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geocode::MemoryKvCache;

    fn limiter(max: i64, window: Duration) -> FixedWindowLimiter {
        FixedWindowLimiter::new(Arc::new(MemoryKvCache::new()), "test:rate", window, max)
    }

    #[test]
    fn test_allows_up_to_max_permits() {
        let limiter = limiter(10, Duration::from_secs(60));
        for _ in 0..10 {
            assert!(limiter.check());
        }
        assert!(!limiter.check());
    }

    #[test]
    fn test_window_lapse_resets_quota() {
        let limiter = limiter(2, Duration::from_millis(20));
        assert!(limiter.check());
        assert!(limiter.check());
        assert!(!limiter.check());

        std::thread::sleep(Duration::from_millis(30));
        assert!(limiter.check());
    }

    #[test]
    fn test_unavailable_cache_allows() {
        struct BrokenCache;
        impl KeyValueCache for BrokenCache {
            fn get(&self, _: &str) -> Result<Option<String>, KvError> {
                Err(KvError::Unavailable("down".to_string()))
            }
            fn set_with_ttl(&self, _: &str, _: &str, _: Duration) -> Result<(), KvError> {
                Err(KvError::Unavailable("down".to_string()))
            }
            fn incr(&self, _: &str) -> Result<i64, KvError> {
                Err(KvError::Unavailable("down".to_string()))
            }
            fn expire(&self, _: &str, _: Duration) -> Result<(), KvError> {
                Err(KvError::Unavailable("down".to_string()))
            }
        }

        let limiter =
            FixedWindowLimiter::new(Arc::new(BrokenCache), "k", Duration::from_secs(60), 1);
        assert!(limiter.check());
        assert!(limiter.check());
    }
}
