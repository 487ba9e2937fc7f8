//! The geocoding service: cache → rate limit → upstream.

use super::{FixedWindowLimiter, KeyValueCache, KvError};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

/// Cached geocoding results live this long.
pub const GEOCODE_CACHE_TTL: Duration = Duration::from_secs(86_400 * 30);

/// Width of the upstream quota window.
pub const RATE_LIMIT_WINDOW: Duration = Duration::from_secs(60);

/// Upstream calls permitted per window, shared by all callers.
pub const RATE_LIMIT_MAX: i64 = 10;

/// Mandatory delay before every upstream call (resolver usage policy).
pub const UPSTREAM_PACING: Duration = Duration::from_secs(1);

/// Geocoding failures.
#[derive(Debug, Error)]
pub enum GeocodeError {
    /// The upstream resolver returned nothing for the place name.
    #[error("could not find coordinates for {city}, {country}")]
    NotFound {
        /// Requested city.
        city: String,
        /// Requested country.
        country: String,
    },

    /// The shared upstream quota is exhausted for this window.
    #[error("geocoding rate limit exceeded")]
    RateLimited,

    /// Transport-level failure talking to the resolver.
    #[error("geocoding failed: {0}")]
    Upstream(String),
}

/// A location returned by the upstream resolver.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResolvedLocation {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Full display name of the match.
    pub display_name: String,
}

/// Upstream geocoding capability (Nominatim-shaped).
pub trait GeocodeResolver: Send + Sync {
    /// Resolves a free-form "city, country" query.
    ///
    /// `Ok(None)` means the resolver answered but found nothing.
    fn resolve<'a>(
        &'a self,
        query: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<ResolvedLocation>, String>> + Send + 'a>>;
}

/// Result of a geocode lookup.
#[derive(Clone, Debug, PartialEq)]
pub struct GeocodeResult {
    /// Requested city.
    pub city: String,
    /// Requested country.
    pub country: String,
    /// Resolved latitude.
    pub latitude: f64,
    /// Resolved longitude.
    pub longitude: f64,
    /// Display name from the resolver.
    pub display_name: String,
    /// True when the result came from the cache without an upstream call.
    pub cache_hit: bool,
}

/// Rate-limited, cache-backed geocoding lookups.
pub struct GeocodeService {
    resolver: Arc<dyn GeocodeResolver>,
    cache: Arc<dyn KeyValueCache>,
    limiter: FixedWindowLimiter,
    cache_ttl: Duration,
    pacing: Duration,
}

impl GeocodeService {
    /// Creates a service with the production policy constants.
    pub fn new(resolver: Arc<dyn GeocodeResolver>, cache: Arc<dyn KeyValueCache>) -> Self {
        Self::with_policy(
            resolver,
            cache,
            GEOCODE_CACHE_TTL,
            RATE_LIMIT_WINDOW,
            RATE_LIMIT_MAX,
            UPSTREAM_PACING,
        )
    }

    /// Creates a service with explicit policy values.
    pub fn with_policy(
        resolver: Arc<dyn GeocodeResolver>,
        cache: Arc<dyn KeyValueCache>,
        cache_ttl: Duration,
        window: Duration,
        max_per_window: i64,
        pacing: Duration,
    ) -> Self {
        let limiter = FixedWindowLimiter::new(
            cache.clone(),
            "geocode:rate_limit",
            window,
            max_per_window,
        );
        Self {
            resolver,
            cache,
            limiter,
            cache_ttl,
            pacing,
        }
    }

    fn cache_key(city: &str, country: &str) -> String {
        format!(
            "geocode:{}:{}",
            city.to_lowercase(),
            country.to_lowercase()
        )
    }

    /// Resolves a (city, country) pair to coordinates.
    ///
    /// Checks the cache first; on a miss, consults the global rate limiter
    /// and then the upstream resolver (with the mandatory pacing delay).
    /// Successful upstream answers are written back to the cache.
    pub async fn geocode(&self, city: &str, country: &str) -> Result<GeocodeResult, GeocodeError> {
        let key = Self::cache_key(city, country);

        match self.cache.get(&key) {
            Ok(Some(raw)) => match serde_json::from_str::<ResolvedLocation>(&raw) {
                Ok(location) => {
                    info!(%city, %country, "geocoding cache hit");
                    return Ok(self.result(city, country, location, true));
                }
                Err(err) => {
                    warn!(%city, %country, error = %err, "discarding unreadable cached geocode entry");
                }
            },
            Ok(None) => {}
            Err(KvError::Unavailable(msg)) => {
                warn!(%city, %country, error = %msg, "geocode cache unavailable, continuing without it");
            }
        }

        if !self.limiter.check() {
            return Err(GeocodeError::RateLimited);
        }

        info!(%city, %country, "geocoding via upstream resolver");
        tokio::time::sleep(self.pacing).await;

        let query = format!("{}, {}", city, country);
        let location = self
            .resolver
            .resolve(&query)
            .await
            .map_err(GeocodeError::Upstream)?
            .ok_or_else(|| GeocodeError::NotFound {
                city: city.to_string(),
                country: country.to_string(),
            })?;

        match serde_json::to_string(&location) {
            Ok(raw) => {
                if let Err(KvError::Unavailable(msg)) =
                    self.cache.set_with_ttl(&key, &raw, self.cache_ttl)
                {
                    warn!(%city, %country, error = %msg, "failed to cache geocoding result");
                }
            }
            Err(err) => warn!(%city, %country, error = %err, "failed to encode geocoding result"),
        }

        Ok(self.result(city, country, location, false))
    }

    fn result(
        &self,
        city: &str,
        country: &str,
        location: ResolvedLocation,
        cache_hit: bool,
    ) -> GeocodeResult {
        GeocodeResult {
            city: city.to_string(),
            country: country.to_string(),
            latitude: location.latitude,
            longitude: location.longitude,
            display_name: location.display_name,
            cache_hit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geocode::MemoryKvCache;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedResolver {
        answer: Option<ResolvedLocation>,
        calls: AtomicUsize,
    }

    impl FixedResolver {
        fn new(answer: Option<ResolvedLocation>) -> Self {
            Self {
                answer,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl GeocodeResolver for FixedResolver {
        fn resolve<'a>(
            &'a self,
            _query: &'a str,
        ) -> Pin<Box<dyn Future<Output = Result<Option<ResolvedLocation>, String>> + Send + 'a>>
        {
            Box::pin(async move {
                self.calls.fetch_add(1, Ordering::SeqCst);
                Ok(self.answer.clone())
            })
        }
    }

    fn paris() -> ResolvedLocation {
        ResolvedLocation {
            latitude: 48.8566,
            longitude: 2.3522,
            display_name: "Paris, Île-de-France, France".to_string(),
        }
    }

    fn fast_service(resolver: Arc<FixedResolver>, max: i64) -> GeocodeService {
        GeocodeService::with_policy(
            resolver,
            Arc::new(MemoryKvCache::new()),
            Duration::from_secs(3600),
            Duration::from_secs(60),
            max,
            Duration::ZERO,
        )
    }

    #[tokio::test]
    async fn test_second_lookup_hits_cache() {
        let resolver = Arc::new(FixedResolver::new(Some(paris())));
        let service = fast_service(resolver.clone(), 10);

        let first = service.geocode("Paris", "France").await.unwrap();
        assert!(!first.cache_hit);

        let second = service.geocode("Paris", "France").await.unwrap();
        assert!(second.cache_hit);
        assert_eq!(second.latitude, first.latitude);
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cache_key_is_case_insensitive() {
        let resolver = Arc::new(FixedResolver::new(Some(paris())));
        let service = fast_service(resolver.clone(), 10);

        service.geocode("Paris", "France").await.unwrap();
        let second = service.geocode("PARIS", "FRANCE").await.unwrap();

        assert!(second.cache_hit);
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_miss_yields_not_found() {
        let resolver = Arc::new(FixedResolver::new(None));
        let service = fast_service(resolver, 10);

        let err = service.geocode("Atlantis", "Ocean").await.unwrap_err();
        assert!(matches!(err, GeocodeError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_rate_limit_blocks_eleventh_call() {
        let resolver = Arc::new(FixedResolver::new(Some(paris())));
        // Distinct cities so the cache never short-circuits.
        let service = fast_service(resolver.clone(), 10);

        for i in 0..10 {
            service
                .geocode(&format!("City{}", i), "Nowhere")
                .await
                .unwrap();
        }

        let err = service.geocode("City10", "Nowhere").await.unwrap_err();
        assert!(matches!(err, GeocodeError::RateLimited));
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 10);
    }

    #[tokio::test]
    async fn test_rate_limited_lookup_skips_upstream() {
        let resolver = Arc::new(FixedResolver::new(Some(paris())));
        let service = fast_service(resolver.clone(), 0);

        let err = service.geocode("Paris", "France").await.unwrap_err();
        assert!(matches!(err, GeocodeError::RateLimited));
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_cache_hit_bypasses_rate_limit() {
        let resolver = Arc::new(FixedResolver::new(Some(paris())));
        let service = fast_service(resolver.clone(), 1);

        service.geocode("Paris", "France").await.unwrap();
        // Quota is now spent, but the cached entry still answers.
        let hit = service.geocode("Paris", "France").await.unwrap();
        assert!(hit.cache_hit);
    }
}
