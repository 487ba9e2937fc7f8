//! Rate-limited, cache-backed geocoding.
//!
//! Place-name lookups go to a shared upstream resolver (Nominatim-shaped)
//! that imposes strict usage limits, so every lookup passes through a
//! long-TTL key-value cache and a global fixed-window rate limiter before
//! the network is touched. Cache and limiter unavailability is non-fatal:
//! availability wins over strict quota enforcement.

mod kv;
mod limiter;
mod service;

pub use kv::{KeyValueCache, KvError, MemoryKvCache};
pub use limiter::FixedWindowLimiter;
pub use service::{
    GeocodeError, GeocodeResolver, GeocodeResult, GeocodeService, ResolvedLocation,
    GEOCODE_CACHE_TTL, RATE_LIMIT_MAX, RATE_LIMIT_WINDOW, UPSTREAM_PACING,
};
