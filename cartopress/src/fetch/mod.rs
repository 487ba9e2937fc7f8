//! Geographic data acquisition.
//!
//! One location needs three downloads from the upstream map-data provider:
//! the street network (mandatory), water features, and parks (both optional -
//! sparse areas legitimately have neither). The [`FetchCoordinator`] runs the
//! three concurrently, reports per-source completion in arrival order, and
//! aggregates everything into a [`MapBundle`] for the renderer.

mod coordinator;
mod types;

pub use coordinator::{FetchCoordinator, FetchObserver, FETCH_WORKERS, POST_FETCH_PACING};
pub use types::{Bounds, DataSource, FeatureSet, GeoPoint, MapBundle, StreetGraph};

use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Fatal data-fetch failures.
///
/// Only the mandatory street-network download can produce one of these;
/// optional sources degrade to "absent" instead.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The street-network download failed.
    #[error("street network download failed: {0}")]
    Streets(String),

    /// The street network came back without any nodes, so no bounding box
    /// can be computed.
    #[error("street network is empty for the requested area")]
    EmptyStreetNetwork,
}

/// Upstream map-data download capability (OSM-shaped).
pub trait DataFetcher: Send + Sync {
    /// Downloads the street network around `point`. Failure is fatal to the
    /// requesting job.
    fn fetch_streets(
        &self,
        point: GeoPoint,
        distance: u32,
    ) -> Pin<Box<dyn Future<Output = Result<StreetGraph, String>> + Send + '_>>;

    /// Downloads water features around `point`. `Ok(None)` means the area has
    /// none; an error is treated the same way by the coordinator.
    fn fetch_water(
        &self,
        point: GeoPoint,
        distance: u32,
    ) -> Pin<Box<dyn Future<Output = Result<Option<FeatureSet>, String>> + Send + '_>>;

    /// Downloads parks and green spaces around `point`; same contract as
    /// [`DataFetcher::fetch_water`].
    fn fetch_parks(
        &self,
        point: GeoPoint,
        distance: u32,
    ) -> Pin<Box<dyn Future<Output = Result<Option<FeatureSet>, String>> + Send + '_>>;
}
