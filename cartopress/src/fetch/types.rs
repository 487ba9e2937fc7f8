//! Geographic data types flowing from fetch to render.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A point on the globe.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
}

impl GeoPoint {
    /// Creates a point from latitude and longitude in degrees.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

impl fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.4}, {:.4})", self.latitude, self.longitude)
    }
}

/// Axis-aligned bounding box in degrees.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    /// Westernmost longitude.
    pub min_lon: f64,
    /// Easternmost longitude.
    pub max_lon: f64,
    /// Southernmost latitude.
    pub min_lat: f64,
    /// Northernmost latitude.
    pub max_lat: f64,
}

/// Street network around one location.
///
/// The graph payload itself is opaque to the orchestration core; only the
/// node positions (for the bounding box) and edge count (for logging) are
/// inspected here.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StreetGraph {
    /// Node positions.
    pub nodes: Vec<GeoPoint>,

    /// Number of edges in the network.
    pub edge_count: usize,
}

impl StreetGraph {
    /// Computes the bounding box of the node set, None when the graph is
    /// empty.
    pub fn bounds(&self) -> Option<Bounds> {
        let first = self.nodes.first()?;
        let mut bounds = Bounds {
            min_lon: first.longitude,
            max_lon: first.longitude,
            min_lat: first.latitude,
            max_lat: first.latitude,
        };
        for node in &self.nodes[1..] {
            bounds.min_lon = bounds.min_lon.min(node.longitude);
            bounds.max_lon = bounds.max_lon.max(node.longitude);
            bounds.min_lat = bounds.min_lat.min(node.latitude);
            bounds.max_lat = bounds.max_lat.max(node.latitude);
        }
        Some(bounds)
    }
}

/// A set of polygon features (water bodies or parks).
///
/// Opaque to the core apart from its cardinality.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeatureSet {
    /// Number of features in the set.
    pub feature_count: usize,
}

impl FeatureSet {
    /// Creates a feature set of the given cardinality.
    pub fn new(feature_count: usize) -> Self {
        Self { feature_count }
    }

    /// True when the set carries no features.
    pub fn is_empty(&self) -> bool {
        self.feature_count == 0
    }
}

/// The three download sources.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DataSource {
    /// Street network (mandatory).
    Streets,
    /// Water features (optional).
    Water,
    /// Parks and green spaces (optional).
    Parks,
}

impl DataSource {
    /// Lowercase name for logs and progress messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Streets => "streets",
            Self::Water => "water",
            Self::Parks => "parks",
        }
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Aggregated geographic data for one location.
#[derive(Clone, Debug)]
pub struct MapBundle {
    /// Street network graph.
    pub graph: StreetGraph,

    /// Water features, absent for dry areas.
    pub water: Option<FeatureSet>,

    /// Park features, absent for unparked areas.
    pub parks: Option<FeatureSet>,

    /// Bounding box of the street graph.
    pub bounds: Bounds,
}
