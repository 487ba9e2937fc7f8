//! Rendering boundary.
//!
//! The actual plotting of pixels is an opaque capability behind the
//! [`Renderer`] trait. The one hard rule the core enforces is that the
//! capability is not reentrant: it mutates global drawing state, so two
//! renders must never overlap in time. [`RenderSerializer`] makes that
//! constraint structural - every render in the process goes through one
//! serializer holding one lock.

mod serializer;

pub use serializer::RenderSerializer;

use crate::fetch::{GeoPoint, MapBundle};
use crate::theme::Theme;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use thiserror::Error;

/// Rendering failures.
#[derive(Debug, Error)]
pub enum RenderError {
    /// The renderer itself reported a failure.
    #[error("render failed: {0}")]
    Failed(String),

    /// The renderer reported success but produced no usable output file.
    #[error("render reported success but output file is missing or empty: {path}")]
    VerificationFailed {
        /// Expected output path.
        path: PathBuf,
    },
}

/// Render pipeline stages, reported in this fixed order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenderStage {
    /// Figure and canvas setup.
    Initializing,
    /// Water and park polygons.
    PlottingFeatures,
    /// Street network edges.
    PlottingRoads,
    /// Top and bottom gradient fades.
    AddingGradients,
    /// City name, country, and coordinates text.
    AddingTypography,
    /// Writing the output file.
    Saving,
}

impl RenderStage {
    /// All stages in reporting order.
    pub const ALL: [RenderStage; 6] = [
        Self::Initializing,
        Self::PlottingFeatures,
        Self::PlottingRoads,
        Self::AddingGradients,
        Self::AddingTypography,
        Self::Saving,
    ];

    /// Lowercase stage name for logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initializing => "initializing",
            Self::PlottingFeatures => "plotting_features",
            Self::PlottingRoads => "plotting_roads",
            Self::AddingGradients => "adding_gradients",
            Self::AddingTypography => "adding_typography",
            Self::Saving => "saving",
        }
    }
}

impl std::fmt::Display for RenderStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Callback fired as the renderer enters each stage.
pub type StageObserver<'a> = &'a (dyn Fn(RenderStage) + Send + Sync);

/// Everything the renderer needs for one poster.
#[derive(Clone)]
pub struct RenderRequest {
    /// Pre-fetched geographic data, shared across a batch's renders.
    pub bundle: Arc<MapBundle>,

    /// Theme palette.
    pub theme: Theme,

    /// City name for the typography.
    pub city: String,

    /// Country name for the typography.
    pub country: String,

    /// Centre point printed on the poster.
    pub point: GeoPoint,

    /// Where to write the rendered file.
    pub output_path: PathBuf,

    /// Page width in inches.
    pub width_inches: f64,

    /// Page height in inches.
    pub height_inches: f64,

    /// Output resolution.
    pub dpi: u32,
}

/// The opaque, non-reentrant rendering capability.
///
/// Implementations write the poster to `request.output_path`, invoking
/// `on_stage` as each stage begins. Callers must serialize invocations; use
/// [`RenderSerializer`] rather than calling this directly.
pub trait Renderer: Send + Sync {
    /// Renders one poster.
    fn render<'a>(
        &'a self,
        request: &'a RenderRequest,
        on_stage: StageObserver<'a>,
    ) -> Pin<Box<dyn Future<Output = Result<(), String>> + Send + 'a>>;
}

/// Thumbnail generation capability.
///
/// Failure here is non-fatal to the pipeline - the poster ships without a
/// thumbnail.
pub trait Thumbnailer: Send + Sync {
    /// Generates a thumbnail next to `image_path`, returning the thumbnail's
    /// path.
    fn generate(&self, image_path: &Path) -> Result<PathBuf, String>;
}
