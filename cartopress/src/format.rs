//! Page format geometry.
//!
//! Jobs and posters carry their page format, orientation, DPI, and (for the
//! custom format) explicit dimensions. This module owns the arithmetic that
//! turns those into inch and pixel dimensions for the renderer.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Smallest accepted custom edge, in inches.
pub const MIN_PAGE_SIZE_INCHES: f64 = 5.0;

/// Largest accepted custom edge, in inches.
pub const MAX_PAGE_SIZE_INCHES: f64 = 40.0;

/// Errors in page geometry resolution.
#[derive(Debug, Error)]
pub enum FormatError {
    /// Custom format selected without both dimensions.
    #[error("custom format requires explicit width and height")]
    MissingCustomDimensions,

    /// A custom dimension is outside the accepted range.
    #[error("custom dimension {0} in is outside {MIN_PAGE_SIZE_INCHES}-{MAX_PAGE_SIZE_INCHES} in")]
    CustomDimensionOutOfRange(f64),
}

/// Supported page formats.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageFormat {
    /// Original 12x16 inch poster.
    #[default]
    Classic,
    /// ISO A4 (210x297 mm).
    A4,
    /// ISO A3 (297x420 mm).
    A3,
    /// ISO A2 (420x594 mm).
    A2,
    /// 30x40 cm print.
    Print30x40,
    /// 40x50 cm print.
    Print40x50,
    /// 50x70 cm print.
    Print50x70,
    /// User-defined dimensions.
    Custom,
}

impl PageFormat {
    /// Base portrait dimensions in inches, None for the custom format.
    fn base_inches(&self) -> Option<(f64, f64)> {
        match self {
            Self::Classic => Some((12.0, 16.0)),
            Self::A4 => Some((8.27, 11.69)),
            Self::A3 => Some((11.69, 16.54)),
            Self::A2 => Some((16.54, 23.39)),
            Self::Print30x40 => Some((11.81, 15.75)),
            Self::Print40x50 => Some((15.75, 19.69)),
            Self::Print50x70 => Some((19.69, 27.56)),
            Self::Custom => None,
        }
    }
}

/// Page orientation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    /// Height >= width.
    #[default]
    Portrait,
    /// Width >= height.
    Landscape,
}

/// Full page geometry for one job: format, orientation, DPI, and the custom
/// dimensions when the format requires them.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PageSpec {
    /// Selected page format.
    pub format: PageFormat,

    /// Portrait or landscape.
    pub orientation: Orientation,

    /// Output resolution in dots per inch.
    pub dpi: u32,

    /// Width in inches, required when `format` is Custom.
    pub custom_width_inches: Option<f64>,

    /// Height in inches, required when `format` is Custom.
    pub custom_height_inches: Option<f64>,
}

impl Default for PageSpec {
    fn default() -> Self {
        Self {
            format: PageFormat::Classic,
            orientation: Orientation::Portrait,
            dpi: 300,
            custom_width_inches: None,
            custom_height_inches: None,
        }
    }
}

impl PageSpec {
    /// Resolves the page to (width, height) in inches, applying orientation.
    pub fn dimensions_inches(&self) -> Result<(f64, f64), FormatError> {
        let (w, h) = match self.format.base_inches() {
            Some(dims) => dims,
            None => {
                let w = self
                    .custom_width_inches
                    .ok_or(FormatError::MissingCustomDimensions)?;
                let h = self
                    .custom_height_inches
                    .ok_or(FormatError::MissingCustomDimensions)?;
                for dim in [w, h] {
                    if !(MIN_PAGE_SIZE_INCHES..=MAX_PAGE_SIZE_INCHES).contains(&dim) {
                        return Err(FormatError::CustomDimensionOutOfRange(dim));
                    }
                }
                (w, h)
            }
        };

        Ok(match self.orientation {
            Orientation::Portrait => (w.min(h), w.max(h)),
            Orientation::Landscape => (w.max(h), w.min(h)),
        })
    }

    /// Resolves the page to (width, height) in pixels at the configured DPI.
    pub fn pixel_dimensions(&self) -> Result<(u32, u32), FormatError> {
        let (w, h) = self.dimensions_inches()?;
        Ok(((w * self.dpi as f64) as u32, (h * self.dpi as f64) as u32))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classic_portrait_dimensions() {
        let spec = PageSpec::default();
        assert_eq!(spec.dimensions_inches().unwrap(), (12.0, 16.0));
        assert_eq!(spec.pixel_dimensions().unwrap(), (3600, 4800));
    }

    #[test]
    fn test_landscape_swaps_axes() {
        let spec = PageSpec {
            orientation: Orientation::Landscape,
            ..PageSpec::default()
        };
        assert_eq!(spec.dimensions_inches().unwrap(), (16.0, 12.0));
    }

    #[test]
    fn test_a4_at_150_dpi() {
        let spec = PageSpec {
            format: PageFormat::A4,
            dpi: 150,
            ..PageSpec::default()
        };
        let (w, h) = spec.pixel_dimensions().unwrap();
        assert_eq!((w, h), (1240, 1753));
    }

    #[test]
    fn test_custom_requires_dimensions() {
        let spec = PageSpec {
            format: PageFormat::Custom,
            ..PageSpec::default()
        };
        assert!(matches!(
            spec.dimensions_inches(),
            Err(FormatError::MissingCustomDimensions)
        ));
    }

    #[test]
    fn test_custom_range_enforced() {
        let spec = PageSpec {
            format: PageFormat::Custom,
            custom_width_inches: Some(60.0),
            custom_height_inches: Some(20.0),
            ..PageSpec::default()
        };
        assert!(matches!(
            spec.dimensions_inches(),
            Err(FormatError::CustomDimensionOutOfRange(_))
        ));
    }

    #[test]
    fn test_custom_dimensions_resolve() {
        let spec = PageSpec {
            format: PageFormat::Custom,
            custom_width_inches: Some(10.0),
            custom_height_inches: Some(14.0),
            ..PageSpec::default()
        };
        assert_eq!(spec.dimensions_inches().unwrap(), (10.0, 14.0));
    }
}
