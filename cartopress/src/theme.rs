//! Theme capability.
//!
//! A theme is the colour palette a poster is rendered with. Theme storage is
//! an external concern; the core consumes it through [`ThemeStore`] and ships
//! an in-memory implementation for tests and the inline runtime.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;
use thiserror::Error;

/// Theme lookup errors.
#[derive(Debug, Error)]
pub enum ThemeError {
    /// No theme registered under the requested id.
    #[error("theme not found: {0}")]
    NotFound(String),
}

/// Colour palette for one poster style.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Theme {
    /// Theme identifier (e.g. "noir").
    pub id: String,

    /// Human-readable name.
    pub name: String,

    /// Background colour.
    pub bg: String,

    /// Text colour.
    pub text: String,

    /// Gradient fade colour.
    pub gradient_color: String,

    /// Water feature fill.
    pub water: String,

    /// Park feature fill.
    pub parks: String,

    /// Road colours by hierarchy level, motorway first.
    pub road_colors: Vec<String>,
}

impl Theme {
    /// The built-in fallback palette (feature-based monochrome shading).
    pub fn fallback() -> Self {
        Self {
            id: "feature_based".to_string(),
            name: "Feature-Based Shading".to_string(),
            bg: "#FFFFFF".to_string(),
            text: "#000000".to_string(),
            gradient_color: "#FFFFFF".to_string(),
            water: "#C0C0C0".to_string(),
            parks: "#F0F0F0".to_string(),
            road_colors: vec![
                "#0A0A0A".to_string(),
                "#1A1A1A".to_string(),
                "#2A2A2A".to_string(),
                "#3A3A3A".to_string(),
                "#4A4A4A".to_string(),
            ],
        }
    }
}

/// Theme lookup capability.
pub trait ThemeStore: Send + Sync {
    /// Loads the theme registered under `theme_id`.
    fn load(&self, theme_id: &str) -> Result<Theme, ThemeError>;

    /// Lists the available theme ids, sorted.
    fn available(&self) -> Vec<String>;
}

/// In-memory theme registry.
pub struct InMemoryThemeStore {
    themes: RwLock<HashMap<String, Theme>>,
}

impl InMemoryThemeStore {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            themes: RwLock::new(HashMap::new()),
        }
    }

    /// Creates a registry pre-populated with the fallback theme.
    pub fn with_fallback() -> Self {
        let store = Self::new();
        store.insert(Theme::fallback());
        store
    }

    /// Registers a theme, replacing any previous entry with the same id.
    pub fn insert(&self, theme: Theme) {
        if let Ok(mut themes) = self.themes.write() {
            themes.insert(theme.id.clone(), theme);
        }
    }
}

impl Default for InMemoryThemeStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ThemeStore for InMemoryThemeStore {
    fn load(&self, theme_id: &str) -> Result<Theme, ThemeError> {
        self.themes
            .read()
            .ok()
            .and_then(|themes| themes.get(theme_id).cloned())
            .ok_or_else(|| ThemeError::NotFound(theme_id.to_string()))
    }

    fn available(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .themes
            .read()
            .map(|themes| themes.keys().cloned().collect())
            .unwrap_or_default();
        ids.sort();
        ids
    }
}
