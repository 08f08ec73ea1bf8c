use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::ConfigError;

/// Environment variable pointing at an optional JSON config file (native only).
pub const CONFIG_ENV_VAR: &str = "GEOVIEW_CONFIG";

/// Tunables for the viewer.
///
/// Every field has a default, so a config file only needs the keys it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)] // missing keys fall back to the defaults below
pub struct ViewerConfig {
    /// Largest upload accepted, in bytes
    pub max_upload_bytes: usize,
    /// Screen padding around data when the camera frames an upload
    pub camera_padding: f32,
    /// Color used for shapes without a `color` attribute, as `#rrggbb`
    pub default_color: String,
    /// Initial camera center as `[longitude, latitude]`
    pub initial_center: [f64; 2],
    /// Initial zoom level
    pub initial_zoom: f64,
    /// Radius of rendered points, in screen pixels
    pub point_radius: f32,
    /// Width of rendered lines and polygon outlines, in screen pixels
    pub line_width: f32,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            max_upload_bytes: 500 * 1024,
            camera_padding: 40.0,
            default_color: "#000000".to_owned(),
            initial_center: [0.0, 0.0],
            initial_zoom: 2.0,
            point_radius: 5.0,
            line_width: 2.0,
        }
    }
}

impl ViewerConfig {
    /// Parse a config from JSON text.
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Read a config from a JSON file.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Load the config named by [`CONFIG_ENV_VAR`], falling back to defaults.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn from_env() -> Self {
        let Some(path) = std::env::var_os(CONFIG_ENV_VAR) else {
            return Self::default();
        };
        match Self::from_path(Path::new(&path)) {
            Ok(config) => {
                log::info!("Loaded viewer config from {}", Path::new(&path).display());
                config
            }
            Err(err) => {
                log::warn!("Ignoring viewer config {}: {}", Path::new(&path).display(), err);
                Self::default()
            }
        }
    }

    /// The default shape color as an egui color.
    pub fn default_color32(&self) -> egui::Color32 {
        egui::Color32::from_hex(&self.default_color).unwrap_or(egui::Color32::BLACK)
    }
}
