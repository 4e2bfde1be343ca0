//! Environment metrics used when resolving relative CSS units.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    Landscape,
    Portrait,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorScheme {
    #[default]
    Light,
    Dark,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPreferences {
    pub color_scheme: ColorScheme,
    pub reduced_motion: bool,
}

/// Immutable snapshot of page environment metrics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContextMetrics {
    pub root_font_size: f64,
    pub device_pixel_ratio: f64,
    pub viewport_width: f64,
    pub viewport_height: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visual_viewport_width: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visual_viewport_height: Option<f64>,
    pub scroll_x: f64,
    pub scroll_y: f64,
    pub document_width: f64,
    pub document_height: f64,
    pub orientation: Orientation,
    pub preferences: UserPreferences,
}

impl Default for ContextMetrics {
    fn default() -> Self {
        Self {
            root_font_size: 16.0,
            device_pixel_ratio: 1.0,
            viewport_width: 1920.0,
            viewport_height: 1080.0,
            visual_viewport_width: None,
            visual_viewport_height: None,
            scroll_x: 0.0,
            scroll_y: 0.0,
            document_width: 1920.0,
            document_height: 1080.0,
            orientation: Orientation::Landscape,
            preferences: UserPreferences::default(),
        }
    }
}

impl ContextMetrics {
    /// Width of the dynamic (visual) viewport, falling back to the layout viewport.
    pub fn dynamic_width(&self) -> f64 {
        self.visual_viewport_width.unwrap_or(self.viewport_width)
    }

    pub fn dynamic_height(&self) -> f64 {
        self.visual_viewport_height.unwrap_or(self.viewport_height)
    }
}
