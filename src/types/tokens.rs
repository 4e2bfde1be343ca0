//! Design-token dictionary types.

use std::fmt;
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::CaliperError;
use crate::Result;

/// A typography token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypographyToken {
    pub font_size: String,
    pub font_weight: String,
    pub font_family: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_height: Option<String>,
}

/// Token categories of a design system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TokenCategory {
    Color,
    Spacing,
    Typography,
    BorderRadius,
}

impl fmt::Display for TokenCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                TokenCategory::Color => "color",
                TokenCategory::Spacing => "spacing",
                TokenCategory::Typography => "typography",
                TokenCategory::BorderRadius => "borderRadius",
            }
        )
    }
}

/// Four independent name -> value maps.
///
/// Maps keep declaration order, so when the same literal value appears under
/// several names the first-declared name wins during resolution.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DesignTokenDictionary {
    #[serde(default)]
    pub colors: IndexMap<String, String>,
    #[serde(default)]
    pub spacing: IndexMap<String, String>,
    #[serde(default)]
    pub typography: IndexMap<String, TypographyToken>,
    #[serde(default)]
    pub border_radius: IndexMap<String, String>,
}

impl DesignTokenDictionary {
    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
            && self.spacing.is_empty()
            && self.typography.is_empty()
            && self.border_radius.is_empty()
    }

    /// Load a dictionary from a JSON, YAML or TOML file (chosen by extension).
    pub fn from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(CaliperError::Config(format!(
                "Token file not found: {}",
                path.display()
            )));
        }
        let content = std::fs::read_to_string(path)?;
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "json" => Ok(serde_json::from_str(&content)?),
            "yaml" | "yml" => Ok(serde_yaml::from_str(&content)?),
            "toml" => Ok(toml::from_str(&content)?),
            other => Err(CaliperError::Config(format!(
                "Unsupported token file extension '{}'. Supported: json, yaml, yml, toml.",
                other
            ))),
        }
    }
}
