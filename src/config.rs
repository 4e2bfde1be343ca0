use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::CaliperError;
use crate::markup::StyleFramework;
use crate::matcher::MatchingOptions;
use crate::reconcile::ReconcileOptions;
use crate::tokens::TokenThresholds;
use crate::types::ContextMetrics;
use crate::Result;

/// File-backed settings. Every section is optional in TOML.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub metrics: ContextMetrics,
    pub framework: StyleFramework,
    pub thresholds: TokenThresholds,
    pub matching: MatchingOptions,
    /// Token dictionary used when no `--tokens` flag is given.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokens: Option<PathBuf>,
}

impl Config {
    /// Load from `path`, else the central config file, else defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                if !path.exists() {
                    return Err(CaliperError::config(format!(
                        "Config file not found: {}",
                        path.display()
                    )));
                }
                Self::from_file(path)
            }
            None => match Self::central_config_path().filter(|p| p.exists()) {
                Some(central) => Self::from_file(&central),
                None => Ok(Self::default()),
            },
        }
    }

    fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&raw)?)
    }

    /// `$XDG_CONFIG_HOME/caliper/config.toml`, falling back to
    /// `~/.config/caliper/config.toml`.
    pub fn central_config_path() -> Option<PathBuf> {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")))?;
        Some(base.join("caliper").join("config.toml"))
    }

    pub fn validate(&self) -> std::result::Result<(), String> {
        let m = &self.metrics;
        if !(m.viewport_width > 0.0 && m.viewport_height > 0.0) {
            return Err(format!(
                "metrics viewport must be positive (got {}x{})",
                m.viewport_width, m.viewport_height
            ));
        }
        if !(m.root_font_size > 0.0) {
            return Err(format!(
                "metrics.rootFontSize must be positive (got {})",
                m.root_font_size
            ));
        }
        if !(m.device_pixel_ratio > 0.0) {
            return Err(format!(
                "metrics.devicePixelRatio must be positive (got {})",
                m.device_pixel_ratio
            ));
        }
        if !(self.thresholds.color_delta_e >= 0.0) {
            return Err(format!(
                "thresholds.colorDeltaE must be >= 0 (got {})",
                self.thresholds.color_delta_e
            ));
        }
        if !(self.thresholds.pixel_tolerance >= 0.0) {
            return Err(format!(
                "thresholds.pixelTolerance must be >= 0 (got {})",
                self.thresholds.pixel_tolerance
            ));
        }
        if self.matching.accept_floor > 100 || self.matching.candidate_floor > 100 {
            return Err(format!(
                "matching floors must be within 0..=100 (candidateFloor {}, acceptFloor {})",
                self.matching.candidate_floor, self.matching.accept_floor
            ));
        }
        if self.matching.max_depth == 0 {
            return Err("matching.maxDepth must be at least 1".to_string());
        }
        Ok(())
    }
}

impl From<&Config> for ReconcileOptions {
    fn from(config: &Config) -> Self {
        Self {
            framework: config.framework,
            thresholds: config.thresholds,
            matching: config.matching,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_values_match_expected() {
        let cfg = Config::default();

        assert_eq!(cfg.metrics.viewport_width, 1920.0);
        assert_eq!(cfg.metrics.viewport_height, 1080.0);
        assert_eq!(cfg.metrics.root_font_size, 16.0);
        assert_eq!(cfg.framework, StyleFramework::Tailwind);
        assert!((cfg.thresholds.color_delta_e - 0.05).abs() < f32::EPSILON);
        assert_eq!(cfg.thresholds.pixel_tolerance, 2.0);
        assert_eq!(cfg.matching.candidate_floor, 10);
        assert_eq!(cfg.matching.accept_floor, 30);
        assert_eq!(cfg.matching.max_depth, 64);
        assert!(cfg.tokens.is_none());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let cfg: Config = toml::from_str(
            r#"
framework = "css"
tokens = "design/tokens.json"

[metrics]
viewportWidth = 390
viewportHeight = 844

[thresholds]
pixelTolerance = 1.0
"#,
        )
        .expect("parse config");

        assert_eq!(cfg.framework, StyleFramework::Css);
        assert_eq!(cfg.metrics.viewport_width, 390.0);
        assert_eq!(cfg.metrics.root_font_size, 16.0);
        assert_eq!(cfg.thresholds.pixel_tolerance, 1.0);
        assert!((cfg.thresholds.color_delta_e - 0.05).abs() < f32::EPSILON);
        assert_eq!(cfg.matching, MatchingOptions::default());
        assert_eq!(cfg.tokens, Some(PathBuf::from("design/tokens.json")));
    }

    #[test]
    fn load_reads_explicit_path() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "[matching]\nacceptFloor = 45").expect("write config");

        let cfg = Config::load(Some(file.path())).expect("load config");
        assert_eq!(cfg.matching.accept_floor, 45);
    }

    #[test]
    fn load_missing_explicit_path_is_an_error() {
        let err = Config::load(Some(Path::new("/definitely/not/here.toml")))
            .expect_err("missing file should fail");
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn validate_rejects_bad_values() {
        let mut cfg = Config::default();
        cfg.metrics.root_font_size = 0.0;
        assert!(cfg.validate().unwrap_err().contains("rootFontSize"));

        let mut cfg = Config::default();
        cfg.matching.accept_floor = 150;
        assert!(cfg.validate().unwrap_err().contains("acceptFloor"));

        let mut cfg = Config::default();
        cfg.thresholds.pixel_tolerance = -1.0;
        assert!(cfg.validate().unwrap_err().contains("pixelTolerance"));
    }

    #[test]
    fn reconcile_options_follow_config() {
        let cfg = Config {
            framework: StyleFramework::Css,
            ..Config::default()
        };
        let options = ReconcileOptions::from(&cfg);
        assert_eq!(options.framework, StyleFramework::Css);
        assert_eq!(options.matching, cfg.matching);
    }
}
