use std::path::{Path, PathBuf};

use caliper_lib::{CaliperError, Config, ContextMetrics, ReconcileOptions, StyleFramework};

/// Resolved settings after merging CLI args and config file.
#[derive(Debug, Clone)]
pub struct ResolvedReconcileSettings {
    pub options: ReconcileOptions,
    pub metrics: ContextMetrics,
    pub tokens: Option<PathBuf>,
}

/// Merge CLI arguments with config file, preferring CLI values when given.
pub fn resolve_reconcile_settings(
    cli_framework: Option<StyleFramework>,
    cli_tokens: Option<PathBuf>,
    cli_metrics: Option<ContextMetrics>,
    config: &Config,
) -> ResolvedReconcileSettings {
    let mut options = ReconcileOptions::from(config);
    if let Some(framework) = cli_framework {
        options.framework = framework;
    }

    ResolvedReconcileSettings {
        options,
        metrics: cli_metrics.unwrap_or(config.metrics),
        tokens: cli_tokens.or_else(|| config.tokens.clone()),
    }
}

/// Load config from a TOML file, central config, or return defaults.
/// Priority: explicit path > ~/.config/caliper/config.toml > defaults
pub fn load_config(path: Option<&Path>) -> Result<Config, CaliperError> {
    let cfg = Config::load(path).map_err(|e| {
        let loc = path
            .map(|p| p.display().to_string())
            .or_else(|| Config::central_config_path().map(|p| p.display().to_string()))
            .unwrap_or_else(|| "defaults".to_string());
        CaliperError::Config(format!("Failed to read config {}: {}", loc, e))
    })?;

    cfg.validate().map_err(|e| {
        let prefix = path
            .map(|p| format!("Invalid config ({}): {}", p.display(), e))
            .unwrap_or_else(|| format!("Invalid config: {}", e));
        CaliperError::Config(prefix)
    })?;
    Ok(cfg)
}

/// Format effective settings as a single-line string.
pub fn format_effective_config(
    settings: &ResolvedReconcileSettings,
    config_source: Option<&Path>,
) -> String {
    let source = config_source
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "defaults".to_string());
    let options = &settings.options;
    let tokens = settings
        .tokens
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "none".to_string());
    format!(
        "Effective config [{source}]: viewport={}x{}, rootFontSize={}, framework={:?}, tokens={}, colorDeltaE={:.3}, pixelTolerance={:.1}, matching: candidate>={}, accept>={}, maxDepth={}",
        settings.metrics.viewport_width,
        settings.metrics.viewport_height,
        settings.metrics.root_font_size,
        options.framework,
        tokens,
        options.thresholds.color_delta_e,
        options.thresholds.pixel_tolerance,
        options.matching.candidate_floor,
        options.matching.accept_floor,
        options.matching.max_depth,
    )
}
