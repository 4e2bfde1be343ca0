use std::path::PathBuf;
use std::process::ExitCode;

use caliper_lib::{
    to_pixels, CaliperError, CaliperOutput, ResolveOptions, ResolveOutput, TokenIndex,
    CALIPER_OUTPUT_VERSION,
};
use tracing::debug;

use crate::cli::OutputFormat;
use crate::formatting::{render_error, write_output};
use crate::pipeline::{load_metrics, load_tokens};
use crate::settings::load_config;

/// Run the resolve command.
pub fn run_resolve(
    config_path: Option<PathBuf>,
    expression: String,
    metrics: Option<PathBuf>,
    tokens: Option<PathBuf>,
    property: Option<String>,
    format: OutputFormat,
) -> ExitCode {
    let config = match load_config(config_path.as_deref()) {
        Ok(cfg) => cfg,
        Err(err) => return render_error(err, format, None),
    };
    let context = match metrics.as_deref().map(load_metrics).transpose() {
        Ok(m) => m.unwrap_or(config.metrics),
        Err(err) => return render_error(err, format, None),
    };
    let token_path = tokens.or_else(|| config.tokens.clone());
    let dictionary = match load_tokens(token_path.as_deref()) {
        Ok(dict) => dict,
        Err(err) => return render_error(err, format, None),
    };

    let options = ResolveOptions {
        tokens: Some(&dictionary),
        ..ResolveOptions::default()
    };
    let pixels = to_pixels(&expression, &context, &options);
    let token_name = property.as_deref().and_then(|property| {
        TokenIndex::build(&dictionary, &context, config.thresholds)
            .find_token_by_value(property, &expression, None)
    });
    debug!(%expression, pixels, token = ?token_name, "expression resolved");

    let body = CaliperOutput::Resolve(ResolveOutput {
        version: CALIPER_OUTPUT_VERSION.to_string(),
        expression,
        pixels,
        token_name,
    });
    if let Err(err) = write_output(&body, format, None) {
        return render_error(CaliperError::Unknown(err.to_string()), format, None);
    }
    ExitCode::SUCCESS
}
