use std::path::PathBuf;
use std::process::ExitCode;

use caliper_lib::{
    reconcile_markup, CaliperError, CaliperOutput, InputDescriptor, ReconcileOutput,
    StyleFramework, CALIPER_OUTPUT_VERSION,
};
use tracing::debug;

use crate::cli::OutputFormat;
use crate::formatting::{render_error, write_output};
use crate::pipeline::{load_markup, load_metrics, load_rendered_tree, load_tokens};
use crate::settings::{format_effective_config, load_config, resolve_reconcile_settings};

/// Run the reconcile command.
#[allow(clippy::too_many_arguments)]
pub fn run_reconcile(
    config_path: Option<PathBuf>,
    rendered: PathBuf,
    markup: PathBuf,
    tokens: Option<PathBuf>,
    metrics: Option<PathBuf>,
    framework: Option<StyleFramework>,
    format: OutputFormat,
    output: Option<PathBuf>,
) -> ExitCode {
    let config = match load_config(config_path.as_deref()) {
        Ok(cfg) => cfg,
        Err(err) => return render_error(err, format, output),
    };
    let cli_metrics = match metrics.as_deref().map(load_metrics).transpose() {
        Ok(m) => m,
        Err(err) => return render_error(err, format, output),
    };
    let resolved = resolve_reconcile_settings(framework, tokens, cli_metrics, &config);
    debug!("{}", format_effective_config(&resolved, config_path.as_deref()));

    let tree = match load_rendered_tree(&rendered) {
        Ok(tree) => tree,
        Err(err) => return render_error(err, format, output),
    };
    let markup_source = match load_markup(&markup) {
        Ok(source) => source,
        Err(err) => return render_error(err, format, output),
    };
    let dictionary = match load_tokens(resolved.tokens.as_deref()) {
        Ok(dict) => dict,
        Err(err) => return render_error(err, format, output),
    };
    debug!(
        nodes = tree.root.walk().len(),
        binary = tree.binary,
        markup_len = markup_source.len(),
        "inputs loaded"
    );

    let report = reconcile_markup(
        &tree.root,
        &markup_source,
        &dictionary,
        &resolved.metrics,
        &resolved.options,
    );

    let body = CaliperOutput::Reconcile(ReconcileOutput {
        version: CALIPER_OUTPUT_VERSION.to_string(),
        input: InputDescriptor {
            rendered,
            markup,
            tokens: resolved.tokens,
            binary: tree.binary,
        },
        metrics: resolved.metrics,
        report,
    });
    if let Err(err) = write_output(&body, format, output.clone()) {
        return render_error(CaliperError::Unknown(err.to_string()), format, output);
    }
    ExitCode::SUCCESS
}
