mod cli;
mod commands;
mod formatting;
mod pipeline;
mod settings;

use std::process::ExitCode;

use cli::Commands;
use commands::{run_decode, run_encode, run_reconcile, run_resolve};
use tracing::Level;

fn main() -> ExitCode {
    let args = cli::parse();
    init_tracing(args.verbose);

    match args.command {
        Commands::Reconcile {
            rendered,
            markup,
            tokens,
            metrics,
            framework,
            format,
            output,
        } => run_reconcile(
            args.config,
            rendered,
            markup,
            tokens,
            metrics,
            framework.map(Into::into),
            format,
            output,
        ),
        Commands::Encode {
            input,
            output,
            format,
        } => run_encode(input, output, format),
        Commands::Decode {
            input,
            output,
            format,
        } => run_decode(input, output, format),
        Commands::Resolve {
            expression,
            metrics,
            tokens,
            property,
            format,
        } => run_resolve(args.config, expression, metrics, tokens, property, format),
    }
}

/// Diagnostics go to stderr so stdout stays machine-readable.
fn init_tracing(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::WARN };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level)
        .with_target(false)
        .init();
}
