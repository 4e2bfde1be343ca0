use caliper_lib::StyleFramework;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "caliper")]
#[command(
    version,
    about = "Caliper - Reconcile rendered interfaces against design-token annotated markup",
    long_about = "Caliper\n\nModes:\n- reconcile: pair a rendered element tree with design markup and report token-level deltas.\n- encode / decode: convert rendered trees between JSON and the binary wire format.\n- resolve: evaluate a CSS length expression (calc/clamp/min/max/var) to pixels.\n\nUse --help on any subcommand for details."
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(
        long,
        global = true,
        value_name = "PATH",
        help = "Optional config file (TOML) to set defaults for metrics/framework/thresholds/matching; CLI flags override config"
    )]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Reconcile a rendered tree against design markup
    Reconcile {
        #[arg(long, help = "Rendered tree (JSON, or binary produced by `caliper encode`)")]
        rendered: PathBuf,

        #[arg(long, help = "Design markup file (HTML-like)")]
        markup: PathBuf,

        #[arg(long, help = "Design token dictionary (.json, .yaml, .yml or .toml)")]
        tokens: Option<PathBuf>,

        #[arg(long, help = "Context metrics JSON (viewport, root font size, ...)")]
        metrics: Option<PathBuf>,

        #[arg(long, value_enum, help = "How classes in the markup are interpreted")]
        framework: Option<FrameworkArg>,

        #[arg(long, value_enum, default_value = "json", help = "Output format")]
        format: OutputFormat,

        #[arg(long, short, help = "Output file path (stdout if omitted)")]
        output: Option<PathBuf>,
    },

    /// Encode a JSON rendered tree into the binary wire format
    Encode {
        #[arg(long, help = "Rendered tree JSON")]
        input: PathBuf,

        #[arg(long, short, help = "Destination for the binary tree")]
        output: PathBuf,

        #[arg(long, value_enum, default_value = "json", help = "Status output format")]
        format: OutputFormat,
    },

    /// Decode a binary rendered tree back into JSON
    Decode {
        #[arg(long, help = "Binary rendered tree")]
        input: PathBuf,

        #[arg(
            long,
            short,
            help = "Write the decoded tree JSON to this file (embedded in stdout output if omitted)"
        )]
        output: Option<PathBuf>,

        #[arg(long, value_enum, default_value = "json", help = "Status output format")]
        format: OutputFormat,
    },

    /// Evaluate a CSS length expression to pixels
    Resolve {
        #[arg(help = "Expression, e.g. \"clamp(1rem, 2.5vw, 2rem)\"")]
        expression: String,

        #[arg(long, help = "Context metrics JSON (viewport, root font size, ...)")]
        metrics: Option<PathBuf>,

        #[arg(long, help = "Design token dictionary used by var(--name)")]
        tokens: Option<PathBuf>,

        #[arg(
            long,
            help = "CSS property (e.g. padding, color) used to look up the matching token"
        )]
        property: Option<String>,

        #[arg(long, value_enum, default_value = "json", help = "Output format")]
        format: OutputFormat,
    },
}

#[derive(Clone, Copy, ValueEnum)]
pub enum FrameworkArg {
    Tailwind,
    Css,
}

impl From<FrameworkArg> for StyleFramework {
    fn from(arg: FrameworkArg) -> Self {
        match arg {
            FrameworkArg::Tailwind => StyleFramework::Tailwind,
            FrameworkArg::Css => StyleFramework::Css,
        }
    }
}

#[derive(Clone, Copy, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Json,
    Pretty,
}

pub fn parse() -> Cli {
    Cli::parse()
}
