//! xagree CLI — agreement reports for feature-attribution methods.
//!
//! Reads per-entity attribution documents, computes agreement metrics and
//! writes one JSON report per run.

mod commands;

use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// xagree: how much do your explanation methods agree?
#[derive(Parser, Debug)]
#[command(name = "xagree", version, about, long_about = None)]
struct Cli {
    /// Workspace directory (holds .xagree/config.toml)
    #[arg(short, long, default_value = ".", global = true)]
    workspace: PathBuf,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Compute agreement metrics and write the report
    Run(RunArgs),
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Feature universe selection policy.
#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum PolicyArg {
    All,
    ZeroFiltered,
    ThresholdCommon,
}

/// Treatment of zero attributions in sign agreement.
#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum SignArg {
    Lenient,
    Strict,
}

/// Feature ordering read by overlap, sign agreement and correlation.
#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum ScopeArg {
    Filtered,
    Union,
}

#[derive(clap::Args, Debug, Default)]
struct RunArgs {
    /// Attribution JSON file, or a directory of JSON files
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Report output path
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Canonical method names, comma separated (e.g. SHAP,Lime,Inherent)
    #[arg(long, value_delimiter = ',')]
    methods: Option<Vec<String>>,

    /// Size of the top-importance sets compared by overlap
    #[arg(short = 'k', long)]
    top_k: Option<usize>,

    /// Feature universe selection policy
    #[arg(long, value_enum)]
    policy: Option<PolicyArg>,

    /// Magnitude threshold for the threshold-common policy
    #[arg(long)]
    threshold: Option<f64>,

    /// Sign agreement policy
    #[arg(long, value_enum)]
    sign_policy: Option<SignArg>,

    /// Feature ordering for overlap, sign agreement and correlation
    #[arg(long, value_enum)]
    scope: Option<ScopeArg>,

    /// Feature ordering for correlation only (overrides --scope)
    #[arg(long, value_enum)]
    correlation_scope: Option<ScopeArg>,

    /// Also compute the collinearity diagnostic
    #[arg(long)]
    collinearity: bool,

    /// Skip top-k overlap
    #[arg(long)]
    no_overlap: bool,

    /// Skip sign agreement
    #[arg(long)]
    no_sign: bool,

    /// Skip pairwise correlation
    #[arg(long)]
    no_correlation: bool,

    /// Write the report without indentation
    #[arg(long)]
    compact: bool,
}

#[derive(clap::Subcommand, Debug)]
enum ConfigAction {
    /// Create default configuration file
    Init,
    /// Show current configuration
    Show,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Set up tracing: human-readable stderr + JSON file logging
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::new(filter));

    let log_dir = directories::ProjectDirs::from("dev", "xagree", "xagree")
        .map(|d| d.data_dir().join("logs"))
        .unwrap_or_else(|| PathBuf::from("."));
    let _ = std::fs::create_dir_all(&log_dir);
    let file_appender = tracing_appender::rolling::daily(&log_dir, "xagree.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let json_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(non_blocking)
        .with_filter(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let workspace = cli
        .workspace
        .canonicalize()
        .unwrap_or_else(|_| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

    commands::handle_command(cli.command, &workspace, cli.config.as_deref()).await
}
