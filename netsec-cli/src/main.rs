//! netsec CLI: train the network-security classifier and score batches with it.

mod commands;

use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// netsec: staged training pipeline for the network-security classifier
#[derive(Parser, Debug)]
#[command(name = "netsec", version, about, long_about = None)]
struct Cli {
    /// Workspace directory (holds netsec.toml; relative settings paths resolve here)
    #[arg(short, long, default_value = ".")]
    workspace: PathBuf,

    /// Settings file path (overrides <workspace>/netsec.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Run ingestion, validation, transformation and training once
    Train {
        /// Source CSV file
        #[arg(long)]
        source: Option<PathBuf>,

        /// Expected schema (YAML)
        #[arg(long)]
        schema: Option<PathBuf>,

        /// Directory that receives one timestamped folder per run
        #[arg(long)]
        artifact_root: Option<PathBuf>,

        /// Global seed
        #[arg(long)]
        seed: Option<u64>,

        /// What to do when validation fails
        #[arg(long, value_enum)]
        validation_policy: Option<commands::PolicyArg>,
    },
    /// Predict one label per record of a CSV file with a trained model
    Predict {
        /// Persisted model (model/trained_model/model.json of a run)
        #[arg(long)]
        model: PathBuf,

        /// Input CSV file
        #[arg(long)]
        input: PathBuf,

        /// Output CSV file
        #[arg(long, default_value = "prediction_output/output.csv")]
        output: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
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

    let log_dir = directories::ProjectDirs::from("dev", "netsec", "netsec")
        .map(|d| d.data_dir().join("logs"))
        .unwrap_or_else(|| PathBuf::from("logs"));
    let _ = std::fs::create_dir_all(&log_dir);
    let file_appender = tracing_appender::rolling::daily(&log_dir, "netsec.log");
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
        .unwrap_or_else(|_| cli.workspace.clone());

    commands::handle_command(cli.command, &workspace, cli.config.as_deref())
}
