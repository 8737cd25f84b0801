//! CLI entry point for the district summary builder.
//!
//! With no subcommand every vintage is built from its default paths.

use anyhow::{Context, Result};
use cd_demographics::{Vintage, VintageSpec, vintage};
use clap::{Parser, Subcommand};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "cd_demographics")]
#[command(about = "Builds per-congressional-district demographic summaries", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the summary table for one vintage
    Build {
        /// Which extract to process (2018 or 2023)
        #[arg(value_name = "VINTAGE")]
        vintage: Vintage,

        /// Directory holding the raw CSV extracts
        #[arg(short = 'd', long)]
        data_dir: Option<PathBuf>,

        /// CSV file to write the summary to
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// JSON file replacing the built-in vintage configuration
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Build every vintage with default paths
    All,
    /// Print the built-in configuration of a vintage as JSON
    ShowConfig {
        #[arg(value_name = "VINTAGE")]
        vintage: Vintage,
    },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path = std::env::var("LOG_FILE_PATH")
        .unwrap_or_else(|_| "logs/cd_demographics.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("cd_demographics.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    match cli.command {
        None | Some(Commands::All) => {
            for v in Vintage::ALL {
                build(v, None, None, None)?;
            }
        }
        Some(Commands::Build {
            vintage,
            data_dir,
            output,
            config,
        }) => {
            build(vintage, data_dir, output, config)?;
        }
        Some(Commands::ShowConfig { vintage }) => {
            println!("{}", vintage.spec().to_json_pretty()?);
        }
    }

    Ok(())
}

/// Resolves paths (flag, then environment, then configuration) and runs one vintage.
fn build(
    v: Vintage,
    data_dir: Option<PathBuf>,
    output: Option<PathBuf>,
    config: Option<PathBuf>,
) -> Result<()> {
    let spec = match config {
        Some(path) => VintageSpec::load(&path)
            .with_context(|| format!("loading configuration {}", path.display()))?,
        None => v.spec(),
    };

    let input_dir = data_dir
        .or_else(|| std::env::var_os(v.data_dir_var()).map(PathBuf::from))
        .unwrap_or_else(|| spec.input_dir.clone());
    let output = output.unwrap_or_else(|| spec.output_file.clone());

    info!(
        vintage = %v,
        input_dir = %input_dir.display(),
        output = %output.display(),
        "Building district summary"
    );

    let summary = vintage::run(&spec, &input_dir, &output)
        .with_context(|| format!("building {v} summary from {}", input_dir.display()))?;

    info!(vintage = %v, districts = summary.table.len(), "Done");
    Ok(())
}
