//! Kabu Watchlist - weighted-rank watchlist generator for Japanese equities.
//!
//! Reads the latest snapshot and writes the general, growth and value
//! watchlists into the output directory.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use kabu_common::logging::{init_logging, LogFormat};
use kabu_watchlist::{run_pipeline, PipelineOptions};

#[derive(Parser, Debug)]
#[command(name = "kabu-watchlist")]
#[command(version)]
#[command(about = "Rank a JP equity snapshot into general, growth and value watchlists.", long_about = None)]
struct Cli {
    /// Snapshot table to rank
    #[arg(long, default_value = "jp_latest.csv")]
    input: PathBuf,

    /// Settings file; built-in defaults apply when absent
    #[arg(long, default_value = "config_jp.txt")]
    config: PathBuf,

    /// Directory receiving the watchlist files
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,

    /// Also write a Buy/Watch/Avoid market analysis report to this path
    #[arg(long)]
    analysis: Option<PathBuf>,

    /// Also write a JSON run summary to this path
    #[arg(long)]
    summary: Option<PathBuf>,

    /// Log level (overridden by RUST_LOG)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Log format: pretty or json
    #[arg(long, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(&cli.log_level, cli.log_format);

    tracing::info!("Kabu Watchlist v{}", env!("CARGO_PKG_VERSION"));

    let options = PipelineOptions {
        input: cli.input,
        config: cli.config,
        out_dir: cli.out_dir,
        analysis: cli.analysis,
        summary: cli.summary,
    };

    match run_pipeline(&options) {
        Ok(output) => {
            tracing::info!(files = output.written.len(), "{}", output.result.summary());
            Ok(())
        }
        Err(e) => {
            tracing::error!(error = format!("{:#}", e), "Watchlist run failed");
            Err(e)
        }
    }
}
