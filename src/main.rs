mod cli;
mod engine;
mod model;
mod orchestrator;
mod text_summary;
#[cfg(feature = "tui")]
mod tui;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Debug, PartialEq, Eq)]
enum LogTarget {
    File(PathBuf),
    Stderr,
}

/// Where diagnostics go. The TUI owns the terminal, so without `--log-file`
/// it logs to a file in the user cache directory.
fn log_target(args: &cli::Cli) -> LogTarget {
    match &args.log_file {
        Some(path) => LogTarget::File(path.clone()),
        None if args.is_headless() => LogTarget::Stderr,
        None => LogTarget::File(default_log_path()),
    }
}

fn default_log_path() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("sortviz")
        .join("sortviz.log")
}

fn init_logging(args: &cli::Cli) -> Result<()> {
    let target = log_target(args);
    let default_level = match target {
        LogTarget::File(_) => "info",
        LogTarget::Stderr => "warn",
    };
    let filter =
        EnvFilter::try_from_env("SORTVIZ_LOG").unwrap_or_else(|_| EnvFilter::new(default_level));
    match target {
        LogTarget::File(path) => {
            if let Some(dir) = path.parent() {
                std::fs::create_dir_all(dir)
                    .with_context(|| format!("create log directory {}", dir.display()))?;
            }
            let file = std::fs::File::create(&path)
                .with_context(|| format!("create log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(std::sync::Mutex::new(file))
                .init();
        }
        LogTarget::Stderr => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();
    init_logging(&args)?;
    cli::run(args).await
}
