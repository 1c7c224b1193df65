use crate::model::{Algorithm, RunConfig, RunResult, SortEvent};
use crate::orchestrator::{self, Controller, UiCommand};
use anyhow::{Context, Result};
use clap::Parser;
use std::io::Write;
use std::time::Duration;
use tokio::sync::mpsc;

/// Output line routing for stdout/stderr writer.
enum OutputLine {
    Stdout(String),
    Stderr(String),
}

/// Spawn a blocking writer for stdout/stderr to avoid blocking async tasks.
fn spawn_output_writer() -> (
    mpsc::UnboundedSender<OutputLine>,
    tokio::task::JoinHandle<()>,
) {
    let (tx, mut rx) = mpsc::unbounded_channel::<OutputLine>();
    let handle = tokio::task::spawn_blocking(move || {
        let stdout = std::io::stdout();
        let stderr = std::io::stderr();
        let mut out = std::io::LineWriter::new(stdout.lock());
        let mut err = std::io::LineWriter::new(stderr.lock());

        while let Some(line) = rx.blocking_recv() {
            match line {
                OutputLine::Stdout(msg) => {
                    let _ = writeln!(out, "{}", msg);
                }
                OutputLine::Stderr(msg) => {
                    let _ = writeln!(err, "{}", msg);
                }
            }
        }

        let _ = out.flush();
        let _ = err.flush();
    });
    (tx, handle)
}

#[derive(Debug, Parser, Clone)]
#[command(
    name = "sortviz",
    version,
    about = "Animated bubble, selection and insertion sort in the terminal"
)]
pub struct Cli {
    /// Number of bars to sort
    #[arg(long, default_value_t = 50, value_parser = clap::value_parser!(u16).range(10..=150))]
    pub size: u16,

    /// Smallest generated value
    #[arg(long, default_value_t = 10)]
    pub min_value: u32,

    /// Largest generated value
    #[arg(long, default_value_t = 500)]
    pub max_value: u32,

    /// Animation speed in percent; each step waits (101 - speed) ms
    #[arg(long, default_value_t = 50, value_parser = clap::value_parser!(u8).range(1..=100))]
    pub speed: u8,

    /// Algorithm to run (initial selection in the TUI)
    #[arg(long, value_enum, default_value_t = Algorithm::Bubble)]
    pub algorithm: Algorithm,

    /// Seed for reproducible sequences
    #[arg(long)]
    pub seed: Option<u64>,

    /// Delay between frames of the final "settled" sweep
    #[arg(long, default_value = "20ms")]
    pub settle_delay: humantime::Duration,

    /// Run one sort, print a text summary and exit (no TUI)
    #[arg(long)]
    pub text: bool,

    /// Run one sort, print the result as JSON and exit (no TUI)
    #[arg(long)]
    pub json: bool,

    /// Disable step pacing (text/JSON modes only; the TUI always paces)
    #[arg(long)]
    pub instant: bool,

    /// Start sorting as soon as the TUI opens
    #[arg(long, default_value_t = false, action = clap::ArgAction::Set)]
    pub start_on_launch: bool,

    /// Write diagnostic logs to this file (TUI default: sortviz/sortviz.log
    /// under the user cache directory; headless default: stderr)
    #[arg(long)]
    pub log_file: Option<std::path::PathBuf>,
}

impl Cli {
    pub fn is_headless(&self) -> bool {
        self.text || self.json
    }
}

pub async fn run(args: Cli) -> Result<()> {
    if args.min_value > args.max_value {
        return Err(anyhow::anyhow!(
            "--min-value ({}) must not exceed --max-value ({})",
            args.min_value,
            args.max_value
        ));
    }

    if !args.is_headless() {
        #[cfg(feature = "tui")]
        {
            return crate::tui::run(args).await;
        }
        #[cfg(not(feature = "tui"))]
        {
            // Fallback when built without TUI support.
            return run_headless(args, false).await;
        }
    }

    run_headless(args.clone(), args.json).await
}

/// Build a `RunConfig` from CLI arguments.
pub fn build_config(args: &Cli) -> RunConfig {
    RunConfig {
        size: usize::from(args.size),
        min_value: args.min_value,
        max_value: args.max_value,
        speed: args.speed,
        algorithm: args.algorithm,
        seed: args.seed,
        settle_delay: Duration::from(args.settle_delay),
        // The TUI speed control needs a pacing sort.
        instant: args.instant && args.is_headless(),
    }
}

/// Steps between progress lines in text mode.
const PROGRESS_EVERY: u64 = 500;

/// Run a single sort without the TUI. `json` selects JSON over text output.
async fn run_headless(args: Cli, json: bool) -> Result<()> {
    let cfg = build_config(&args);
    let (event_tx, event_rx) = mpsc::unbounded_channel::<SortEvent>();
    let ctl = Controller::new(cfg, event_tx)?;
    let (out_tx, out_handle) = spawn_output_writer();

    let res = match drive_headless(ctl, event_rx, &out_tx, json).await {
        Ok(result) => emit_result(&out_tx, &result, json),
        Err(e) => Err(e),
    };

    drop(out_tx);
    let _ = out_handle.await;
    res
}

/// Start one run on `ctl`, report progress and return its result once the
/// controller has wound down. Faulted runs come back as results too.
async fn drive_headless(
    ctl: Controller,
    mut event_rx: mpsc::UnboundedReceiver<SortEvent>,
    out_tx: &mpsc::UnboundedSender<OutputLine>,
    json: bool,
) -> Result<RunResult> {
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<UiCommand>();

    // Ctrl-C stops the sort at its next step instead of killing the process.
    let sig_tx = cmd_tx.clone();
    let sig_handle = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = sig_tx.send(UiCommand::Stop);
        }
    });

    let controller = tokio::spawn(orchestrator::drive_controller(ctl, true, cmd_rx));

    let mut result = None;
    let mut frames = 0u64;
    // Ends when the controller returns and drops its sender.
    while let Some(ev) = event_rx.recv().await {
        match ev {
            SortEvent::RunCompleted { result: r } => {
                result = Some(*r);
                let _ = cmd_tx.send(UiCommand::Quit);
            }
            SortEvent::Info(info) if !json => {
                let _ = out_tx.send(OutputLine::Stderr(info.to_message()));
            }
            SortEvent::Frame { stats, .. } if !json => {
                frames += 1;
                if frames % PROGRESS_EVERY == 0 {
                    let _ = out_tx.send(OutputLine::Stderr(format!(
                        "… {} comparisons, {} swaps",
                        stats.comparisons, stats.swaps
                    )));
                }
            }
            _ => {}
        }
    }
    sig_handle.abort();

    controller.await.context("controller task failed")??;
    result.context("sort ended without a result")
}

fn emit_result(
    out_tx: &mpsc::UnboundedSender<OutputLine>,
    result: &RunResult,
    json: bool,
) -> Result<()> {
    if json {
        let out = serde_json::to_string_pretty(result)?;
        let _ = out_tx.send(OutputLine::Stdout(out));
        return Ok(());
    }
    let summary = crate::text_summary::build_text_summary(result);
    for line in summary.lines {
        let _ = out_tx.send(OutputLine::Stdout(line));
    }
    Ok(())
}
