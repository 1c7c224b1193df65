//! Post-run processing utilities.
//!
//! Verifies a finished run and builds the status line shown after it.

use crate::model::{RunResult, SortOutcome};

/// Result of post-run processing, ready for presentation layers.
#[derive(Debug, Clone)]
pub(crate) struct ProcessedRun {
    pub headline: String,
    pub is_sorted: bool,
    /// `None` when the result carries no initial sequence.
    pub values_preserved: Option<bool>,
}

/// Check ordering and value preservation, and summarise the run in one line.
pub(crate) fn process_run_completion(run: &RunResult) -> ProcessedRun {
    let is_sorted = run.sequence.windows(2).all(|w| w[0] <= w[1]);
    let values_preserved = if run.initial.is_empty() && !run.sequence.is_empty() {
        None
    } else {
        let mut a = run.initial.clone();
        let mut b = run.sequence.clone();
        a.sort_unstable();
        b.sort_unstable();
        Some(a == b)
    };

    if values_preserved == Some(false) {
        tracing::error!(algorithm = ?run.algorithm, "run lost or duplicated values");
    }

    let name = run.algorithm.name();
    let counts = format!(
        "{} comparisons, {} swaps in {:.3}s",
        run.stats.comparisons,
        run.stats.swaps,
        run.stats.elapsed_ms / 1000.0
    );
    let headline = match run.outcome {
        SortOutcome::Completed => format!("{name} finished: {counts}"),
        SortOutcome::Cancelled => format!("{name} stopped: {counts}"),
        SortOutcome::Faulted => format!("{name} failed after {counts}"),
    };

    ProcessedRun {
        headline,
        is_sorted,
        values_preserved,
    }
}
