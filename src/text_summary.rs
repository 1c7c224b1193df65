//! Text summary builder for CLI output.
//!
//! Formats human-readable lines for text mode.

use crate::model::{RunResult, SortOutcome};
use crate::orchestrator::process_run_completion;

/// Pre-formatted lines for text output.
pub(crate) struct TextSummary {
    pub lines: Vec<String>,
}

/// Longest sequence printed in full; longer ones are elided in the middle.
const MAX_PRINTED: usize = 24;

fn format_sequence(seq: &[u32]) -> String {
    if seq.len() <= MAX_PRINTED {
        return format!("{seq:?}");
    }
    let half = MAX_PRINTED / 2;
    let head: Vec<String> = seq[..half].iter().map(|v| v.to_string()).collect();
    let tail: Vec<String> = seq[seq.len() - half..].iter().map(|v| v.to_string()).collect();
    format!(
        "[{}, … {} more …, {}]",
        head.join(", "),
        seq.len() - MAX_PRINTED,
        tail.join(", ")
    )
}

/// Build a text summary from a finished run.
pub(crate) fn build_text_summary(result: &RunResult) -> TextSummary {
    let processed = process_run_completion(result);
    let mut lines = vec![processed.headline];

    lines.push(format!(
        "Algorithm:   {} ({})",
        result.algorithm.name(),
        result.algorithm.complexity()
    ));
    lines.push(format!("Elements:    {}", result.sequence.len()));
    lines.push(format!("Comparisons: {}", result.stats.comparisons));
    lines.push(format!("Swaps:       {}", result.stats.swaps));
    lines.push(format!("Time:        {:.3}s", result.stats.elapsed_ms / 1000.0));
    lines.push(format!("Input:       {}", format_sequence(&result.initial)));
    lines.push(format!("Output:      {}", format_sequence(&result.sequence)));

    if result.outcome == SortOutcome::Completed && !processed.is_sorted {
        lines.push("Warning: output is not in ascending order".into());
    }
    if processed.values_preserved == Some(false) {
        lines.push("Warning: output does not contain the input values".into());
    }

    TextSummary { lines }
}
