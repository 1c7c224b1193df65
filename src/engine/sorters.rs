//! Step-producing sorting routines.
//!
//! Each routine mutates the slice in place and reports every comparison and
//! swap to a [`Stepper`]. Cancellation is polled before each comparison and
//! each swap; a cancelled run leaves a permutation of the input behind.

use crate::model::{Algorithm, Role, SortOutcome, Stats, Step, StepKind};

/// Receiver of sorting progress.
pub trait Stepper {
    fn is_cancelled(&self) -> bool;

    /// Called after each step with the sequence as it stands afterwards.
    fn on_step(&mut self, sequence: &[u32], stats: &Stats, step: Step);
}

pub fn sort<S: Stepper + ?Sized>(
    algorithm: Algorithm,
    seq: &mut [u32],
    stats: &mut Stats,
    stepper: &mut S,
) -> SortOutcome {
    match algorithm {
        Algorithm::Bubble => bubble_sort(seq, stats, stepper),
        Algorithm::Selection => selection_sort(seq, stats, stepper),
        Algorithm::Insertion => insertion_sort(seq, stats, stepper),
    }
}

fn bubble_sort<S: Stepper + ?Sized>(
    seq: &mut [u32],
    stats: &mut Stats,
    stepper: &mut S,
) -> SortOutcome {
    let n = seq.len();
    for i in 0..n {
        let mut swapped = false;
        // The last `i` slots already hold their final values.
        let tail = n - i..n;
        for j in 0..n.saturating_sub(i + 1) {
            if stepper.is_cancelled() {
                return SortOutcome::Cancelled;
            }
            stats.comparisons += 1;
            stepper.on_step(
                seq,
                stats,
                Step::new(StepKind::Compare)
                    .settled(tail.clone())
                    .with(j, Role::Compared)
                    .with(j + 1, Role::Compared),
            );

            if seq[j] > seq[j + 1] {
                if stepper.is_cancelled() {
                    return SortOutcome::Cancelled;
                }
                seq.swap(j, j + 1);
                stats.swaps += 1;
                swapped = true;
                stepper.on_step(
                    seq,
                    stats,
                    Step::new(StepKind::Swap)
                        .settled(tail.clone())
                        .with(j, Role::Swapping)
                        .with(j + 1, Role::Swapping),
                );
            }
        }
        if !swapped {
            break;
        }
    }
    SortOutcome::Completed
}

fn selection_sort<S: Stepper + ?Sized>(
    seq: &mut [u32],
    stats: &mut Stats,
    stepper: &mut S,
) -> SortOutcome {
    let n = seq.len();
    for i in 0..n {
        let mut min_idx = i;
        for j in i + 1..n {
            if stepper.is_cancelled() {
                return SortOutcome::Cancelled;
            }
            stats.comparisons += 1;
            stepper.on_step(
                seq,
                stats,
                Step::new(StepKind::Compare)
                    .settled(0..i)
                    .with(min_idx, Role::Pivot)
                    .with(j, Role::Compared),
            );
            if seq[j] < seq[min_idx] {
                min_idx = j;
            }
        }

        if min_idx != i {
            if stepper.is_cancelled() {
                return SortOutcome::Cancelled;
            }
            seq.swap(i, min_idx);
            stats.swaps += 1;
            stepper.on_step(
                seq,
                stats,
                Step::new(StepKind::Swap)
                    .settled(0..i)
                    .with(i, Role::Swapping)
                    .with(min_idx, Role::Swapping),
            );
        }
    }
    SortOutcome::Completed
}

/// Insertion by adjacent swaps: the key travels left one slot per shift, so
/// the slice stays a permutation of its input between any two steps.
fn insertion_sort<S: Stepper + ?Sized>(
    seq: &mut [u32],
    stats: &mut Stats,
    stepper: &mut S,
) -> SortOutcome {
    for i in 1..seq.len() {
        if stepper.is_cancelled() {
            return SortOutcome::Cancelled;
        }
        stepper.on_step(
            seq,
            stats,
            Step::new(StepKind::Select)
                .settled(0..i)
                .with(i, Role::Pivot),
        );

        let mut j = i;
        while j > 0 {
            if stepper.is_cancelled() {
                return SortOutcome::Cancelled;
            }
            stats.comparisons += 1;
            stepper.on_step(
                seq,
                stats,
                Step::new(StepKind::Compare)
                    .settled(0..j - 1)
                    .with(j - 1, Role::Compared)
                    .with(j, Role::Pivot),
            );
            if seq[j - 1] <= seq[j] {
                break;
            }

            if stepper.is_cancelled() {
                return SortOutcome::Cancelled;
            }
            seq.swap(j - 1, j);
            stats.swaps += 1;
            stepper.on_step(
                seq,
                stats,
                Step::new(StepKind::Swap)
                    .settled(0..j - 1)
                    .with(j - 1, Role::Pivot)
                    .with(j, Role::Swapping),
            );
            j -= 1;
        }
    }
    SortOutcome::Completed
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    /// Records every step and optionally cancels after a fixed number of them.
    #[derive(Default)]
    struct Recorder {
        steps: Vec<Step>,
        cancel_after: Option<usize>,
        counters: Vec<(u64, u64)>,
    }

    impl Stepper for Recorder {
        fn is_cancelled(&self) -> bool {
            self.cancel_after.is_some_and(|n| self.steps.len() >= n)
        }

        fn on_step(&mut self, _sequence: &[u32], stats: &Stats, step: Step) {
            self.counters.push((stats.comparisons, stats.swaps));
            self.steps.push(step);
        }
    }

    fn run(algorithm: Algorithm, input: &[u32]) -> (Vec<u32>, Stats, Recorder) {
        let mut seq = input.to_vec();
        let mut stats = Stats::start();
        let mut rec = Recorder::default();
        let outcome = sort(algorithm, &mut seq, &mut stats, &mut rec);
        assert_eq!(outcome, SortOutcome::Completed);
        (seq, stats, rec)
    }

    fn sorted_copy(input: &[u32]) -> Vec<u32> {
        let mut v = input.to_vec();
        v.sort_unstable();
        v
    }

    #[test]
    fn bubble_small_scenario() {
        let (seq, stats, _) = run(Algorithm::Bubble, &[5, 3, 8, 1]);
        assert_eq!(seq, vec![1, 3, 5, 8]);
        assert_eq!(stats.comparisons, 6);
        // One swap per inversion: (5,3) (5,1) (3,1) (8,1).
        assert_eq!(stats.swaps, 4);
    }

    #[test]
    fn selection_small_scenario() {
        let (seq, stats, _) = run(Algorithm::Selection, &[5, 3, 8, 1]);
        assert_eq!(seq, vec![1, 3, 5, 8]);
        assert_eq!(stats.comparisons, 6);
        // Position 1 already holds its minimum, so it is not swapped.
        assert_eq!(stats.swaps, 2);
    }

    #[test]
    fn insertion_small_scenario() {
        let (seq, stats, _) = run(Algorithm::Insertion, &[5, 3, 8, 1]);
        assert_eq!(seq, vec![1, 3, 5, 8]);
        assert_eq!(stats.comparisons, 5);
        assert_eq!(stats.swaps, 4);
    }

    #[test]
    fn bubble_exits_after_clean_pass() {
        let (_, stats, _) = run(Algorithm::Bubble, &[1, 2, 3, 4, 5]);
        assert_eq!(stats.comparisons, 4);
        assert_eq!(stats.swaps, 0);
    }

    #[test]
    fn empty_and_singleton_inputs_complete() {
        for alg in Algorithm::ALL {
            let (seq, stats, rec) = run(alg, &[]);
            assert!(seq.is_empty());
            assert_eq!(stats.comparisons, 0);
            assert!(rec.steps.is_empty());

            let (seq, stats, _) = run(alg, &[9]);
            assert_eq!(seq, vec![9]);
            assert_eq!(stats.swaps, 0);
        }
    }

    #[test]
    fn steps_carry_expected_roles() {
        let (_, _, rec) = run(Algorithm::Selection, &[3, 1, 2]);
        let first = &rec.steps[0];
        assert_eq!(first.kind, StepKind::Compare);
        assert_eq!(first.roles.get(&0), Some(&Role::Pivot));
        assert_eq!(first.roles.get(&1), Some(&Role::Compared));

        let (_, _, rec) = run(Algorithm::Insertion, &[2, 1]);
        assert_eq!(rec.steps[0].kind, StepKind::Select);
        assert_eq!(rec.steps[0].roles.get(&1), Some(&Role::Pivot));
        assert!(rec.steps.iter().any(|s| s.kind == StepKind::Swap
            && s.roles.values().any(|r| *r == Role::Swapping)));
    }

    #[test]
    fn cancel_after_first_comparison_stops_immediately() {
        let input: Vec<u32> = (0..100).rev().collect();
        for alg in Algorithm::ALL {
            let mut seq = input.clone();
            let mut stats = Stats::start();
            let mut rec = Recorder {
                // Insertion emits a highlight-only step before its first comparison.
                cancel_after: Some(if alg == Algorithm::Insertion { 2 } else { 1 }),
                ..Default::default()
            };
            let outcome = sort(alg, &mut seq, &mut stats, &mut rec);
            assert_eq!(outcome, SortOutcome::Cancelled, "{alg:?}");
            assert_eq!(stats.comparisons, 1, "{alg:?}");
            assert_eq!(stats.swaps, 0, "{alg:?}");
            assert_eq!(seq, input, "{alg:?}");
        }
    }

    #[test]
    fn counters_never_decrease() {
        for alg in Algorithm::ALL {
            let (_, _, rec) = run(alg, &[9, 4, 7, 1, 8, 2, 2, 6]);
            for w in rec.counters.windows(2) {
                assert!(w[1].0 >= w[0].0 && w[1].1 >= w[0].1, "{alg:?}");
            }
        }
    }

    proptest! {
        #[test]
        fn prop_sorts_to_same_multiset(input in prop::collection::vec(0u32..1000, 0..60)) {
            for alg in Algorithm::ALL {
                let mut seq = input.clone();
                let mut stats = Stats::start();
                let mut rec = Recorder::default();
                sort(alg, &mut seq, &mut stats, &mut rec);
                prop_assert_eq!(&seq, &sorted_copy(&input));
            }
        }

        #[test]
        fn prop_cancel_preserves_multiset(
            input in prop::collection::vec(0u32..1000, 2..60),
            cancel_at in 1usize..400,
        ) {
            for alg in Algorithm::ALL {
                let mut seq = input.clone();
                let mut stats = Stats::start();
                let mut rec = Recorder { cancel_after: Some(cancel_at), ..Default::default() };
                sort(alg, &mut seq, &mut stats, &mut rec);
                prop_assert_eq!(seq.len(), input.len());
                prop_assert_eq!(sorted_copy(&seq), sorted_copy(&input));
                prop_assert!(rec.steps.len() <= cancel_at);
            }
        }
    }
}
