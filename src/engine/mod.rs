pub mod generator;
pub mod sorters;

use crate::model::{
    Algorithm, InfoEvent, Role, RunConfig, RunResult, SortEvent, SortOutcome, Stats, Step,
    StepKind,
};
use sorters::Stepper;
use std::sync::{
    atomic::{AtomicBool, AtomicU8, Ordering},
    Arc,
};
use std::time::Duration;
use tokio::sync::mpsc;

/// Cooperative stop signal shared between the controller and a running sort.
///
/// Only the controller sets it; the sort polls it at step boundaries, so a
/// stop takes effect at the next comparison or swap rather than instantly.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

pub const MIN_SPEED: u8 = 1;
pub const MAX_SPEED: u8 = 100;

/// Per-step delay for a speed percentage: `(101 - speed)` milliseconds.
pub fn delay_for_speed(speed: u8) -> Duration {
    let speed = speed.clamp(MIN_SPEED, MAX_SPEED);
    Duration::from_millis(u64::from(101 - speed))
}

/// Paces a running sort. The speed can be changed while a sort is running.
#[derive(Debug, Clone)]
pub struct Pacer {
    speed: Arc<AtomicU8>,
    enabled: bool,
}

impl Pacer {
    pub fn new(speed: u8) -> Self {
        Self {
            speed: Arc::new(AtomicU8::new(speed.clamp(MIN_SPEED, MAX_SPEED))),
            enabled: true,
        }
    }

    /// A pacer that never sleeps.
    pub fn instant() -> Self {
        Self {
            enabled: false,
            ..Self::new(MAX_SPEED)
        }
    }

    pub fn speed(&self) -> u8 {
        self.speed.load(Ordering::Relaxed)
    }

    pub fn set_speed(&self, speed: u8) -> u8 {
        let speed = speed.clamp(MIN_SPEED, MAX_SPEED);
        self.speed.store(speed, Ordering::Relaxed);
        speed
    }

    pub fn delay(&self) -> Duration {
        if self.enabled {
            delay_for_speed(self.speed())
        } else {
            Duration::ZERO
        }
    }

    fn sleep(&self, d: Duration) {
        if self.enabled && !d.is_zero() {
            std::thread::sleep(d);
        }
    }
}

/// Forwards sorter steps as frames and sleeps between them.
struct FrameEmitter<'a> {
    event_tx: &'a mpsc::UnboundedSender<SortEvent>,
    cancel: &'a CancelToken,
    pacer: &'a Pacer,
    // Set once nobody is listening any more; treated like a cancel.
    detached: bool,
}

impl FrameEmitter<'_> {
    fn emit(&mut self, sequence: &[u32], stats: &Stats, step: Step) {
        let sent = self.event_tx.send(SortEvent::Frame {
            sequence: sequence.to_vec(),
            step,
            stats: stats.snapshot(),
        });
        if sent.is_err() {
            self.detached = true;
        }
    }
}

impl Stepper for FrameEmitter<'_> {
    fn is_cancelled(&self) -> bool {
        self.detached || self.cancel.is_cancelled()
    }

    fn on_step(&mut self, sequence: &[u32], stats: &Stats, step: Step) {
        self.emit(sequence, stats, step);
        self.pacer.sleep(self.pacer.delay());
    }
}

pub struct SortEngine {
    cfg: RunConfig,
    algorithm: Algorithm,
}

impl SortEngine {
    pub fn new(cfg: RunConfig, algorithm: Algorithm) -> Self {
        Self { cfg, algorithm }
    }

    /// Sort `sequence` to completion or cancellation, emitting one frame per
    /// step. Blocks the calling thread; run it on a blocking task.
    pub fn run(
        self,
        mut sequence: Vec<u32>,
        cancel: CancelToken,
        pacer: Pacer,
        event_tx: mpsc::UnboundedSender<SortEvent>,
    ) -> RunResult {
        let initial = sequence.clone();
        let mut stats = Stats::start();
        let mut emitter = FrameEmitter {
            event_tx: &event_tx,
            cancel: &cancel,
            pacer: &pacer,
            detached: false,
        };

        let _ = event_tx.send(SortEvent::Info(InfoEvent::Started {
            algorithm: self.algorithm,
            size: sequence.len(),
        }));
        tracing::info!(algorithm = ?self.algorithm, size = sequence.len(), "sort started");

        let outcome = sorters::sort(self.algorithm, &mut sequence, &mut stats, &mut emitter);
        // The clock stops with the algorithm, not with the settle animation.
        let final_stats = stats.snapshot();

        tracing::info!(
            ?outcome,
            comparisons = final_stats.comparisons,
            swaps = final_stats.swaps,
            elapsed_ms = final_stats.elapsed_ms,
            "sort finished"
        );

        if outcome == SortOutcome::Completed {
            self.settle(&sequence, &stats, &mut emitter);
        }

        RunResult {
            timestamp_utc: time::OffsetDateTime::now_utc()
                .format(&time::format_description::well_known::Rfc3339)
                .unwrap_or_else(|_| "now".into()),
            algorithm: self.algorithm,
            outcome,
            initial,
            sequence,
            stats: final_stats,
            config: self.cfg,
        }
    }

    /// Sweep left to right marking each bar settled, then show all settled.
    fn settle(&self, sequence: &[u32], stats: &Stats, emitter: &mut FrameEmitter<'_>) {
        for i in 0..sequence.len() {
            if emitter.is_cancelled() {
                break;
            }
            emitter.emit(
                sequence,
                stats,
                Step::new(StepKind::Settle).settled(0..i + 1),
            );
            emitter.pacer.sleep(self.cfg.settle_delay);
        }
        if !emitter.detached {
            let mut all = Step::new(StepKind::Settle);
            for i in 0..sequence.len() {
                all = all.with(i, Role::Settled);
            }
            emitter.emit(sequence, stats, all);
        }
    }
}
