//! Run lifecycle controller.
//!
//! Owns the sequence, the run state machine and the active sort task, relays
//! engine frames to presentation layers and restores the idle state whenever
//! a run ends, however it ends.

use crate::engine::generator::{generate, make_rng};
use crate::engine::{CancelToken, Pacer, SortEngine};
#[cfg(test)]
use crate::engine::sorters::{self, Stepper};
#[cfg(test)]
use crate::model::{Stats, Step};
use crate::model::{
    Algorithm, InfoEvent, RunConfig, RunResult, RunState, SortEvent, SortOutcome, StatsSnapshot,
};
use anyhow::Result;
use rand::rngs::StdRng;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::{JoinError, JoinHandle};
use tokio::time::Duration;

pub const MIN_SIZE: usize = 10;
pub const MAX_SIZE: usize = 150;

/// Commands emitted by UI layers to drive the controller.
#[derive(Debug, Clone)]
pub(crate) enum UiCommand {
    Generate,
    Start(Algorithm),
    Stop,
    SetSpeed(u8),
    SetSize(usize),
    SelectAlgorithm(Algorithm),
    Quit,
}

/// Body of the blocking sort task.
pub(crate) type SortTask =
    fn(SortEngine, Vec<u32>, CancelToken, Pacer, UnboundedSender<SortEvent>) -> RunResult;

/// Internal handle for a running sort task.
struct RunCtx {
    cancel: CancelToken,
    events: UnboundedReceiver<SortEvent>,
    handle: JoinHandle<RunResult>,
    // Input of the run, reported if the task dies without a result.
    initial: Vec<u32>,
}

pub(crate) struct Controller {
    cfg: RunConfig,
    rng: StdRng,
    state: RunState,
    algorithm: Algorithm,
    sequence: Vec<u32>,
    stats: StatsSnapshot,
    pacer: Pacer,
    event_tx: UnboundedSender<SortEvent>,
    sort_task: SortTask,
    run: Option<RunCtx>,
}

impl Controller {
    pub(crate) fn new(cfg: RunConfig, event_tx: UnboundedSender<SortEvent>) -> Result<Self> {
        let pacer = if cfg.instant {
            Pacer::instant()
        } else {
            Pacer::new(cfg.speed)
        };
        let mut ctl = Self {
            rng: make_rng(cfg.seed),
            state: RunState::Idle,
            algorithm: cfg.algorithm,
            sequence: Vec::new(),
            stats: StatsSnapshot::default(),
            pacer,
            event_tx,
            sort_task: SortEngine::run,
            run: None,
            cfg,
        };
        ctl.regenerate()?;
        Ok(ctl)
    }

    #[cfg(test)]
    pub(crate) fn with_sort_task(mut self, task: SortTask) -> Self {
        self.sort_task = task;
        self
    }

    pub(crate) fn state(&self) -> RunState {
        self.state
    }

    pub(crate) fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    #[cfg(test)]
    pub(crate) fn sequence(&self) -> &[u32] {
        &self.sequence
    }

    #[cfg(test)]
    pub(crate) fn stats(&self) -> StatsSnapshot {
        self.stats
    }

    #[cfg(test)]
    pub(crate) fn pacer(&self) -> &Pacer {
        &self.pacer
    }

    fn emit(&self, ev: SortEvent) {
        let _ = self.event_tx.send(ev);
    }

    fn set_state(&mut self, state: RunState) {
        tracing::debug!(from = ?self.state, to = ?state, "run state");
        self.state = state;
        self.emit(SortEvent::StateChanged { state });
    }

    fn regenerate(&mut self) -> Result<()> {
        self.sequence = generate(
            &mut self.rng,
            self.cfg.size,
            self.cfg.min_value,
            self.cfg.max_value,
        )?;
        self.stats = StatsSnapshot::default();
        self.emit(SortEvent::Generated {
            sequence: self.sequence.clone(),
        });
        Ok(())
    }

    /// Draw a fresh sequence. Ignored unless idle.
    pub(crate) fn request_generate(&mut self) -> bool {
        if self.state != RunState::Idle {
            tracing::debug!(state = ?self.state, "generate ignored");
            return false;
        }
        match self.regenerate() {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "generate failed");
                self.emit(SortEvent::Info(InfoEvent::Message(format!(
                    "Generate failed: {e:#}"
                ))));
                false
            }
        }
    }

    /// Launch `algorithm` over the current sequence. Ignored unless idle.
    pub(crate) fn request_start(&mut self, algorithm: Algorithm) -> bool {
        if self.state != RunState::Idle {
            tracing::debug!(state = ?self.state, "start ignored");
            return false;
        }
        self.algorithm = algorithm;
        self.stats = StatsSnapshot::default();
        self.set_state(RunState::Running);

        let cancel = CancelToken::new();
        let (engine_tx, engine_rx) = mpsc::unbounded_channel::<SortEvent>();
        let engine = SortEngine::new(self.cfg.clone(), algorithm);
        // The sequence moves into the task and comes back in the RunResult.
        let sequence = self.sequence.clone();
        let pacer = self.pacer.clone();
        let task_cancel = cancel.clone();
        let task = self.sort_task;
        let handle = tokio::task::spawn_blocking(move || {
            task(engine, sequence, task_cancel, pacer, engine_tx)
        });
        self.run = Some(RunCtx {
            cancel,
            events: engine_rx,
            handle,
            initial: self.sequence.clone(),
        });
        true
    }

    /// Ask the running sort to stop at its next step boundary.
    pub(crate) fn request_stop(&mut self) -> bool {
        if self.state != RunState::Running {
            tracing::debug!(state = ?self.state, "stop ignored");
            return false;
        }
        if let Some(ctx) = &self.run {
            ctx.cancel.cancel();
        }
        self.set_state(RunState::Cancelling);
        self.emit(SortEvent::Info(InfoEvent::Cancelling));
        true
    }

    /// Speed applies immediately, including to a running sort.
    pub(crate) fn set_speed(&mut self, speed: u8) -> u8 {
        let speed = self.pacer.set_speed(speed);
        self.emit(SortEvent::SpeedChanged { speed });
        speed
    }

    /// Resize and regenerate. Ignored unless idle.
    pub(crate) fn set_size(&mut self, size: usize) -> bool {
        if self.state != RunState::Idle {
            return false;
        }
        self.cfg.size = size.clamp(MIN_SIZE, MAX_SIZE);
        self.request_generate()
    }

    pub(crate) fn select_algorithm(&mut self, algorithm: Algorithm) -> bool {
        if self.state != RunState::Idle {
            return false;
        }
        self.algorithm = algorithm;
        self.emit(SortEvent::AlgorithmChanged { algorithm });
        true
    }

    /// Next event from the running sort, or `None` once the sort task has
    /// returned. Pending forever while idle.
    pub(crate) async fn next_run_signal(&mut self) -> Option<SortEvent> {
        match self.run.as_mut() {
            Some(ctx) => ctx.events.recv().await,
            None => futures::future::pending().await,
        }
    }

    /// Record an engine event and pass it on to presentation layers.
    pub(crate) fn relay(&mut self, ev: SortEvent) {
        if let SortEvent::Frame {
            sequence, stats, ..
        } = &ev
        {
            if self.state.is_active() {
                self.sequence.clone_from(sequence);
                self.stats = *stats;
            }
        }
        self.emit(ev);
    }

    /// Join the finished sort task and return to idle.
    pub(crate) async fn finish_run(&mut self) -> Option<RunResult> {
        let ctx = self.run.take()?;
        // Frames can still be queued behind the channel close; keep them in order.
        let RunCtx {
            mut events,
            handle,
            initial,
            ..
        } = ctx;
        while let Ok(ev) = events.try_recv() {
            self.relay(ev);
        }
        self.complete_run(initial, handle.await)
    }

    fn complete_run(
        &mut self,
        initial: Vec<u32>,
        joined: Result<RunResult, JoinError>,
    ) -> Option<RunResult> {
        let result = match joined {
            Ok(r) => {
                self.sequence.clone_from(&r.sequence);
                self.stats = r.stats;
                Some(r)
            }
            Err(e) => {
                // A fault is handled like a cancel: keep the last relayed frame.
                tracing::error!(error = %e, "sort task failed");
                self.emit(SortEvent::Info(InfoEvent::Faulted {
                    error: e.to_string(),
                }));
                None
            }
        };

        self.set_state(RunState::Finished);
        if let Some(r) = &result {
            self.emit(SortEvent::RunCompleted {
                result: Box::new(r.clone()),
            });
        } else {
            self.emit(SortEvent::RunCompleted {
                result: Box::new(self.faulted_result(initial)),
            });
        }
        self.set_state(RunState::Idle);
        result
    }

    fn faulted_result(&self, initial: Vec<u32>) -> RunResult {
        RunResult {
            timestamp_utc: time::OffsetDateTime::now_utc()
                .format(&time::format_description::well_known::Rfc3339)
                .unwrap_or_else(|_| "now".into()),
            algorithm: self.algorithm,
            outcome: SortOutcome::Faulted,
            initial,
            sequence: self.sequence.clone(),
            stats: self.stats,
            config: self.cfg.clone(),
        }
    }
}

/// Sort task that forwards two steps of a bubble sort and panics on the third.
#[cfg(test)]
pub(crate) fn exploding_sort(
    _engine: SortEngine,
    mut sequence: Vec<u32>,
    _cancel: CancelToken,
    _pacer: Pacer,
    event_tx: UnboundedSender<SortEvent>,
) -> RunResult {
    struct Exploding {
        tx: UnboundedSender<SortEvent>,
        steps: usize,
    }

    impl Stepper for Exploding {
        fn is_cancelled(&self) -> bool {
            false
        }

        fn on_step(&mut self, sequence: &[u32], stats: &Stats, step: Step) {
            self.steps += 1;
            if self.steps == 3 {
                panic!("sorter exploded");
            }
            let _ = self.tx.send(SortEvent::Frame {
                sequence: sequence.to_vec(),
                step,
                stats: stats.snapshot(),
            });
        }
    }

    let mut stats = Stats::start();
    let mut stepper = Exploding {
        tx: event_tx,
        steps: 0,
    };
    let _ = sorters::sort(Algorithm::Bubble, &mut sequence, &mut stats, &mut stepper);
    unreachable!("sort finished before the third step")
}

/// Orchestrate sort runs based on UI commands and emit events back to presentation layers.
pub(crate) async fn run_controller(
    cfg: RunConfig,
    start_on_launch: bool,
    event_tx: UnboundedSender<SortEvent>,
    cmd_rx: UnboundedReceiver<UiCommand>,
) -> Result<()> {
    let ctl = Controller::new(cfg, event_tx)?;
    drive_controller(ctl, start_on_launch, cmd_rx).await
}

/// Command/run loop over an existing controller. Returns once a quit is
/// requested (or the command channel closes) and no run is active.
pub(crate) async fn drive_controller(
    mut ctl: Controller,
    start_on_launch: bool,
    mut cmd_rx: UnboundedReceiver<UiCommand>,
) -> Result<()> {
    if start_on_launch {
        ctl.request_start(ctl.algorithm());
    }
    let mut quit_pending = false;
    // Cancel watchdog: if a cancel takes too long, keep UI feedback alive.
    let mut cancel_deadline: Option<tokio::time::Instant> = None;
    let mut watchdog = tokio::time::interval(Duration::from_millis(500));

    loop {
        tokio::select! {
            // Once quitting, only the winding-down run matters.
            cmd = cmd_rx.recv(), if !quit_pending => {
                match cmd {
                    Some(UiCommand::Generate) => {
                        ctl.request_generate();
                    }
                    Some(UiCommand::Start(a)) => {
                        ctl.request_start(a);
                    }
                    Some(UiCommand::Stop) => {
                        if ctl.request_stop() {
                            cancel_deadline = Some(tokio::time::Instant::now() + Duration::from_secs(3));
                        }
                    }
                    Some(UiCommand::SetSpeed(s)) => {
                        ctl.set_speed(s);
                    }
                    Some(UiCommand::SetSize(n)) => {
                        ctl.set_size(n);
                    }
                    Some(UiCommand::SelectAlgorithm(a)) => {
                        ctl.select_algorithm(a);
                    }
                    Some(UiCommand::Quit) | None => {
                        // Quit waits for the current run to wind down so the task is joined.
                        quit_pending = true;
                        if ctl.state().is_active() {
                            ctl.request_stop();
                        } else {
                            break;
                        }
                    }
                }
            }
            signal = ctl.next_run_signal() => {
                match signal {
                    Some(ev) => ctl.relay(ev),
                    None => {
                        ctl.finish_run().await;
                        cancel_deadline = None;
                        if quit_pending {
                            break;
                        }
                    }
                }
            }
            _ = watchdog.tick() => {
                if let Some(deadline) = cancel_deadline {
                    if tokio::time::Instant::now() >= deadline && ctl.state().is_active() {
                        ctl.emit(SortEvent::Info(InfoEvent::StillCancelling));
                        cancel_deadline = None;
                    }
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::delay_for_speed;
    use crate::orchestrator::process_run_completion;
    use std::time::Instant;

    fn test_cfg(size: usize) -> RunConfig {
        RunConfig {
            size,
            seed: Some(17),
            instant: true,
            settle_delay: std::time::Duration::ZERO,
            ..Default::default()
        }
    }

    async fn drive_to_idle(ctl: &mut Controller) -> Option<RunResult> {
        while let Some(ev) = ctl.next_run_signal().await {
            ctl.relay(ev);
        }
        ctl.finish_run().await
    }

    fn sorted(v: &[u32]) -> Vec<u32> {
        let mut v = v.to_vec();
        v.sort_unstable();
        v
    }

    fn drain(rx: &mut UnboundedReceiver<SortEvent>) -> Vec<SortEvent> {
        let mut out = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            out.push(ev);
        }
        out
    }

    #[tokio::test]
    async fn new_controller_generates_sequence() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let ctl = Controller::new(test_cfg(40), tx).unwrap();
        assert_eq!(ctl.state(), RunState::Idle);
        assert_eq!(ctl.sequence().len(), 40);
        assert!(ctl.sequence().iter().all(|v| (10..=500).contains(v)));
        assert!(matches!(rx.try_recv(), Ok(SortEvent::Generated { .. })));
    }

    #[tokio::test]
    async fn full_run_sorts_and_returns_to_idle() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut ctl = Controller::new(test_cfg(30), tx).unwrap();
        let before = ctl.sequence().to_vec();

        assert!(ctl.request_start(Algorithm::Insertion));
        assert_eq!(ctl.state(), RunState::Running);

        let result = tokio::time::timeout(Duration::from_secs(10), drive_to_idle(&mut ctl))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(result.outcome, SortOutcome::Completed);
        assert_eq!(ctl.state(), RunState::Idle);
        assert_eq!(ctl.sequence(), sorted(&before).as_slice());
        assert_eq!(ctl.stats(), result.stats);

        let states: Vec<RunState> = drain(&mut rx)
            .into_iter()
            .filter_map(|e| match e {
                SortEvent::StateChanged { state } => Some(state),
                _ => None,
            })
            .collect();
        assert_eq!(
            states,
            vec![RunState::Running, RunState::Finished, RunState::Idle]
        );
    }

    #[tokio::test]
    async fn requests_outside_idle_are_ignored() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut cfg = test_cfg(100);
        cfg.instant = false;
        cfg.speed = 1;
        let mut ctl = Controller::new(cfg, tx).unwrap();
        let before = ctl.sequence().to_vec();

        assert!(!ctl.request_stop());
        assert!(ctl.request_start(Algorithm::Bubble));
        assert!(!ctl.request_start(Algorithm::Selection));
        assert!(!ctl.request_generate());
        assert!(!ctl.set_size(20));
        assert!(!ctl.select_algorithm(Algorithm::Insertion));
        assert_eq!(ctl.state(), RunState::Running);
        assert_eq!(ctl.algorithm(), Algorithm::Bubble);

        assert!(ctl.request_stop());
        assert!(!ctl.request_stop());
        assert_eq!(ctl.state(), RunState::Cancelling);

        tokio::time::timeout(Duration::from_secs(5), drive_to_idle(&mut ctl))
            .await
            .unwrap();
        assert_eq!(ctl.state(), RunState::Idle);
        assert_eq!(ctl.sequence().len(), before.len());
    }

    #[tokio::test]
    async fn stop_after_first_comparison_keeps_multiset() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut cfg = test_cfg(100);
        cfg.instant = false;
        cfg.speed = 1;
        let mut ctl = Controller::new(cfg, tx).unwrap();
        let before = ctl.sequence().to_vec();

        ctl.request_start(Algorithm::Bubble);
        // Skip the start notice; the first frame is the first comparison.
        loop {
            match ctl.next_run_signal().await {
                Some(ev @ SortEvent::Frame { .. }) => {
                    ctl.relay(ev);
                    break;
                }
                Some(ev) => ctl.relay(ev),
                None => panic!("run ended before the first comparison"),
            }
        }
        assert_eq!(ctl.stats().comparisons, 1);

        let stopped_at = Instant::now();
        ctl.request_stop();
        let result = drive_to_idle(&mut ctl).await.unwrap();
        // The sort is at most one paced step away from noticing the stop.
        assert!(stopped_at.elapsed() < delay_for_speed(1) * 2);

        assert_eq!(result.outcome, SortOutcome::Cancelled);
        assert_eq!(ctl.state(), RunState::Idle);
        assert_eq!(ctl.sequence().len(), 100);
        assert_eq!(sorted(ctl.sequence()), sorted(&before));
        assert!(result.stats.comparisons <= 2);
    }

    #[tokio::test]
    async fn stats_reset_on_generate_and_start() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut ctl = Controller::new(test_cfg(20), tx).unwrap();
        let first = ctl.sequence().to_vec();

        ctl.request_start(Algorithm::Selection);
        drive_to_idle(&mut ctl).await;
        assert!(ctl.stats().comparisons > 0);

        assert!(ctl.request_generate());
        assert_eq!(ctl.stats(), StatsSnapshot::default());
        assert_eq!(ctl.sequence().len(), 20);
        assert_ne!(ctl.sequence(), first.as_slice());

        // The second run starts counting from zero again.
        ctl.request_start(Algorithm::Selection);
        assert_eq!(ctl.stats(), StatsSnapshot::default());
        let result = drive_to_idle(&mut ctl).await.unwrap();
        assert_eq!(result.stats.comparisons, 20 * 19 / 2);
    }

    #[tokio::test]
    async fn set_size_is_clamped_and_regenerates() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut ctl = Controller::new(test_cfg(20), tx).unwrap();
        assert!(ctl.set_size(1000));
        assert_eq!(ctl.sequence().len(), MAX_SIZE);
        assert!(ctl.set_size(0));
        assert_eq!(ctl.sequence().len(), MIN_SIZE);
    }

    #[tokio::test]
    async fn speed_updates_shared_pacer() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut cfg = test_cfg(10);
        cfg.instant = false;
        let mut ctl = Controller::new(cfg, tx).unwrap();
        assert_eq!(ctl.set_speed(0), 1);
        assert_eq!(ctl.pacer().delay(), Duration::from_millis(100));
        assert_eq!(ctl.set_speed(90), 90);
        assert_eq!(ctl.pacer().delay(), Duration::from_millis(11));
        assert!(drain(&mut rx)
            .iter()
            .any(|e| matches!(e, SortEvent::SpeedChanged { speed: 90 })));
    }

    #[tokio::test]
    async fn sorter_panic_is_treated_as_cancel() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut ctl = Controller::new(test_cfg(50), tx)
            .unwrap()
            .with_sort_task(exploding_sort);
        let before = ctl.sequence().to_vec();

        ctl.request_start(Algorithm::Bubble);
        let joined = tokio::time::timeout(Duration::from_secs(5), drive_to_idle(&mut ctl))
            .await
            .unwrap();
        assert!(joined.is_none());

        assert_eq!(ctl.state(), RunState::Idle);
        // The last relayed frame survives: two steps were counted.
        let stats = ctl.stats();
        assert_eq!(stats.comparisons + stats.swaps, 2);
        assert_eq!(sorted(ctl.sequence()), sorted(&before));

        let events = drain(&mut rx);
        assert!(events
            .iter()
            .any(|e| matches!(e, SortEvent::Info(InfoEvent::Faulted { .. }))));
        let faulted = events
            .iter()
            .find_map(|e| match e {
                SortEvent::RunCompleted { result } => Some(result),
                _ => None,
            })
            .unwrap();
        assert_eq!(faulted.outcome, SortOutcome::Faulted);
        assert_eq!(faulted.initial, before);
        assert_eq!(
            process_run_completion(faulted).values_preserved,
            Some(true)
        );

        // Controls are usable again.
        assert!(ctl.request_generate());
    }

    #[tokio::test]
    async fn controller_loop_survives_sorter_panic() {
        let (event_tx, mut event_rx) = mpsc::unbounded_channel();
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let ctl = Controller::new(test_cfg(40), event_tx)
            .unwrap()
            .with_sort_task(exploding_sort);
        let loop_handle = tokio::spawn(drive_controller(ctl, true, cmd_rx));

        let outcome = tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                match event_rx.recv().await {
                    Some(SortEvent::RunCompleted { result }) => break result.outcome,
                    Some(_) => {}
                    None => panic!("controller exited before the run completed"),
                }
            }
        })
        .await
        .unwrap();
        assert_eq!(outcome, SortOutcome::Faulted);

        // Back to idle: generate is accepted again, then quit ends the loop.
        cmd_tx.send(UiCommand::Generate).unwrap();
        cmd_tx.send(UiCommand::Quit).unwrap();
        tokio::time::timeout(Duration::from_secs(5), loop_handle)
            .await
            .unwrap()
            .unwrap()
            .unwrap();

        let events = drain(&mut event_rx);
        let states: Vec<RunState> = events
            .iter()
            .filter_map(|e| match e {
                SortEvent::StateChanged { state } => Some(*state),
                _ => None,
            })
            .collect();
        assert_eq!(states, vec![RunState::Idle]);
        assert!(events
            .iter()
            .any(|e| matches!(e, SortEvent::Generated { .. })));
    }

    #[tokio::test]
    async fn controller_loop_quits_after_run_winds_down() {
        let (event_tx, mut event_rx) = mpsc::unbounded_channel();
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let mut cfg = test_cfg(60);
        cfg.instant = false;
        cfg.speed = 100;
        let loop_handle = tokio::spawn(run_controller(cfg, true, event_tx, cmd_rx));

        cmd_tx.send(UiCommand::Quit).unwrap();
        tokio::time::timeout(Duration::from_secs(5), loop_handle)
            .await
            .unwrap()
            .unwrap()
            .unwrap();

        let events = drain(&mut event_rx);
        assert!(matches!(
            events.iter().rev().find(|e| matches!(e, SortEvent::StateChanged { .. })),
            Some(SortEvent::StateChanged {
                state: RunState::Idle
            })
        ));
    }
}
