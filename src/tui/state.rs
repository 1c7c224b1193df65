use crate::model::{Algorithm, Role, RunState, StatsSnapshot};
use std::collections::BTreeMap;
use std::time::Instant;

pub struct UiState {
    pub tab: usize,
    pub run_state: RunState,
    pub algorithm: Algorithm,
    pub speed: u8,
    pub info: String,

    pub sequence: Vec<u32>,
    // Roles from the most recent frame; anything absent draws as normal.
    pub roles: BTreeMap<usize, Role>,
    pub stats: StatsSnapshot,
    pub run_start: Option<Instant>,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            tab: 0,
            run_state: RunState::Idle,
            algorithm: Algorithm::Bubble,
            speed: 50,
            info: String::new(),
            sequence: Vec::new(),
            roles: BTreeMap::new(),
            stats: StatsSnapshot::default(),
            run_start: None,
        }
    }
}

impl UiState {
    /// Size, algorithm and generate controls are only live while idle.
    pub fn controls_enabled(&self) -> bool {
        self.run_state == RunState::Idle
    }

    pub fn stop_enabled(&self) -> bool {
        self.run_state == RunState::Running
    }

    /// Seconds shown in the Time card: live while a run is active, otherwise
    /// the time the last run's algorithm took.
    pub fn elapsed_secs(&self) -> f64 {
        match self.run_start {
            Some(t) if self.run_state.is_active() => t.elapsed().as_secs_f64(),
            _ => self.stats.elapsed_ms / 1000.0,
        }
    }

    pub fn size(&self) -> usize {
        self.sequence.len()
    }

    pub fn run_state_label(&self) -> &'static str {
        match self.run_state {
            RunState::Idle => "Idle",
            RunState::Running => "Running",
            RunState::Cancelling => "Cancelling",
            RunState::Finished => "Finished",
        }
    }
}
