use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    pub size: usize,
    pub min_value: u32,
    pub max_value: u32,
    /// Initial speed percentage (1-100)
    pub speed: u8,
    pub algorithm: Algorithm,
    pub seed: Option<u64>,
    /// Delay between frames of the post-sort settle animation
    #[serde(with = "humantime_serde")]
    pub settle_delay: Duration,
    /// Skip all pacing sleeps (headless modes)
    pub instant: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            size: 50,
            min_value: 10,
            max_value: 500,
            speed: 50,
            algorithm: Algorithm::Bubble,
            seed: None,
            settle_delay: Duration::from_millis(20),
            instant: false,
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum Algorithm {
    Bubble,
    Selection,
    Insertion,
}

impl Algorithm {
    pub const ALL: [Algorithm; 3] = [Algorithm::Bubble, Algorithm::Selection, Algorithm::Insertion];

    pub fn name(self) -> &'static str {
        match self {
            Algorithm::Bubble => "Bubble Sort",
            Algorithm::Selection => "Selection Sort",
            Algorithm::Insertion => "Insertion Sort",
        }
    }

    pub fn complexity(self) -> &'static str {
        // All three share the same worst and average case.
        "O(n²)"
    }

    pub fn description(self) -> &'static str {
        match self {
            Algorithm::Bubble => {
                "Repeatedly swaps adjacent out-of-order pairs; stops early after a pass with no swaps."
            }
            Algorithm::Selection => {
                "Scans the unsorted suffix for its minimum and swaps it into place, one position at a time."
            }
            Algorithm::Insertion => {
                "Takes each element in turn and shifts larger predecessors right until its slot is found."
            }
        }
    }

    /// Next algorithm in the fixed cycle used by the UI.
    pub fn next(self) -> Self {
        match self {
            Algorithm::Bubble => Algorithm::Selection,
            Algorithm::Selection => Algorithm::Insertion,
            Algorithm::Insertion => Algorithm::Bubble,
        }
    }
}

/// Visual role of an index within a single step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Compared,
    Swapping,
    Pivot,
    Settled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    Compare,
    Swap,
    /// Highlight only; no comparison or swap took place.
    Select,
    Settle,
}

/// One renderable unit of algorithm progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub kind: StepKind,
    pub roles: BTreeMap<usize, Role>,
}

impl Step {
    pub fn new(kind: StepKind) -> Self {
        Self {
            kind,
            roles: BTreeMap::new(),
        }
    }

    pub fn with(mut self, idx: usize, role: Role) -> Self {
        self.roles.insert(idx, role);
        self
    }

    /// Mark every index in `range` as settled. Later `with` calls override.
    pub fn settled(mut self, range: std::ops::Range<usize>) -> Self {
        for i in range {
            self.roles.insert(i, Role::Settled);
        }
        self
    }
}

/// Comparison/swap counters for the active run.
#[derive(Debug, Clone, Default)]
pub struct Stats {
    pub comparisons: u64,
    pub swaps: u64,
    pub started_at: Option<Instant>,
}

impl Stats {
    pub fn start() -> Self {
        Self {
            started_at: Some(Instant::now()),
            ..Default::default()
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.map(|t| t.elapsed()).unwrap_or_default()
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            comparisons: self.comparisons,
            swaps: self.swaps,
            elapsed_ms: self.elapsed().as_secs_f64() * 1000.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub comparisons: u64,
    pub swaps: u64,
    pub elapsed_ms: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RunState {
    #[default]
    Idle,
    Running,
    Cancelling,
    Finished,
}

impl RunState {
    pub fn is_active(self) -> bool {
        matches!(self, RunState::Running | RunState::Cancelling)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOutcome {
    Completed,
    Cancelled,
    Faulted,
}

#[derive(Debug, Clone)]
pub enum SortEvent {
    /// A new sequence was generated while idle.
    Generated { sequence: Vec<u32> },
    /// One step of the running algorithm, with the sequence as it stands after it.
    Frame {
        sequence: Vec<u32>,
        step: Step,
        stats: StatsSnapshot,
    },
    StateChanged { state: RunState },
    SpeedChanged { speed: u8 },
    AlgorithmChanged { algorithm: Algorithm },
    Info(InfoEvent),
    RunCompleted {
        result: Box<RunResult>,
    },
}

/// Structured info events emitted by the engine and controller.
#[derive(Debug, Clone)]
pub enum InfoEvent {
    Message(String),
    Started { algorithm: Algorithm, size: usize },
    Cancelling,
    StillCancelling,
    Faulted { error: String },
}

impl InfoEvent {
    /// Render a human-readable message for UI/CLI layers.
    pub fn to_message(&self) -> String {
        match self {
            InfoEvent::Message(msg) => msg.clone(),
            InfoEvent::Started { algorithm, size } => {
                format!("Sorting {} elements with {}", size, algorithm.name())
            }
            InfoEvent::Cancelling => "Cancelling…".to_string(),
            InfoEvent::StillCancelling => "Still cancelling…".to_string(),
            InfoEvent::Faulted { error } => format!("Sort failed: {error}"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    #[serde(default)]
    pub timestamp_utc: String,
    pub algorithm: Algorithm,
    pub outcome: SortOutcome,
    pub initial: Vec<u32>,
    pub sequence: Vec<u32>,
    pub stats: StatsSnapshot,
    /// Settings the run was made with.
    #[serde(default)]
    pub config: RunConfig,
}
