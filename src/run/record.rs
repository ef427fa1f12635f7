// RunRecord - the mutable state of one test execution
//
// Exactly one record is current process-wide. It is created by
// RunController::start, mutated by the scheduler (phase/cycle) and the
// ingestion path (samples) under the controller's lock, finalized once, and
// superseded (not deleted) when the next run starts.

use std::time::{Duration, Instant};

use serde::Serialize;

use crate::classify::Mode;
use crate::error::RunError;
use crate::store::{Phase, SampleStore};

/// Immutable parameters of one run, fixed at start.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    /// Number of untouch+touch cycle pairs; must be >= 1.
    pub cycles: u32,
    /// Duration of each untouch and each touch phase; must be >= 1s.
    pub phase_duration: Duration,
    pub mode: Mode,
    pub threshold: f64,
}

impl RunConfig {
    pub fn validate(&self) -> Result<(), RunError> {
        if self.cycles < 1 {
            return Err(RunError::InvalidConfig {
                reason: format!("cycles must be >= 1, got {}", self.cycles),
            });
        }
        if self.phase_duration < Duration::from_secs(1) {
            return Err(RunError::InvalidConfig {
                reason: format!(
                    "phase duration must be >= 1s, got {:?}",
                    self.phase_duration
                ),
            });
        }
        if !self.threshold.is_finite() {
            return Err(RunError::InvalidConfig {
                reason: format!("threshold must be finite, got {}", self.threshold),
            });
        }
        Ok(())
    }
}

/// Lifecycle state of a run record.
///
/// Idle is the state before any run. Finished and Error are terminal for a
/// given record; a record never leaves a terminal state.
#[derive(Debug, Clone, PartialEq)]
pub enum RunStatus {
    Idle,
    Starting,
    Running { phase: Phase, cycle: u32 },
    Stopping,
    Finished,
    Error(String),
}

impl RunStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunStatus::Finished | RunStatus::Error(_))
    }

    /// True while a run is in flight (start must be rejected).
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            RunStatus::Starting | RunStatus::Running { .. } | RunStatus::Stopping
        )
    }

    /// True while finalization has not yet been claimed; the claim flips the
    /// status to Stopping, so both completion paths race through exactly one
    /// gate.
    pub(crate) fn can_finalize(&self) -> bool {
        matches!(self, RunStatus::Starting | RunStatus::Running { .. })
    }
}

/// The mutable state of one test execution.
#[derive(Debug)]
pub struct RunRecord {
    pub status: RunStatus,
    /// Authoritative current phase; written by the scheduler, read by
    /// ingestion, both under the run lock.
    pub phase: Phase,
    pub cycle_index: u32,
    pub store: SampleStore,
    /// One peak appended per classification pass (once per run).
    pub peak_history: Vec<f64>,
    /// Mean of peak_history; SoftHard mode only.
    pub average_peak: Option<f64>,
    /// Final classification or terminal status string; set exactly once, at
    /// the transition to Finished or Error.
    pub label: Option<String>,
    pub mode: Mode,
    pub threshold: f64,
    pub cycles: u32,
    /// Whether finalization was triggered by an external stop.
    pub stopped: bool,
    pub started_at: Option<Instant>,
    pub finished_at: Option<Instant>,
}

impl RunRecord {
    /// Initial record before any run has started.
    pub fn idle() -> Self {
        Self {
            status: RunStatus::Idle,
            phase: Phase::Idle,
            cycle_index: 0,
            store: SampleStore::new(),
            peak_history: Vec::new(),
            average_peak: None,
            label: None,
            mode: Mode::SoftHard,
            threshold: Mode::SoftHard.default_threshold(),
            cycles: 0,
            stopped: false,
            started_at: None,
            finished_at: None,
        }
    }

    /// Fresh record for a starting run.
    pub fn new(config: &RunConfig, now: Instant) -> Self {
        Self {
            status: RunStatus::Starting,
            phase: Phase::Idle,
            cycle_index: 0,
            store: SampleStore::new(),
            peak_history: Vec::new(),
            average_peak: None,
            label: None,
            mode: config.mode,
            threshold: config.threshold,
            cycles: config.cycles,
            stopped: false,
            started_at: Some(now),
            finished_at: None,
        }
    }

    /// Operator-facing status line, matching the texts the rig UI polls for.
    pub fn status_line(&self) -> String {
        match &self.status {
            RunStatus::Idle => "Idle".to_string(),
            RunStatus::Starting => "Starting test: UNTOUCH phase...".to_string(),
            RunStatus::Running { phase, cycle } => match phase {
                Phase::Untouch | Phase::Touch => format!(
                    "Cycle {}/{}: Collecting {} data...",
                    cycle,
                    self.cycles,
                    phase.display_name()
                ),
                Phase::Idle => "Processing results...".to_string(),
            },
            RunStatus::Stopping => {
                if self.stopped {
                    "Test stopped by user".to_string()
                } else {
                    "Processing results...".to_string()
                }
            }
            RunStatus::Finished => {
                if self.stopped {
                    "Test stopped by user".to_string()
                } else {
                    "Test Complete".to_string()
                }
            }
            RunStatus::Error(message) => format!("Test Manager Error: {}", message),
        }
    }

    /// Point-in-time copy for status polling. Elapsed time is measured from
    /// the original start; after finalization it is frozen at the total run
    /// duration.
    pub fn snapshot(&self, now: Instant) -> StatusSnapshot {
        let elapsed = match (self.started_at, self.finished_at) {
            (Some(start), Some(end)) => end.saturating_duration_since(start),
            (Some(start), None) => now.saturating_duration_since(start),
            _ => Duration::ZERO,
        };

        let average = match self.mode {
            Mode::SoftHard => self.average_peak.map(|v| (v * 100.0).round() / 100.0),
            Mode::FreshRotten => None,
        };

        StatusSnapshot {
            status: self.status_line(),
            finished: self.status.is_terminal(),
            result: self
                .label
                .clone()
                .unwrap_or_else(|| "No result yet".to_string()),
            average,
            classification_type: self.mode.wire_name().to_string(),
            elapsed_time: elapsed.as_secs(),
        }
    }
}

/// Wire shape of the status endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusSnapshot {
    pub status: String,
    pub finished: bool,
    pub result: String,
    pub average: Option<f64>,
    pub classification_type: String,
    pub elapsed_time: u64,
}
