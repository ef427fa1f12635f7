// SampleStore - append-only per-run sample storage
//
// Every accepted sample lands in the `all` view; samples arriving during an
// untouch or touch phase additionally land in the matching phase view. The
// store itself carries no locking: it lives inside the run record, and all
// mutation and snapshotting happen under the run lock, so a snapshot is
// always a consistent point in time.

use crate::sample::Sample;

/// Collection phase in effect for an arriving sample.
///
/// Transitions are driven exclusively by the phase scheduler; ingestion only
/// ever reads the current value to route a sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Untouch,
    Touch,
}

impl Phase {
    /// Uppercase name as used in operator-facing status lines.
    pub fn display_name(&self) -> &'static str {
        match self {
            Phase::Idle => "IDLE",
            Phase::Untouch => "UNTOUCH",
            Phase::Touch => "TOUCH",
        }
    }
}

/// Append-only storage for one run, split into three views.
#[derive(Debug, Clone, Default)]
pub struct SampleStore {
    all: Vec<Sample>,
    untouch: Vec<Sample>,
    touch: Vec<Sample>,
}

impl SampleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a sample routed by the phase in effect at the instant of the
    /// call. `all` receives every sample; Idle-phase samples get no
    /// secondary append.
    pub fn append(&mut self, sample: Sample, phase: Phase) {
        self.all.push(sample);
        match phase {
            Phase::Untouch => self.untouch.push(sample),
            Phase::Touch => self.touch.push(sample),
            Phase::Idle => {}
        }
    }

    pub fn all(&self) -> &[Sample] {
        &self.all
    }

    pub fn untouch(&self) -> &[Sample] {
        &self.untouch
    }

    pub fn touch(&self) -> &[Sample] {
        &self.touch
    }

    pub fn len(&self) -> usize {
        self.all.len()
    }

    pub fn is_empty(&self) -> bool {
        self.all.is_empty()
    }

    /// Owned copy of all three views for export and plotting.
    pub fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            all: self.all.clone(),
            untouch: self.untouch.clone(),
            touch: self.touch.clone(),
        }
    }
}

/// Point-in-time copy of a run's collected samples.
#[derive(Debug, Clone, Default)]
pub struct StoreSnapshot {
    pub all: Vec<Sample>,
    pub untouch: Vec<Sample>,
    pub touch: Vec<Sample>,
}
