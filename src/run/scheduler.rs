// PhaseScheduler - drives the untouch/touch timing sequence for one run
//
// Runs on its own thread. Each phase is a coarse poll loop: sleep at most
// one poll interval, re-check elapsed time and the stop flag, repeat. Stop
// latency is therefore bounded by the poll interval, never by the phase
// duration.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::run::controller::{FinishReason, RunShared};
use crate::run::record::RunConfig;
use crate::store::Phase;

pub(crate) struct PhaseScheduler {
    shared: Arc<RunShared>,
    cycles: u32,
    phase_duration: Duration,
    poll_interval: Duration,
}

impl PhaseScheduler {
    pub(crate) fn new(
        shared: Arc<RunShared>,
        config: &RunConfig,
        poll_interval: Duration,
    ) -> Self {
        Self {
            shared,
            cycles: config.cycles,
            phase_duration: config.phase_duration,
            poll_interval,
        }
    }

    /// Run the full cycle sequence, then finalize.
    ///
    /// A stop observed mid-sequence leaves finalization to the stop handler
    /// (no double classification). A panic anywhere in the sequence is
    /// caught and finalized as an error so polling clients are never left
    /// waiting on a stuck run.
    pub(crate) fn run(self) {
        let shared = Arc::clone(&self.shared);
        match panic::catch_unwind(AssertUnwindSafe(|| self.run_cycles())) {
            Ok(true) => shared.finalize(FinishReason::Completed),
            Ok(false) => {
                log::debug!("Scheduler exiting without finalizing (stop or supersede)");
            }
            Err(payload) => {
                let message = panic_message(payload);
                log::error!("Scheduler fault: {}", message);
                shared.finalize(FinishReason::Fault(message));
            }
        }
    }

    /// Returns true when all cycles completed naturally.
    fn run_cycles(&self) -> bool {
        for cycle in 1..=self.cycles {
            if !self.collect_phase(Phase::Untouch, cycle) {
                return false;
            }
            if !self.collect_phase(Phase::Touch, cycle) {
                return false;
            }
        }
        true
    }

    /// Enter a phase and hold it for the configured duration. Returns false
    /// when the phase was cut short: stop requested, or the run record was
    /// claimed elsewhere.
    fn collect_phase(&self, phase: Phase, cycle: u32) -> bool {
        if self.shared.stop_requested() {
            return false;
        }
        if !self.shared.enter_phase(phase, cycle) {
            return false;
        }

        let deadline = Instant::now() + self.phase_duration;
        loop {
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            if self.shared.stop_requested() {
                return false;
            }
            thread::sleep(self.poll_interval.min(deadline - now));
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "scheduler panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panic_message_extracts_str() {
        let payload: Box<dyn Any + Send> = Box::new("bad tick");
        assert_eq!(panic_message(payload), "bad tick");
    }

    #[test]
    fn test_panic_message_extracts_string() {
        let payload: Box<dyn Any + Send> = Box::new("bad tick".to_string());
        assert_eq!(panic_message(payload), "bad tick");
    }

    #[test]
    fn test_panic_message_fallback() {
        let payload: Box<dyn Any + Send> = Box::new(42u32);
        assert_eq!(panic_message(payload), "scheduler panicked");
    }
}
