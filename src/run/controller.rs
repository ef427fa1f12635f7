// RunController - single entry point for run lifecycle operations
//
// Owns the one process-wide run record behind a lock, serializes
// start/stop/status/ingest against the in-flight scheduler thread, and
// funnels both completion paths (natural and external stop) through a
// finalize-once claim so classification and export happen at most once per
// run.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::classify::{self, Mode};
use crate::error::{log_run_error, RunError};
use crate::export::Exporter;
use crate::run::record::{RunConfig, RunRecord, RunStatus, StatusSnapshot};
use crate::run::scheduler::PhaseScheduler;
use crate::sample::Sample;
use crate::store::{Phase, StoreSnapshot};

/// Result of handing a sample to the controller. Discarded samples are
/// acknowledged to the caller either way; the distinction exists for the
/// push endpoint's response message and for observability counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    Stored,
    Discarded,
}

/// Why a run is being finalized.
pub(crate) enum FinishReason {
    /// All cycles completed naturally; the scheduler finalizes.
    Completed,
    /// External stop; the stop handler finalizes.
    Stopped,
    /// The scheduler hit an unexpected fault; finalize as Error so polling
    /// clients still reach a stable terminal state.
    Fault(String),
}

/// State shared between the controller, the scheduler thread, and the
/// ingestion path. The record lock guards every read-modify-write; the two
/// flags are readable without it.
pub(crate) struct RunShared {
    record: Mutex<RunRecord>,
    ingest_enabled: AtomicBool,
    stop_flag: AtomicBool,
    discarded: AtomicU64,
    exporter: Exporter,
}

impl RunShared {
    pub(crate) fn lock_record(&self) -> Result<MutexGuard<'_, RunRecord>, RunError> {
        self.record.lock().map_err(|_| RunError::LockPoisoned {
            component: "run_record".to_string(),
        })
    }

    pub(crate) fn stop_requested(&self) -> bool {
        self.stop_flag.load(Ordering::SeqCst)
    }

    /// Scheduler transition into a collection phase. Returns false if the
    /// run has already been claimed or finalized, in which case the
    /// scheduler must exit without touching the record further.
    pub(crate) fn enter_phase(&self, phase: Phase, cycle: u32) -> bool {
        let mut record = match self.lock_record() {
            Ok(record) => record,
            Err(err) => {
                log_run_error(&err, "enter_phase");
                return false;
            }
        };

        if !record.status.can_finalize() {
            return false;
        }

        record.phase = phase;
        record.cycle_index = cycle;
        record.status = RunStatus::Running { phase, cycle };
        log::info!("{}", record.status_line());
        true
    }

    /// Finalize the current run at most once.
    ///
    /// The first caller to reach a still-active record claims it by moving
    /// the status to Stopping; every later caller returns immediately.
    /// Classification and the label/average update happen inside that same
    /// critical section so a status poll never observes a torn record.
    /// Exports run outside the lock; the terminal status is published after.
    pub(crate) fn finalize(&self, reason: FinishReason) {
        self.ingest_enabled.store(false, Ordering::SeqCst);

        let stopped = matches!(reason, FinishReason::Stopped);
        let (snapshot, mode) = {
            let mut record = match self.lock_record() {
                Ok(record) => record,
                Err(err) => {
                    log_run_error(&err, "finalize");
                    return;
                }
            };

            if !record.status.can_finalize() {
                return;
            }

            record.phase = Phase::Idle;
            record.status = RunStatus::Stopping;
            record.stopped = stopped;

            match &reason {
                FinishReason::Completed | FinishReason::Stopped => {
                    let RunRecord {
                        store,
                        peak_history,
                        mode,
                        threshold,
                        ..
                    } = &mut *record;
                    let classification =
                        classify::classify(*mode, store.touch(), *threshold, peak_history);

                    let label = if stopped && record.store.touch().is_empty() {
                        "Test Stopped by User".to_string()
                    } else {
                        classification.label
                    };
                    record.average_peak = classification.average_peak;
                    record.label = Some(label);
                }
                FinishReason::Fault(_) => {
                    record.label =
                        Some("No Classification (Test Interrupted or Error)".to_string());
                }
            }

            (record.store.snapshot(), record.mode)
        };

        // CSV and plot writes never hold up status polling, and export
        // failures never block finalization.
        if !matches!(reason, FinishReason::Fault(_)) {
            self.exporter.export_run(&snapshot, mode);
        }

        match self.lock_record() {
            Ok(mut record) => {
                record.finished_at = Some(Instant::now());
                record.status = match reason {
                    FinishReason::Fault(message) => RunStatus::Error(message),
                    _ => RunStatus::Finished,
                };
                log::info!("{}", record.status_line());
            }
            Err(err) => log_run_error(&err, "finalize"),
        }
    }
}

/// The single process-wide owner of the run lifecycle.
pub struct RunController {
    shared: Arc<RunShared>,
    worker: Mutex<Option<JoinHandle<()>>>,
    poll_interval: Duration,
    started: Instant,
}

impl RunController {
    /// # Arguments
    /// * `exporter` - destination for per-run CSV files and the plot PNG
    /// * `poll_interval` - scheduler tick; bounds stop latency
    pub fn new(exporter: Exporter, poll_interval: Duration) -> Self {
        Self {
            shared: Arc::new(RunShared {
                record: Mutex::new(RunRecord::idle()),
                ingest_enabled: AtomicBool::new(false),
                stop_flag: AtomicBool::new(false),
                discarded: AtomicU64::new(0),
                exporter,
            }),
            worker: Mutex::new(None),
            poll_interval,
            started: Instant::now(),
        }
    }

    /// Start a new run.
    ///
    /// Rejects invalid configurations and rejects starts while a run is in
    /// flight. On success the previous record is superseded wholesale, the
    /// ingestion gate opens, and the phase scheduler launches on its own
    /// thread.
    ///
    /// # Errors
    /// - `InvalidConfig` - cycles/duration/threshold out of range
    /// - `AlreadyActive` - status is Starting, Running, or Stopping
    /// - `LockPoisoned` - shared state lock poisoned
    pub fn start(&self, config: RunConfig) -> Result<(), RunError> {
        config.validate().map_err(|err| {
            log_run_error(&err, "start");
            err
        })?;

        // The worker lock serializes concurrent starts; held for the whole
        // sequence so two starts cannot both pass the is_active check.
        let mut worker = self.worker.lock().map_err(|_| {
            let err = RunError::LockPoisoned {
                component: "scheduler_worker".to_string(),
            };
            log_run_error(&err, "start");
            err
        })?;

        {
            let record = self.shared.lock_record().map_err(|err| {
                log_run_error(&err, "start");
                err
            })?;
            if record.status.is_active() {
                let err = RunError::AlreadyActive;
                log_run_error(&err, "start");
                return Err(err);
            }
        }

        // The previous run is terminal, so its scheduler thread exits within
        // one poll interval; reap it before launching the next.
        if let Some(handle) = worker.take() {
            let _ = handle.join();
        }

        {
            let mut record = self.shared.lock_record().map_err(|err| {
                log_run_error(&err, "start");
                err
            })?;
            *record = RunRecord::new(&config, Instant::now());
            self.shared.stop_flag.store(false, Ordering::SeqCst);
            self.shared.ingest_enabled.store(true, Ordering::SeqCst);
        }

        log::info!(
            "Starting test: {} cycle(s), {:?} per phase, mode {}, threshold {}",
            config.cycles,
            config.phase_duration,
            config.mode.display_name(),
            config.threshold
        );

        let scheduler =
            PhaseScheduler::new(Arc::clone(&self.shared), &config, self.poll_interval);
        *worker = Some(thread::spawn(move || scheduler.run()));

        Ok(())
    }

    /// Stop the current run.
    ///
    /// Idempotent: raises the stop flag, closes the ingestion gate, and
    /// finalizes synchronously (classification on whatever was collected,
    /// CSV/plot export). A no-op on a never-started or already-finished run.
    pub fn stop(&self) {
        self.shared.stop_flag.store(true, Ordering::SeqCst);
        self.shared.ingest_enabled.store(false, Ordering::SeqCst);
        self.shared.finalize(FinishReason::Stopped);
    }

    /// Point-in-time status snapshot. Never blocks on the scheduler; the
    /// record lock is only ever held for short field updates on the polling
    /// path.
    pub fn status(&self) -> StatusSnapshot {
        match self.shared.lock_record() {
            Ok(record) => record.snapshot(Instant::now()),
            Err(err) => {
                log_run_error(&err, "status");
                StatusSnapshot {
                    status: "Test Manager Error: state lock poisoned".to_string(),
                    finished: true,
                    result: "No result yet".to_string(),
                    average: None,
                    classification_type: Mode::SoftHard.wire_name().to_string(),
                    elapsed_time: 0,
                }
            }
        }
    }

    /// Hand a sample to the current run.
    ///
    /// Samples arriving while ingestion is disabled are acknowledged and
    /// discarded (counted for observability). Accepted samples are routed by
    /// the phase in effect at the instant of the call, read under the same
    /// lock the scheduler writes it.
    pub fn ingest(&self, sample: Sample) -> IngestOutcome {
        if !self.shared.ingest_enabled.load(Ordering::SeqCst) {
            self.shared.discarded.fetch_add(1, Ordering::Relaxed);
            return IngestOutcome::Discarded;
        }

        match self.shared.lock_record() {
            Ok(mut record) => {
                // The gate may have closed while we waited on the lock
                if !record.status.can_finalize() {
                    drop(record);
                    self.shared.discarded.fetch_add(1, Ordering::Relaxed);
                    return IngestOutcome::Discarded;
                }
                let phase = record.phase;
                record.store.append(sample, phase);
                IngestOutcome::Stored
            }
            Err(err) => {
                log_run_error(&err, "ingest");
                self.shared.discarded.fetch_add(1, Ordering::Relaxed);
                IngestOutcome::Discarded
            }
        }
    }

    /// Owned copy of the current run's sample views.
    pub fn store_snapshot(&self) -> StoreSnapshot {
        match self.shared.lock_record() {
            Ok(record) => record.store.snapshot(),
            Err(err) => {
                log_run_error(&err, "store_snapshot");
                StoreSnapshot::default()
            }
        }
    }

    /// True while a run is starting, running, or stopping.
    pub fn is_active(&self) -> bool {
        self.shared
            .lock_record()
            .map(|record| record.status.is_active())
            .unwrap_or(false)
    }

    /// Samples acknowledged but discarded since process start.
    pub fn discarded_samples(&self) -> u64 {
        self.shared.discarded.load(Ordering::Relaxed)
    }

    /// Milliseconds since the controller was constructed.
    pub fn uptime_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }

    /// Block until the scheduler thread of the most recent run exits.
    /// Intended for orderly shutdown and tests; returns immediately when no
    /// run was ever started.
    pub fn join_scheduler(&self) {
        if let Ok(mut worker) = self.worker.lock() {
            if let Some(handle) = worker.take() {
                let _ = handle.join();
            }
        }
    }
}
