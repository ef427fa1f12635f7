//! Integration tests for the run lifecycle
//!
//! These drive a real RunController with a real scheduler thread through
//! short (1s-per-phase) runs and validate:
//! - natural completion and classification in both modes
//! - phase routing of ingested samples
//! - export side effects on disk
//! - concurrent ingestion across phase transitions

use std::sync::Arc;
use std::time::{Duration, Instant};

use capsense_rig::classify::Mode;
use capsense_rig::export::Exporter;
use capsense_rig::run::{IngestOutcome, RunConfig, RunController};
use capsense_rig::sample::{Sample, RX_CHANNELS};

fn controller_in(dir: &std::path::Path) -> Arc<RunController> {
    Arc::new(RunController::new(
        Exporter::new(dir.to_path_buf()),
        Duration::from_millis(10),
    ))
}

fn config(mode: Mode, cycles: u32) -> RunConfig {
    RunConfig {
        cycles,
        phase_duration: Duration::from_secs(1),
        mode,
        threshold: mode.default_threshold(),
    }
}

fn sample_with_peak(ts: f64, peak: f64) -> Sample {
    let mut rx = [1.0; RX_CHANNELS];
    rx[2] = peak;
    Sample::new(ts, 5.0, rx)
}

/// Poll the controller status until `predicate` holds or `timeout` expires.
fn wait_for(
    controller: &RunController,
    timeout: Duration,
    predicate: impl Fn(&capsense_rig::run::StatusSnapshot) -> bool,
) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if predicate(&controller.status()) {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    false
}

#[test]
fn fresh_rotten_run_classifies_touch_peak() {
    let dir = tempfile::tempdir().unwrap();
    let controller = controller_in(dir.path());

    controller
        .start(config(Mode::FreshRotten, 1))
        .expect("start");

    assert!(
        wait_for(&controller, Duration::from_secs(3), |s| {
            s.status.contains("Collecting TOUCH")
        }),
        "run never reached the touch phase"
    );

    for i in 0..5 {
        let outcome = controller.ingest(sample_with_peak(1000.0 + i as f64 * 10.0, 751.0));
        assert_eq!(outcome, IngestOutcome::Stored);
    }

    assert!(
        wait_for(&controller, Duration::from_secs(5), |s| s.finished),
        "run never finished"
    );
    controller.join_scheduler();

    let snapshot = controller.status();
    assert_eq!(snapshot.result, "Fresh");
    assert_eq!(snapshot.average, None);
    assert_eq!(snapshot.status, "Test Complete");
    assert_eq!(snapshot.classification_type, "fresh_rotten");

    // Elapsed time is frozen at the total run duration (two 1s phases)
    assert!(snapshot.elapsed_time >= 1 && snapshot.elapsed_time <= 4);

    // Export side effects
    assert!(dir.path().join("all_data.csv").exists());
    assert!(dir.path().join("touch_data.csv").exists());
    assert!(dir.path().join("untouch_data.csv").exists());
    assert!(dir.path().join("all_data_plot.png").exists());

    let touch_csv = std::fs::read_to_string(dir.path().join("touch_data.csv")).unwrap();
    assert!(touch_csv.lines().count() > 1, "touch CSV should have rows");
}

#[test]
fn soft_hard_run_reports_average_peak() {
    let dir = tempfile::tempdir().unwrap();
    let controller = controller_in(dir.path());

    controller.start(config(Mode::SoftHard, 1)).expect("start");

    assert!(wait_for(&controller, Duration::from_secs(3), |s| {
        s.status.contains("Collecting TOUCH")
    }));

    controller.ingest(sample_with_peak(1000.0, 400.0));

    assert!(wait_for(&controller, Duration::from_secs(5), |s| s.finished));
    controller.join_scheduler();

    let snapshot = controller.status();
    // Single classification pass: the average equals this run's peak
    assert_eq!(snapshot.average, Some(400.0));
    assert_eq!(snapshot.result, "Hard");
}

#[test]
fn untouch_samples_never_reach_touch_view() {
    let dir = tempfile::tempdir().unwrap();
    let controller = controller_in(dir.path());

    controller.start(config(Mode::SoftHard, 1)).expect("start");

    assert!(wait_for(&controller, Duration::from_secs(3), |s| {
        s.status.contains("Collecting UNTOUCH")
    }));

    for i in 0..5 {
        controller.ingest(sample_with_peak(2000.0 + i as f64, 100.0));
    }

    assert!(wait_for(&controller, Duration::from_secs(5), |s| s.finished));
    controller.join_scheduler();

    let store = controller.store_snapshot();
    assert_eq!(store.untouch.len(), 5);
    assert!(store.touch.is_empty());
    assert_eq!(store.all.len(), 5);

    // Arrival order preserved in both views
    let times: Vec<f64> = store.untouch.iter().map(|s| s.timestamp_ms).collect();
    let mut sorted = times.clone();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
    assert_eq!(times, sorted);

    // No touch data was ever collected, so the run finishes unclassified
    assert_eq!(controller.status().result, "No Touch Data Collected");
}

#[test]
fn stopped_run_finalizes_once_and_stays_stable() {
    let dir = tempfile::tempdir().unwrap();
    let controller = controller_in(dir.path());

    controller.start(config(Mode::SoftHard, 3)).expect("start");
    controller.stop();

    let first = controller.status();
    assert!(first.finished);
    assert_eq!(first.result, "Test Stopped by User");

    // A second stop and the scheduler's own wakeup must not change anything
    controller.stop();
    controller.join_scheduler();
    std::thread::sleep(Duration::from_millis(50));

    let second = controller.status();
    assert_eq!(second.result, first.result);
    assert_eq!(second.status, first.status);
    assert_eq!(second.average, first.average);
}

#[test]
fn restart_supersedes_previous_record() {
    let dir = tempfile::tempdir().unwrap();
    let controller = controller_in(dir.path());

    controller.start(config(Mode::FreshRotten, 1)).expect("start");
    controller.ingest(sample_with_peak(1.0, 100.0));
    controller.stop();
    controller.join_scheduler();

    controller.start(config(Mode::SoftHard, 1)).expect("restart");

    let snapshot = controller.status();
    assert!(!snapshot.finished);
    assert_eq!(snapshot.result, "No result yet");
    assert_eq!(snapshot.classification_type, "soft_hard");
    assert!(controller.store_snapshot().all.is_empty());

    controller.stop();
    controller.join_scheduler();
}

#[test]
fn concurrent_ingest_routes_each_sample_to_one_phase_view() {
    let dir = tempfile::tempdir().unwrap();
    let controller = controller_in(dir.path());

    controller.start(config(Mode::SoftHard, 2)).expect("start");

    // Four writers hammer ingest across every phase transition of a
    // 2-cycle run; timestamps are globally unique so each sample can be
    // traced into exactly one view afterwards.
    let mut writers = Vec::new();
    for writer in 0..4u32 {
        let controller = Arc::clone(&controller);
        writers.push(std::thread::spawn(move || {
            let mut stored = 0u32;
            for i in 0..250u32 {
                let ts = (writer as f64) * 1_000_000.0 + i as f64;
                if controller.ingest(sample_with_peak(ts, 50.0)) == IngestOutcome::Stored {
                    stored += 1;
                }
                std::thread::sleep(Duration::from_millis(2));
            }
            stored
        }));
    }

    let stored_total: u32 = writers.into_iter().map(|w| w.join().unwrap()).sum();

    assert!(wait_for(&controller, Duration::from_secs(10), |s| s.finished));
    controller.join_scheduler();

    let store = controller.store_snapshot();
    assert_eq!(store.all.len() as u32, stored_total);

    // Each sample appears in at most one phase-tagged view
    let untouch: std::collections::HashSet<u64> = store
        .untouch
        .iter()
        .map(|s| s.timestamp_ms.to_bits())
        .collect();
    let touch: std::collections::HashSet<u64> = store
        .touch
        .iter()
        .map(|s| s.timestamp_ms.to_bits())
        .collect();
    assert!(untouch.is_disjoint(&touch));

    // Phase views only ever hold samples that are also in the all view
    let all: std::collections::HashSet<u64> =
        store.all.iter().map(|s| s.timestamp_ms.to_bits()).collect();
    assert!(untouch.is_subset(&all));
    assert!(touch.is_subset(&all));
    assert!(untouch.len() + touch.len() <= all.len());
}
