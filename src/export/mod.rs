//! Per-run CSV and plot export.
//!
//! Each finalized run overwrites four process-local files in the configured
//! data directory: one CSV per sample view and one PNG line chart of the
//! full run. Export failures are logged and never block finalization or
//! status reporting.

mod csv;
mod plot;

use std::path::{Path, PathBuf};

use crate::classify::Mode;
use crate::error::log_export_error;
use crate::store::StoreSnapshot;

pub const ALL_CSV: &str = "all_data.csv";
pub const UNTOUCH_CSV: &str = "untouch_data.csv";
pub const TOUCH_CSV: &str = "touch_data.csv";
pub const PLOT_PNG: &str = "all_data_plot.png";

/// Writes a run's collected data to the configured directory.
#[derive(Debug, Clone)]
pub struct Exporter {
    data_dir: PathBuf,
}

impl Exporter {
    pub fn new(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn all_csv_path(&self) -> PathBuf {
        self.data_dir.join(ALL_CSV)
    }

    pub fn untouch_csv_path(&self) -> PathBuf {
        self.data_dir.join(UNTOUCH_CSV)
    }

    pub fn touch_csv_path(&self) -> PathBuf {
        self.data_dir.join(TOUCH_CSV)
    }

    pub fn plot_path(&self) -> PathBuf {
        self.data_dir.join(PLOT_PNG)
    }

    /// Write the three CSV views and render the plot.
    ///
    /// Every failure is logged and swallowed; a partially failed export
    /// still leaves whatever files did succeed.
    pub fn export_run(&self, snapshot: &StoreSnapshot, mode: Mode) {
        if let Err(err) = std::fs::create_dir_all(&self.data_dir) {
            log::error!(
                "Failed to create data directory {:?}: {}",
                self.data_dir,
                err
            );
            return;
        }

        for (path, samples) in [
            (self.all_csv_path(), &snapshot.all),
            (self.untouch_csv_path(), &snapshot.untouch),
            (self.touch_csv_path(), &snapshot.touch),
        ] {
            if let Err(err) = csv::write_csv(&path, samples) {
                log_export_error(&err, "export_run");
            } else {
                log::info!("{} saved ({} samples)", path.display(), samples.len());
            }
        }

        if snapshot.all.is_empty() {
            log::info!("No data available for plotting");
            return;
        }
        match plot::render_plot(&self.plot_path(), &snapshot.all, mode) {
            Ok(()) => log::info!("Plot saved to {}", self.plot_path().display()),
            Err(err) => log_export_error(&err, "export_run"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::{Sample, RX_CHANNELS};
    use tempfile::tempdir;

    fn sample(ts: f64, value: f64) -> Sample {
        Sample::new(ts, 1.0, [value; RX_CHANNELS])
    }

    #[test]
    fn test_export_run_writes_all_files() {
        let dir = tempdir().unwrap();
        let exporter = Exporter::new(dir.path().to_path_buf());

        let snapshot = StoreSnapshot {
            all: vec![sample(100.0, 10.0), sample(200.0, 20.0)],
            untouch: vec![sample(100.0, 10.0)],
            touch: vec![sample(200.0, 20.0)],
        };
        exporter.export_run(&snapshot, Mode::SoftHard);

        assert!(exporter.all_csv_path().exists());
        assert!(exporter.untouch_csv_path().exists());
        assert!(exporter.touch_csv_path().exists());
        assert!(exporter.plot_path().exists());
    }

    #[test]
    fn test_export_run_empty_views_create_empty_csvs_and_no_plot() {
        let dir = tempdir().unwrap();
        let exporter = Exporter::new(dir.path().to_path_buf());

        exporter.export_run(&StoreSnapshot::default(), Mode::FreshRotten);

        assert!(exporter.all_csv_path().exists());
        assert_eq!(std::fs::read(exporter.all_csv_path()).unwrap().len(), 0);
        assert!(!exporter.plot_path().exists());
    }

    #[test]
    fn test_export_run_overwrites_previous_run() {
        let dir = tempdir().unwrap();
        let exporter = Exporter::new(dir.path().to_path_buf());

        let first = StoreSnapshot {
            all: vec![sample(100.0, 10.0), sample(200.0, 20.0)],
            untouch: Vec::new(),
            touch: Vec::new(),
        };
        exporter.export_run(&first, Mode::SoftHard);
        let first_len = std::fs::read(exporter.all_csv_path()).unwrap().len();

        let second = StoreSnapshot {
            all: vec![sample(300.0, 30.0)],
            untouch: Vec::new(),
            touch: Vec::new(),
        };
        exporter.export_run(&second, Mode::SoftHard);
        let second_len = std::fs::read(exporter.all_csv_path()).unwrap().len();

        assert!(second_len < first_len);
    }
}
