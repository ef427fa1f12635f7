// Export error types
//
// Export failures are logged and never block run finalization or status
// reporting; the error type exists so the CSV and plot writers can report
// precisely what went wrong.

use log::error;
use std::fmt;

/// Log an export error with structured context
pub fn log_export_error(err: &ExportError, context: &str) {
    error!("Export error in {}: {}", context, err);
}

/// Errors raised while writing CSV files or rendering the plot.
#[derive(Debug, Clone, PartialEq)]
pub enum ExportError {
    /// Filesystem-level failure (create/write/flush).
    Io { path: String, details: String },

    /// CSV serialization failure.
    Csv { path: String, details: String },

    /// Plot rendering failure.
    Plot { path: String, details: String },
}

impl fmt::Display for ExportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportError::Io { path, details } => write!(f, "I/O error on {}: {}", path, details),
            ExportError::Csv { path, details } => {
                write!(f, "CSV write error on {}: {}", path, details)
            }
            ExportError::Plot { path, details } => {
                write!(f, "Plot render error on {}: {}", path, details)
            }
        }
    }
}

impl std::error::Error for ExportError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_error_display() {
        let err = ExportError::Csv {
            path: "all_data.csv".to_string(),
            details: "disk full".to_string(),
        };
        assert!(err.to_string().contains("all_data.csv"));
        assert!(err.to_string().contains("disk full"));
    }
}
