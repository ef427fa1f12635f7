// Acquisition source error types

use log::error;
use std::fmt;

/// Log a source error with structured context
pub fn log_source_error(err: &SourceError, context: &str) {
    error!("Source error in {}: {}", context, err);
}

/// Errors raised by sample acquisition adapters.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceError {
    /// The serial port could not be opened.
    OpenFailed { port: String, details: String },

    /// The source was asked to start while already running.
    AlreadyRunning,
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceError::OpenFailed { port, details } => {
                write!(f, "Failed to open serial port {}: {}", port, details)
            }
            SourceError::AlreadyRunning => write!(f, "Sample source already running"),
        }
    }
}

impl std::error::Error for SourceError {}
