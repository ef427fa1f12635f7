// Error types for the capsense rig service
//
// Each domain (run lifecycle, acquisition sources, export) carries its own
// error enum. Nothing in this crate propagates a failure past the run
// controller as a process fault: classification and export errors degrade to
// terminal labels or logged warnings, per the service's failure policy.

mod export;
mod run;
mod source;

pub use export::{log_export_error, ExportError};
pub use run::{log_run_error, ClassifyError, RunError};
pub use source::{log_source_error, SourceError};
