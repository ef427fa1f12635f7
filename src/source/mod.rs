//! Sample acquisition adapters.
//!
//! Both acquisition strategies funnel into [RunController::ingest]: the push
//! adapter is the HTTP `/api/post` route, and the pull adapter is
//! [SerialSource], which reads line-oriented text from the rig's serial
//! port. The trait keeps the run core independent of where samples come
//! from.

use std::sync::Arc;

use crate::error::SourceError;
use crate::run::RunController;

/// Trait implemented by pull-style acquisition backends.
///
/// A source runs on its own thread and hands every well-formed sample to
/// the controller; the controller decides whether the sample is stored or
/// discarded based on the run state.
pub trait SampleSource: Send + Sync {
    /// Begin producing samples into the controller.
    fn start(&self, controller: Arc<RunController>) -> Result<(), SourceError>;

    /// Stop producing and release the underlying device. Safe to call when
    /// not running.
    fn stop(&self);
}

mod serial;
pub use serial::SerialSource;
