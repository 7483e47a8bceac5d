//! Progress reporting for the long-running phases of a run.
//!
//! The engine only reports; rendering lives in the binaries
//! (`fhrs_osm_cli_utils` wires this to `indicatif`).

use std::sync::Arc;

/// Receives progress updates from district assignment and analysis.
///
/// Shared across blocking worker tasks, hence `Send + Sync`.
pub trait ProgressCallback: Send + Sync {
    /// Sets the number of units of work in the phase.
    fn set_total(&self, total: u64);

    /// Records `delta` more completed units.
    fn inc(&self, delta: u64);

    /// Replaces the label shown next to the indicator.
    fn set_message(&self, msg: String);

    /// Marks the phase complete.
    fn finish(&self, msg: String);
}

/// Discards every update.
pub struct NullProgress;

impl ProgressCallback for NullProgress {
    fn set_total(&self, _total: u64) {}
    fn inc(&self, _delta: u64) {}
    fn set_message(&self, _msg: String) {}
    fn finish(&self, _msg: String) {}
}

/// Shared [`NullProgress`] for tests and quiet runs.
#[must_use]
pub fn null_progress() -> Arc<dyn ProgressCallback> {
    Arc::new(NullProgress)
}
