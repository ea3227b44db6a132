//! Progress reporting for long passes over input files.
//!
//! Jobs report lines read and rows loaded through [`ProgressCallback`];
//! the CLI renders them with `indicatif` while tests pass
//! [`null_progress()`].

use std::sync::Arc;

/// Sink for progress updates from a job or loader.
///
/// Implementations must be `Send + Sync` so the two frequency jobs can
/// report from their own blocking tasks.
pub trait ProgressCallback: Send + Sync {
    /// Set the total expected units of work, once known.
    fn set_total(&self, total: u64);

    /// Advance progress by `delta` units.
    fn inc(&self, delta: u64);

    /// Mark the work as complete with a final message.
    fn finish(&self, msg: String);
}

/// Ignores every update.
pub struct NullProgress;

impl ProgressCallback for NullProgress {
    fn set_total(&self, _total: u64) {}
    fn inc(&self, _delta: u64) {}
    fn finish(&self, _msg: String) {}
}

/// Returns a shared [`NullProgress`].
#[must_use]
pub fn null_progress() -> Arc<dyn ProgressCallback> {
    Arc::new(NullProgress)
}
