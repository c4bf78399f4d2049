//! Progress reporting for background lookups.

use std::sync::Arc;

/// Receives progress from [`CoordinateResolver::resolve_all`](crate::CoordinateResolver::resolve_all).
///
/// `inc` is called from lookup tasks, so implementations must be
/// `Send + Sync`.
pub trait ProgressCallback: Send + Sync {
    /// Number of lookups the current batch started.
    fn set_total(&self, total: u64);

    /// `delta` lookups finished.
    fn inc(&self, delta: u64);

    fn set_message(&self, msg: String);

    /// The caller is done with this reporter.
    fn finish(&self, msg: String);
}

/// Discards all progress.
pub struct NullProgress;

impl ProgressCallback for NullProgress {
    fn set_total(&self, _total: u64) {}
    fn inc(&self, _delta: u64) {}
    fn set_message(&self, _msg: String) {}
    fn finish(&self, _msg: String) {}
}

/// A shared [`NullProgress`].
#[must_use]
pub fn null_progress() -> Arc<dyn ProgressCallback> {
    Arc::new(NullProgress)
}
