//! Progress reporting for long-running import operations.
//!
//! Decouples milestone reporting from any rendering backend. Both
//! adapters and the batch orchestrator call
//! [`ProgressCallback::report`] at coarse milestones: connecting,
//! per-page fetch counts, grouping, per-property persistence, geocoding
//! progress, and completion.

use std::sync::Arc;

/// Trait for reporting coarse progress milestones.
///
/// `total` is `0` when the total amount of work is not yet known
/// (e.g., while paginating an API of unknown size).
pub trait ProgressCallback: Send + Sync {
    /// Report a milestone. `current`/`total` carry the position within
    /// the current phase (property index out of total groups, address
    /// index out of addresses needing geocoding, and so on).
    fn report(&self, message: &str, current: u64, total: u64);
}

/// A no-op implementation that silently ignores all progress updates.
pub struct NullProgress;

impl ProgressCallback for NullProgress {
    fn report(&self, _message: &str, _current: u64, _total: u64) {}
}

/// An implementation that forwards milestones to the `log` crate.
pub struct LogProgress;

impl ProgressCallback for LogProgress {
    fn report(&self, message: &str, current: u64, total: u64) {
        if total > 0 {
            log::info!("{message} ({current}/{total})");
        } else {
            log::info!("{message}");
        }
    }
}

/// Returns a shared [`NullProgress`] instance for convenient use.
#[must_use]
pub fn null_progress() -> Arc<dyn ProgressCallback> {
    Arc::new(NullProgress)
}

/// Returns a shared [`LogProgress`] instance for convenient use.
#[must_use]
pub fn log_progress() -> Arc<dyn ProgressCallback> {
    Arc::new(LogProgress)
}
