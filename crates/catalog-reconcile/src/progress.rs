//! Progress reporting.

/// Receives progress for each phase of a reconciliation.
///
/// `*_start` is called once per phase with the number of operations, then
/// `*_progress` once per completed operation. Updates report per entry even
/// though they are sent in batches.
pub trait ProgressSink: Send + Sync {
    fn on_delete_start(&self, _total: usize) {}
    fn on_delete_progress(&self) {}
    fn on_create_start(&self, _total: usize) {}
    fn on_create_progress(&self) {}
    fn on_update_start(&self, _total: usize) {}
    fn on_update_progress(&self) {}
}

/// Discards all progress.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopProgress;

impl ProgressSink for NoopProgress {}
