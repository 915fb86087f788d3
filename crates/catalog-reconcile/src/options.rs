//! Reconciliation options.

/// Default page size when listing entries.
pub const DEFAULT_PAGE_SIZE: usize = 250;

/// Default number of concurrent creates or deletes.
pub const DEFAULT_CONCURRENCY: usize = 10;

/// Default number of entries per bulk update.
pub const DEFAULT_UPDATE_BATCH_SIZE: usize = 100;

#[derive(Debug, Clone)]
pub struct ReconcileOptions {
    /// Delete observed entries that are not desired.
    pub prune: bool,
    pub page_size: usize,
    /// Maximum in-flight creates or deletes.
    pub concurrency: usize,
    /// Maximum entries per bulk update call.
    pub update_batch_size: usize,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            prune: true,
            page_size: DEFAULT_PAGE_SIZE,
            concurrency: DEFAULT_CONCURRENCY,
            update_batch_size: DEFAULT_UPDATE_BATCH_SIZE,
        }
    }
}

impl ReconcileOptions {
    #[must_use]
    pub fn with_prune(mut self, prune: bool) -> Self {
        self.prune = prune;
        self
    }

    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    #[must_use]
    pub fn with_update_batch_size(mut self, update_batch_size: usize) -> Self {
        self.update_batch_size = update_batch_size.max(1);
        self
    }
}
