//! Terminal progress for entry reconciliation.

use std::sync::Mutex;
use std::time::Duration;

use catalog_reconcile::ProgressSink;
use indicatif::{ProgressBar, ProgressStyle};

/// Prints a status line per phase and, when enabled, drives a progress bar
/// on stderr while the phase runs.
pub struct ConsoleProgress {
    show_bars: bool,
    bar: Mutex<Option<ProgressBar>>,
}

impl ConsoleProgress {
    pub fn new(show_bars: bool) -> Self {
        Self {
            show_bars,
            bar: Mutex::new(None),
        }
    }

    fn start(&self, total: usize, empty: &str, started: String) {
        self.finish();
        if total == 0 {
            println!("      ✔ {empty}");
            return;
        }

        println!("      ✔ {started}");
        if self.show_bars {
            let bar = ProgressBar::new(total as u64);
            if let Ok(style) = ProgressStyle::default_bar()
                .template("        [{bar:40.cyan/blue}] {pos}/{len} ({per_sec})")
            {
                bar.set_style(style.progress_chars("█▓▒░"));
            }
            bar.enable_steady_tick(Duration::from_millis(100));
            if let Ok(mut slot) = self.bar.lock() {
                *slot = Some(bar);
            }
        }
    }

    fn inc(&self) {
        if let Ok(slot) = self.bar.lock() {
            if let Some(bar) = slot.as_ref() {
                bar.inc(1);
                if bar.position() >= bar.length().unwrap_or(0) {
                    bar.finish();
                }
            }
        }
    }

    /// Finish and drop the current bar, if any.
    pub fn finish(&self) {
        if let Ok(mut slot) = self.bar.lock() {
            if let Some(bar) = slot.take() {
                bar.finish();
            }
        }
    }
}

impl ProgressSink for ConsoleProgress {
    fn on_delete_start(&self, total: usize) {
        self.start(
            total,
            "No entries to delete",
            format!("Deleting unmanaged entries... (found {total} entries in catalog not in source)"),
        );
    }

    fn on_delete_progress(&self) {
        self.inc();
    }

    fn on_create_start(&self, total: usize) {
        self.start(
            total,
            "No new entries to create",
            format!("Creating new entries in catalog... ({total} entries to create)"),
        );
    }

    fn on_create_progress(&self) {
        self.inc();
    }

    fn on_update_start(&self, total: usize) {
        self.start(
            total,
            "No existing entries to update",
            format!("Updating existing entries in catalog... ({total} entries to update)"),
        );
    }

    fn on_update_progress(&self) {
        self.inc();
    }
}

impl Drop for ConsoleProgress {
    fn drop(&mut self) {
        self.finish();
    }
}
