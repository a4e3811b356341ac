//! Run totals
//!
//! Counters for one `fetch_all` invocation. The run owns its summary
//! exclusively and updates it from a single task, so plain integers suffice.

use super::outcome::DownloadOutcome;

/// Aggregate result of one run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Number of items the run was asked to process
    pub total: usize,
    /// Items that reached a terminal outcome other than the rate-limit halt
    pub processed: usize,
    pub skipped: usize,
    pub errors: usize,
    pub warnings: usize,
    /// Run stopped early on HTTP 429
    pub rate_limited: bool,
}

impl RunSummary {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            ..Self::default()
        }
    }

    /// Fold one item outcome into the totals
    pub fn record(&mut self, outcome: &DownloadOutcome) {
        match outcome {
            DownloadOutcome::Saved { .. } | DownloadOutcome::SavedRenamed { .. } => {
                self.processed += 1;
            }
            DownloadOutcome::SavedWithWarning { .. } => {
                self.processed += 1;
                self.warnings += 1;
            }
            DownloadOutcome::Skipped { .. } => {
                self.processed += 1;
                self.skipped += 1;
            }
            DownloadOutcome::Error { .. } => {
                self.processed += 1;
                self.errors += 1;
            }
            // The halting item still counts as an error but was never completed
            DownloadOutcome::RateLimited { .. } => {
                self.errors += 1;
                self.rate_limited = true;
            }
        }
    }

    /// Items written to disk
    pub fn saved(&self) -> usize {
        let item_errors = self.errors.saturating_sub(usize::from(self.rate_limited));
        self.processed
            .saturating_sub(self.skipped)
            .saturating_sub(item_errors)
    }

    /// Whether every requested item was attempted
    pub fn completed(&self) -> bool {
        !self.rate_limited && self.processed == self.total
    }

    /// Final log line of a run
    pub fn summary_line(&self) -> String {
        format!(
            ">>> {} Files - Skipped: {}, Errors: {}, Warnings: {}",
            self.total, self.skipped, self.errors, self.warnings
        )
    }
}

impl std::fmt::Display for RunSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.summary_line())
    }
}
