use serde::Serialize;
use std::fmt;

/// Per-bucket counts of a reconciliation batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileSummary {
    /// Candidate files found on disk.
    pub total: usize,
    pub updated: usize,
    pub no_change: usize,
    /// Files that could not be stat'ed or have zero bytes.
    pub skipped_zero: usize,
    pub metadata_errors: usize,
    /// Files with no matching track in the library.
    pub db_misses: usize,
    pub db_update_errors: usize,
    /// Directories that could not be read during enumeration.
    pub skipped_dirs: usize,
}

impl ReconcileSummary {
    /// Number of files that reached a final bucket.
    pub fn processed(&self) -> usize {
        self.updated
            + self.no_change
            + self.skipped_zero
            + self.metadata_errors
            + self.db_misses
            + self.db_update_errors
    }
}

impl fmt::Display for ReconcileSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "total: {}, updated: {}, unchanged: {}, skipped (empty/unreadable): {}, \
             tag errors: {}, not in library: {}, write errors: {}, skipped directories: {}",
            self.total,
            self.updated,
            self.no_change,
            self.skipped_zero,
            self.metadata_errors,
            self.db_misses,
            self.db_update_errors,
            self.skipped_dirs
        )
    }
}

/// How a batch ended. Cancellation is an outcome, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    Completed(ReconcileSummary),
    Cancelled(ReconcileSummary),
}

impl ReconcileOutcome {
    pub fn summary(&self) -> &ReconcileSummary {
        match self {
            ReconcileOutcome::Completed(summary) | ReconcileOutcome::Cancelled(summary) => summary,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, ReconcileOutcome::Cancelled(_))
    }
}
