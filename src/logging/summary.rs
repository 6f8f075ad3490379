//! Per-item outcomes collected for the end-of-run summary.
use std::fmt;

/// Outcome of one dotfile or install script.
#[derive(Debug, Clone)]
pub struct ItemRecord {
    /// Destination path or script path.
    pub name: String,
    /// Final status.
    pub status: ItemStatus,
    /// Error description for failed items.
    pub message: Option<String>,
}

/// Status of a completed dotfile or script.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemStatus {
    /// Written, chmodded, removed, or executed successfully.
    Ok,
    /// Nothing to do, or skipped by option.
    Skipped,
    /// Reported only; dry-run mode left the filesystem alone.
    DryRun,
    /// An error was attached to the item.
    Failed,
}

/// Counts of each [`ItemStatus`] across a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    /// Items that changed something.
    pub ok: usize,
    /// Items left alone.
    pub skipped: usize,
    /// Items only reported.
    pub dry_run: usize,
    /// Items with an error.
    pub failed: usize,
}

impl Summary {
    /// Tally `records`.
    #[must_use]
    pub fn of(records: &[ItemRecord]) -> Self {
        records.iter().fold(Self::default(), |mut summary, record| {
            match record.status {
                ItemStatus::Ok => summary.ok += 1,
                ItemStatus::Skipped => summary.skipped += 1,
                ItemStatus::DryRun => summary.dry_run += 1,
                ItemStatus::Failed => summary.failed += 1,
            }
            summary
        })
    }

    /// Number of items counted.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.ok + self.skipped + self.dry_run + self.failed
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} items: \x1b[32m{} ok\x1b[0m, \x1b[33m{} skipped\x1b[0m",
            self.total(),
            self.ok,
            self.skipped
        )?;
        if self.dry_run > 0 {
            write!(f, ", \x1b[37m{} dry-run\x1b[0m", self.dry_run)?;
        }
        write!(f, ", \x1b[31m{} failed\x1b[0m", self.failed)
    }
}
