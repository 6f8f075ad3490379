use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::subscriber::{DRY_RUN_TARGET, STAGE_TARGET};
use super::summary::{ItemRecord, ItemStatus, Summary};
use super::utils::log_file_path;

/// Command-facing logger.
///
/// Messages become [`tracing`] events rendered by the subscriber from
/// [`init_subscriber`](super::init_subscriber). Per-item outcomes are kept
/// for the summary printed at the end of a run.
#[derive(Debug)]
pub struct Logger {
    records: Mutex<Vec<ItemRecord>>,
    log_file: Option<PathBuf>,
}

impl Logger {
    /// Logger for `command`, reporting the file the subscriber writes to.
    #[must_use]
    pub fn new(command: &str) -> Self {
        Self {
            records: Mutex::default(),
            log_file: log_file_path(command),
        }
    }

    /// Logger reporting `path` as its log file.
    #[must_use]
    pub fn with_log_file(path: &Path) -> Self {
        Self {
            records: Mutex::default(),
            log_file: Some(path.to_path_buf()),
        }
    }

    /// The log file, when one could be created.
    #[must_use]
    pub fn log_path(&self) -> Option<&Path> {
        self.log_file.as_deref()
    }

    /// All recorded outcomes in recording order.
    #[must_use]
    pub fn records(&self) -> Vec<ItemRecord> {
        self.records
            .lock()
            .map(|records| records.clone())
            .unwrap_or_default()
    }

    /// Log an error.
    pub fn error(&self, msg: &str) {
        tracing::error!("{msg}");
    }

    /// Log a warning.
    pub fn warn(&self, msg: &str) {
        tracing::warn!("{msg}");
    }

    /// Section header.
    pub fn stage(&self, msg: &str) {
        tracing::info!(target: STAGE_TARGET, "{msg}");
    }

    /// Log a plain line.
    pub fn info(&self, msg: &str) {
        tracing::info!("{msg}");
    }

    /// Shown on the console only when verbose; always in the log file.
    pub fn debug(&self, msg: &str) {
        tracing::debug!("{msg}");
    }

    /// Something a dry run would have done.
    pub fn dry_run(&self, msg: &str) {
        tracing::info!(target: DRY_RUN_TARGET, "{msg}");
    }

    /// Record the outcome of a dotfile or install script.
    pub fn record(&self, name: &str, status: ItemStatus, message: Option<&str>) {
        if let Ok(mut records) = self.records.lock() {
            records.push(ItemRecord {
                name: name.to_string(),
                status,
                message: message.map(ToString::to_string),
            });
        }
    }

    /// Tally of the recorded outcomes.
    #[must_use]
    pub fn summary(&self) -> Summary {
        self.records
            .lock()
            .map(|records| Summary::of(&records))
            .unwrap_or_default()
    }

    /// Print the tally, each failure, and the log file location. Prints
    /// nothing when no outcome was recorded.
    pub fn print_summary(&self) {
        let records = self.records();
        if records.is_empty() {
            return;
        }

        self.stage("Summary");
        self.info(&Summary::of(&records).to_string());
        for record in records.iter().filter(|r| r.status == ItemStatus::Failed) {
            let detail = record
                .message
                .as_ref()
                .map_or_else(String::new, |message| format!(": {message}"));
            self.info(&format!("\x1b[31mfailed\x1b[0m {}{detail}", record.name));
        }
        if let Some(path) = &self.log_file {
            self.info(&format!("\x1b[2mlog: {}\x1b[0m", path.display()));
        }
    }
}
