//! Console reporting of prepared and installed dotfiles.
//!
//! Each reported dotfile gets one line:
//!
//! ```text
//!  ◼ bash/bashrc     [ base machines/desktop ]
//! ```
//!
//! The indicator is red for errors, green for new files, yellow for removals
//! and blue for any other change.
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::config::SourceConfig;
use crate::events::InstallObserver;
use crate::installer::{
    ExecutedScript, InstallAction, InstallScript, InstalledDotfile, PreparedDotfile,
    PreparedInstall,
};
use crate::logging::{ItemStatus, Logger};

const RED: &str = "\x1b[31m";
const GREEN: &str = "\x1b[92m";
const YELLOW: &str = "\x1b[93m";
const BLUE: &str = "\x1b[34m";
const DIM: &str = "\x1b[90m";
const WHITE: &str = "\x1b[97m";
const RESET: &str = "\x1b[0m";

const INDICATOR: &str = "◼";

/// Reports install progress through a [`Logger`] and records every dotfile
/// and script for the run summary.
#[derive(Debug)]
pub struct InstallReport<'l> {
    log: &'l Logger,
    verbose: bool,
    force_reinstall: bool,
    width: AtomicUsize,
}

impl<'l> InstallReport<'l> {
    /// Create a report writing to `log`.
    #[must_use]
    pub const fn new(log: &'l Logger, verbose: bool, force_reinstall: bool) -> Self {
        Self {
            log,
            verbose,
            force_reinstall,
            width: AtomicUsize::new(0),
        }
    }

    /// Print the legend and the source and target roots. Verbose only.
    pub fn install_info(&self, config: &SourceConfig) {
        if !self.verbose {
            return;
        }
        self.log.info(&format!(
            "{DIM}legend:{RESET} {GREEN}{INDICATOR}{RESET} added {YELLOW}{INDICATOR}{RESET} removed {BLUE}{INDICATOR}{RESET} modified {RED}{INDICATOR}{RESET} error"
        ));
        self.log
            .info(&format!("{DIM}source:{RESET} {}", config.source_path.display()));
        self.log
            .info(&format!("{DIM}target:{RESET} {}", config.install_path.display()));
    }

    /// Report what an install would do without doing it.
    pub fn dry_run(&self, prepared: &PreparedInstall<'_>) {
        self.measure(prepared);
        for dotfile in &prepared.dotfiles {
            if !self.should_log(dotfile) {
                continue;
            }
            self.log.dry_run(&self.dotfile_line(dotfile));
            if let Some(e) = &dotfile.prepare_error {
                self.log.error(&format!("   {}: {e}", dotfile.dotfile.path));
                self.log.record(
                    &dotfile.dotfile.path,
                    ItemStatus::Failed,
                    Some(e.to_string().as_str()),
                );
            } else {
                self.log.record(&dotfile.dotfile.path, ItemStatus::DryRun, None);
            }
        }
        for script in &prepared.install_scripts {
            if script.executable
                && (self.force_reinstall || script.should_install(&prepared.dotfiles))
            {
                self.log
                    .dry_run(&format!("would run install script {}", script.path));
                self.log.record(&script.path, ItemStatus::DryRun, None);
            }
        }
    }

    /// Whether `dotfile` is worth a line: it failed, changed, or everything
    /// is being reinstalled.
    #[must_use]
    pub const fn should_log(&self, dotfile: &PreparedDotfile<'_>) -> bool {
        dotfile.prepare_error.is_some() || dotfile.is_changed() || self.force_reinstall
    }

    fn measure(&self, prepared: &PreparedInstall<'_>) {
        let width = prepared
            .dotfiles
            .iter()
            .filter(|d| self.should_log(d))
            .map(|d| d.dotfile.path.len())
            .max()
            .unwrap_or(0);
        self.width.store(width, Ordering::Relaxed);
    }

    fn dotfile_line(&self, prepared: &PreparedDotfile<'_>) -> String {
        format_dotfile(prepared, self.width.load(Ordering::Relaxed))
    }
}

/// Render one dotfile line with its path padded to `width`.
#[must_use]
pub fn format_dotfile(prepared: &PreparedDotfile<'_>, width: usize) -> String {
    let (color, indicator) = if prepared.prepare_error.is_some() {
        (RED, INDICATOR)
    } else if prepared.is_new {
        (GREEN, INDICATOR)
    } else if prepared.dotfile.removed {
        (YELLOW, INDICATOR)
    } else if prepared.is_changed() {
        (BLUE, INDICATOR)
    } else {
        (DIM, "-")
    };
    let groups = prepared
        .dotfile
        .sources
        .iter()
        .map(|s| s.group.as_str())
        .collect::<Vec<_>>()
        .join(" ");
    let path = &prepared.dotfile.path;
    format!(
        " {color}{indicator}{RESET} {path:<pad$} {DIM}[{RESET} {WHITE}{groups}{RESET} {DIM}]{RESET}",
        pad = width + 1
    )
}

impl InstallObserver for InstallReport<'_> {
    fn install_starting(&self, prepared: &PreparedInstall<'_>) {
        self.measure(prepared);
    }

    fn dotfile_installed(&self, installed: &InstalledDotfile<'_, '_>) {
        tracing::debug!(
            "{}: {:?}",
            installed.prepared.dotfile.path,
            installed.action
        );
    }

    fn install_done(&self, installed: &[InstalledDotfile<'_, '_>]) {
        for item in installed {
            let path = &item.prepared.dotfile.path;
            if self.should_log(item.prepared) {
                self.log.info(&self.dotfile_line(item.prepared));
            }
            match (item.error(), item.action) {
                (Some(e), _) => {
                    self.log.error(&format!("   {path}: {e}"));
                    let message = e.to_string();
                    self.log.record(path, ItemStatus::Failed, Some(&message));
                }
                (None, Some(InstallAction::Skipped) | None) => {
                    self.log.record(path, ItemStatus::Skipped, None);
                }
                (None, Some(_)) => self.log.record(path, ItemStatus::Ok, None),
            }
        }
    }

    fn script_exec_started(&self, scripts: &[InstallScript]) {
        if !scripts.is_empty() {
            self.log.stage("Running install scripts");
        }
    }

    fn script_executing(&self, script: &InstallScript) {
        self.log.info(&format!("running {}", script.path));
    }

    fn script_completed(&self, executed: &ExecutedScript<'_>) {
        let path = &executed.script.path;
        if let Some(e) = executed.error() {
            self.log.error(&format!("   {e}"));
            let message = e.to_string();
            self.log.record(path, ItemStatus::Failed, Some(&message));
        } else if executed.executed {
            self.log.record(path, ItemStatus::Ok, None);
        } else {
            self.log.debug(&format!("skipped install script {path}"));
            self.log.record(path, ItemStatus::Skipped, None);
        }
    }
}
