//! Progress notifications emitted while installing.
//!
//! Dotfile notifications arrive from worker threads in completion order;
//! script notifications arrive in execution order on the calling thread.
use crate::installer::{ExecutedScript, InstallScript, InstalledDotfile, PreparedInstall};

/// Receiver of install progress. Every method defaults to doing nothing.
pub trait InstallObserver: Send + Sync {
    /// The install stage is about to begin.
    fn install_starting(&self, _prepared: &PreparedInstall<'_>) {}

    /// One dotfile finished installing, successfully or not.
    fn dotfile_installed(&self, _installed: &InstalledDotfile<'_, '_>) {}

    /// Every dotfile has been processed.
    fn install_done(&self, _installed: &[InstalledDotfile<'_, '_>]) {}

    /// The script stage is about to begin.
    fn script_exec_started(&self, _scripts: &[InstallScript]) {}

    /// A script process is about to be started.
    fn script_executing(&self, _script: &InstallScript) {}

    /// One script finished, or was skipped.
    fn script_completed(&self, _executed: &ExecutedScript<'_>) {}

    /// Every script has been processed.
    fn script_exec_done(&self, _executed: &[ExecutedScript<'_>]) {}
}

/// Observer that ignores every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl InstallObserver for NoopObserver {}
