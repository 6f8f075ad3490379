//! Preparation, installation and install-script execution for resolved
//! dotfiles.
//!
//! The pipeline runs in strictly separated stages, each consuming the full
//! output of the previous one:
//!
//! ```text
//! prepare_dotfiles ─> install_dotfiles ─> run_install_scripts ─> finalize_install
//!   (parallel)          (parallel)          (sequential)           (lockfile)
//! ```
//!
//! Failures are attached to the item they concern and never stop siblings.
pub mod compiler;
pub mod fs;
mod install;
mod prepare;
mod scripts;
pub mod transforms;

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::config::SourceConfig;
use crate::error::DotfileError;
use crate::events::{InstallObserver, NoopObserver};
use crate::resolver::Dotfile;

pub use install::{InstallAction, finalize_install, install_dotfile, install_dotfiles};
pub use prepare::{prepare_dotfile, prepare_dotfiles};
pub use scripts::{run_install_script, run_install_scripts};

/// Environment variable carrying the source root to install scripts.
pub const SOURCE_ENV: &str = "DOTS_SOURCE";

/// Environment variable carrying the force-reinstall flag to install scripts.
pub const FORCE_REINSTALL_ENV: &str = "DOTS_FORCE_REINSTALL";

/// Old and new permission bits of a dotfile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FileMode {
    /// Permissions of the installed file, `0` if it does not exist.
    pub old: u32,
    /// Flattened permissions of the sources, `0` if there are none.
    pub new: u32,
}

impl FileMode {
    /// Whether the permissions differ. Never true while either side is `0`.
    #[must_use]
    pub const fn is_changed(&self) -> bool {
        self.new != self.old && self.old != 0 && self.new != 0
    }
}

/// A dotfile checked against its install target.
#[derive(Debug)]
pub struct PreparedDotfile<'a> {
    /// The resolved dotfile.
    pub dotfile: &'a Dotfile,
    /// The target does not exist yet.
    pub is_new: bool,
    /// The compiled sources differ from the installed file.
    pub contents_differ: bool,
    /// Some source is not a regular file; the dotfile cannot be installed.
    pub sources_are_irregular: bool,
    /// Installed and flattened source permissions.
    pub permissions: FileMode,
    /// The sources disagree on permissions and the lowest was taken.
    pub source_permissions_differ: bool,
    /// Marked removed but already absent from the install root.
    pub removed_null: bool,
    /// Newly added but replaces a file that was not installed by dots.
    pub overwrites_existing: bool,
    /// Failure while preparing; the other fields may be incomplete.
    pub prepare_error: Option<DotfileError>,
}

impl<'a> PreparedDotfile<'a> {
    /// A prepared dotfile with every flag cleared.
    #[must_use]
    pub const fn new(dotfile: &'a Dotfile) -> Self {
        Self {
            dotfile,
            is_new: false,
            contents_differ: false,
            sources_are_irregular: false,
            permissions: FileMode { old: 0, new: 0 },
            source_permissions_differ: false,
            removed_null: false,
            overwrites_existing: false,
            prepare_error: None,
        }
    }

    /// Whether installing would change anything on disk or in the lockfile.
    #[must_use]
    pub const fn is_changed(&self) -> bool {
        self.is_new
            || self.dotfile.added
            || self.dotfile.removed
            || self.contents_differ
            || self.permissions.is_changed()
    }
}

/// An install script shared by one or more prepared dotfiles.
#[derive(Debug)]
pub struct InstallScript {
    /// Script path relative to the source root.
    pub path: String,
    /// Absolute path of the script file.
    pub file_path: PathBuf,
    /// Working directory relative to the install root.
    pub relative_dir: String,
    /// Indices into [`PreparedInstall::dotfiles`] of the dotfiles triggering it.
    pub required_by: Vec<usize>,
    /// The owner execute bit is set.
    pub executable: bool,
    /// Failure while inspecting the script.
    pub prepare_error: Option<DotfileError>,
}

impl InstallScript {
    /// Whether any triggering dotfile has changed.
    #[must_use]
    pub fn should_install(&self, dotfiles: &[PreparedDotfile<'_>]) -> bool {
        self.required_by
            .iter()
            .filter_map(|&i| dotfiles.get(i))
            .any(PreparedDotfile::is_changed)
    }
}

/// Output of [`prepare_dotfiles`]: every dotfile in resolved order plus the
/// deduplicated install scripts in order of first use.
#[derive(Debug)]
pub struct PreparedInstall<'a> {
    /// Prepared dotfiles, index-aligned with the input.
    pub dotfiles: Vec<PreparedDotfile<'a>>,
    /// Install scripts, each listed once.
    pub install_scripts: Vec<InstallScript>,
}

/// A prepared dotfile after the install stage.
#[derive(Debug)]
pub struct InstalledDotfile<'p, 'a> {
    /// The prepared dotfile.
    pub prepared: &'p PreparedDotfile<'a>,
    /// What was done, if installation succeeded.
    pub action: Option<InstallAction>,
    /// Failure while installing.
    pub install_error: Option<DotfileError>,
}

impl InstalledDotfile<'_, '_> {
    /// The preparation or installation error, if any.
    #[must_use]
    pub fn error(&self) -> Option<&DotfileError> {
        self.prepared
            .prepare_error
            .as_ref()
            .or(self.install_error.as_ref())
    }
}

/// An install script after the script stage.
#[derive(Debug)]
pub struct ExecutedScript<'p> {
    /// The script.
    pub script: &'p InstallScript,
    /// The script process was started.
    pub executed: bool,
    /// Failure while executing.
    pub execution_error: Option<DotfileError>,
}

impl ExecutedScript<'_> {
    /// The preparation or execution error, if any.
    #[must_use]
    pub fn error(&self) -> Option<&DotfileError> {
        self.script
            .prepare_error
            .as_ref()
            .or(self.execution_error.as_ref())
    }
}

/// Shared flag that stops pending installs and scripts once set.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// A token that is not cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

static NOOP_OBSERVER: NoopObserver = NoopObserver;

/// Options for the install and script stages.
#[derive(Clone)]
pub struct InstallConfig<'a> {
    /// Root the dotfile sources are read from.
    pub source_path: &'a Path,
    /// Configured install root.
    pub install_path: &'a Path,
    /// Install here instead of `install_path`.
    pub override_install_path: Option<&'a Path>,
    /// Install every dotfile and run every script, changed or not.
    pub force_reinstall: bool,
    /// Do not run install scripts.
    pub skip_install_scripts: bool,
    /// Cancellation flag checked before each install and script.
    pub cancel: CancelToken,
    /// Progress sink.
    pub observer: &'a dyn InstallObserver,
}

impl<'a> InstallConfig<'a> {
    /// Install into the configured install root with default options.
    #[must_use]
    pub fn new(config: &'a SourceConfig) -> Self {
        Self {
            source_path: &config.source_path,
            install_path: &config.install_path,
            override_install_path: None,
            force_reinstall: false,
            skip_install_scripts: false,
            cancel: CancelToken::new(),
            observer: &NOOP_OBSERVER,
        }
    }

    /// Root that dotfiles are written to.
    #[must_use]
    pub fn target_root(&self) -> &'a Path {
        self.override_install_path.unwrap_or(self.install_path)
    }
}

impl fmt::Debug for InstallConfig<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstallConfig")
            .field("source_path", &self.source_path)
            .field("install_path", &self.install_path)
            .field("override_install_path", &self.override_install_path)
            .field("force_reinstall", &self.force_reinstall)
            .field("skip_install_scripts", &self.skip_install_scripts)
            .field("cancel", &self.cancel)
            .finish_non_exhaustive()
    }
}
