//! Domain-specific error types for the dots engine.
//!
//! Two families of errors exist and they are handled very differently:
//!
//! ```text
//! ConfigError  : fail-fast, blocks the whole operation before resolution
//! DotfileError : per-item, attached to one dotfile or script; siblings
//!                continue unaffected
//! ```
//!
//! Command handlers at the CLI boundary convert both to [`anyhow::Error`]
//! via the standard `?` operator.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors that arise from loading and validating the source configuration
/// and the lockfile.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("IO error reading config file {}: {source}", .path.display())]
    Io {
        /// Path to the file that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The configuration file is not valid YAML for the expected layout.
    #[error("Invalid config syntax in {}: {source}", .path.display())]
    Parse {
        /// Path to the offending file.
        path: PathBuf,
        /// Underlying deserialization error.
        source: serde_yaml_ng::Error,
    },

    /// A path in the configuration references an undefined variable.
    #[error("Cannot expand '{value}': {source}")]
    Expand {
        /// The raw value that failed to expand.
        value: String,
        /// Underlying lookup error.
        source: shellexpand::LookupError<std::env::VarError>,
    },

    /// The configured `source_path` does not exist.
    #[error("Specified source_path does not exist: {}", .0.display())]
    MissingSourcePath(PathBuf),

    /// The lockfile could not be read or written.
    #[error("IO error on lockfile {}: {source}", .path.display())]
    LockfileIo {
        /// Path to the lockfile.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The lockfile is not valid JSON for the expected layout.
    #[error("Invalid lockfile {}: {source}", .path.display())]
    LockfileParse {
        /// Path to the lockfile.
        path: PathBuf,
        /// Underlying JSON error.
        source: serde_json::Error,
    },

    /// The lockfile names a profile that is not configured.
    #[error("Profile '{0}' is not a configured profile")]
    UnknownProfile(String),

    /// The lockfile specifies both a profile and explicit groups.
    #[error("Groups should not be specified if a profile is configured")]
    GroupsWithProfile,

    /// The lockfile lists groups that are not configured.
    #[error("Lockfile contains invalid groups: {}", .0.join(", "))]
    UnknownGroups(Vec<String>),

    /// The lockfile lists groups that are already base groups.
    #[error("Lockfile groups include base groups: {}", .0.join(", "))]
    BaseGroupOverlap(Vec<String>),
}

/// Errors attached to a single dotfile or install script.
///
/// These never abort sibling processing; they are collected on the owning
/// entity and inspected once a batch has completed.
#[derive(Error, Debug)]
pub enum DotfileError {
    /// A filesystem operation on `path` failed.
    #[error("{action} {}: {source}", .path.display())]
    Io {
        /// Short description of the operation (e.g. `"stat"`, `"write"`).
        action: &'static str,
        /// Path the operation was applied to.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// At least one source is not a regular file, or sources disagree on
    /// their file type.
    #[error("Source files are not all regular files")]
    IrregularSources,

    /// Content marked for environment expansion is not valid UTF-8.
    #[error("cannot expand environment in non UTF-8 content")]
    NonUtf8Expansion,

    /// An install script exited unsuccessfully.
    #[error("script {} failed (exit {})", .script.display(), .code.map_or_else(|| "signal".to_string(), |c| c.to_string()))]
    ScriptFailed {
        /// Absolute path of the script.
        script: PathBuf,
        /// Exit code, if the process was not killed by a signal.
        code: Option<i32>,
    },

    /// The operation was cancelled before it started.
    #[error("cancelled")]
    Cancelled,
}

impl DotfileError {
    /// Build an [`DotfileError::Io`] for `path`.
    pub fn io(action: &'static str, path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            action,
            path: path.to_path_buf(),
            source,
        }
    }
}
