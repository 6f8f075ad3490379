//! Source configuration, lockfile, and configuration sanitizing.
//!
//! The source configuration is a YAML file describing where the dotfile
//! sources live, where they are installed, and which groups and profiles
//! exist. The lockfile is a JSON file stored next to the installed dotfiles
//! that records the selected profile or groups and what was last installed.
pub mod lockfile;
pub mod validation;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::ConfigError;

pub use lockfile::Lockfile;
pub use validation::{ValidationWarning, sanitize};

/// Environment variable overriding the source configuration location.
pub const CONFIG_ENV: &str = "DOTS_CONFIG";

/// Location of the source configuration when [`CONFIG_ENV`] is unset.
const DEFAULT_CONFIG_PATH: &str = "${HOME}/.local/etc/config.yml";

const DEFAULT_OVERRIDE_SUFFIX: &str = "override";
const DEFAULT_INSTALL_SUFFIX: &str = "install";

/// Profile name to ordered group list.
pub type Profiles = BTreeMap<String, Vec<String>>;

/// On-disk layout of the source configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawSourceConfig {
    source_path: Option<String>,
    install_path: Option<String>,
    lockfile_path: Option<String>,
    override_suffix: Option<String>,
    install_suffix: Option<String>,
    groups: Vec<String>,
    base_groups: Vec<String>,
    profiles: Profiles,
    expand_environment: Vec<String>,
}

/// Loaded source configuration with defaults applied and paths expanded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceConfig {
    /// Root of the dotfile sources. Defaults to the config file's directory.
    pub source_path: PathBuf,
    /// Root that dotfiles are installed into.
    pub install_path: PathBuf,
    /// Lockfile location. Defaults to `<install_path>/dots/dotlock.json`.
    pub lockfile_path: PathBuf,
    /// Suffix (without the dot) marking override sources.
    pub override_suffix: String,
    /// Suffix (without the dot) marking install scripts.
    pub install_suffix: String,
    /// All groups provided by the source tree, possibly nested (`machines/desktop`).
    pub groups: Vec<String>,
    /// Groups that are always installed.
    pub base_groups: Vec<String>,
    /// Named group selections. Base groups are implied.
    pub profiles: Profiles,
    /// Destination paths that get `${NAME}` expansion when compiled.
    pub expand_environment: Vec<String>,
}

impl SourceConfig {
    /// Read and parse the configuration at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid YAML, or a
    /// path value references an undefined variable.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&contents, path)
    }

    /// Parse configuration `contents` as if loaded from `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if `contents` is not valid YAML or a path value
    /// references an undefined variable.
    pub fn from_yaml(contents: &str, path: &Path) -> Result<Self, ConfigError> {
        let raw: RawSourceConfig =
            serde_yaml_ng::from_str(contents).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        let source_path = match raw.source_path.as_deref().filter(|s| !s.is_empty()) {
            Some(value) => expand_path(value)?,
            None => path.parent().map_or_else(PathBuf::new, Path::to_path_buf),
        };
        let install_path = expand_path(raw.install_path.as_deref().unwrap_or_default())?;
        let lockfile_path = match raw.lockfile_path.as_deref().filter(|s| !s.is_empty()) {
            Some(value) => expand_path(value)?,
            None => install_path.join("dots").join("dotlock.json"),
        };

        Ok(Self {
            source_path,
            install_path,
            lockfile_path,
            override_suffix: raw
                .override_suffix
                .unwrap_or_else(|| DEFAULT_OVERRIDE_SUFFIX.to_string()),
            install_suffix: raw
                .install_suffix
                .unwrap_or_else(|| DEFAULT_INSTALL_SUFFIX.to_string()),
            groups: raw.groups,
            base_groups: raw.base_groups,
            profiles: raw.profiles,
            expand_environment: raw.expand_environment,
        })
    }

    /// Names of all configured profiles, sorted.
    #[must_use]
    pub fn profile_names(&self) -> Vec<&str> {
        self.profiles.keys().map(String::as_str).collect()
    }
}

/// Determine the location of the source configuration file.
///
/// An explicit path wins, then [`CONFIG_ENV`], then
/// `${HOME}/.local/etc/config.yml`.
///
/// # Errors
///
/// Returns an error if the default path cannot be expanded.
pub fn source_config_path(explicit: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }
    match std::env::var_os(CONFIG_ENV) {
        Some(path) if !path.is_empty() => Ok(PathBuf::from(path)),
        _ => expand_path(DEFAULT_CONFIG_PATH),
    }
}

/// Expand `~` and `$VAR` / `${VAR}` references in a configured path.
fn expand_path(value: &str) -> Result<PathBuf, ConfigError> {
    shellexpand::full(value)
        .map(|expanded| PathBuf::from(expanded.as_ref()))
        .map_err(|source| ConfigError::Expand {
            value: value.to_string(),
            source,
        })
}
