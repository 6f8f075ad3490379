//! The JSON lockfile recording the active selection and installed files.
use std::fs;
use std::io::{self, Write as _};
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::SourceConfig;
use super::validation::{difference, intersect};
use crate::error::ConfigError;

/// Persisted state stored alongside the installed dotfiles.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Lockfile {
    /// Selected profile, empty when none is configured.
    pub profile: String,
    /// Explicit groups used when no profile is selected.
    pub groups: Vec<String>,
    /// Destination paths installed by the last successful run.
    pub installed_files: Vec<String>,
}

impl Lockfile {
    /// Read the lockfile at `path`. A missing file yields the empty default.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::LockfileIo {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        serde_json::from_str(&contents).map_err(|source| ConfigError::LockfileParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Truncate and rewrite the lockfile at `path`, syncing it to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the parent directory or file cannot be written.
    pub fn write(&self, path: &Path) -> Result<(), ConfigError> {
        let io_err = |source| ConfigError::LockfileIo {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let mut data = serde_json::to_vec_pretty(self).map_err(|source| {
            ConfigError::LockfileParse {
                path: path.to_path_buf(),
                source,
            }
        })?;
        data.push(b'\n');

        let mut file = fs::File::create(path).map_err(io_err)?;
        file.write_all(&data).map_err(io_err)?;
        file.sync_all().map_err(io_err)
    }

    /// Check the lockfile's selection against the sanitized configuration.
    ///
    /// With a profile selected, the profile must exist and no explicit groups
    /// may be set. With explicit groups, every group must be configured and
    /// none may already be a base group.
    ///
    /// # Errors
    ///
    /// Returns the first rule violated.
    pub fn validate(&self, config: &SourceConfig) -> Result<(), ConfigError> {
        if !self.profile.is_empty() {
            if !config.profiles.contains_key(&self.profile) {
                return Err(ConfigError::UnknownProfile(self.profile.clone()));
            }
            if !self.groups.is_empty() {
                return Err(ConfigError::GroupsWithProfile);
            }
            return Ok(());
        }

        let unknown = difference(&self.groups, &config.groups);
        if !unknown.is_empty() {
            return Err(ConfigError::UnknownGroups(unknown));
        }

        let overlap = intersect(&self.groups, &config.base_groups);
        if !overlap.is_empty() {
            return Err(ConfigError::BaseGroupOverlap(overlap));
        }

        Ok(())
    }

    /// Active groups in cascade order: base groups followed by the selected
    /// profile's groups, or by the explicit groups when no profile matches.
    #[must_use]
    pub fn resolve_groups(&self, config: &SourceConfig) -> Vec<String> {
        let selected = config
            .profiles
            .get(&self.profile)
            .unwrap_or(&self.groups);
        config
            .base_groups
            .iter()
            .chain(selected)
            .cloned()
            .collect()
    }

    /// Groups to display for the current selection.
    #[must_use]
    pub fn selected_groups<'a>(&'a self, config: &'a SourceConfig) -> &'a [String] {
        config
            .profiles
            .get(&self.profile)
            .map_or(self.groups.as_slice(), Vec::as_slice)
    }
}
