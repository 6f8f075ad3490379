//! Writing prepared dotfiles to the install root and recording the result.
use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::Path;

use rayon::prelude::*;

use super::compiler::open_dotfile;
use super::fs::{create_truncated, ensure_parent_dir, remove_symlink, set_mode};
use super::{InstallConfig, InstalledDotfile, PreparedDotfile, PreparedInstall};
use crate::config::Lockfile;
use crate::error::{ConfigError, DotfileError};

/// What [`install_dotfile`] did to the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallAction {
    /// Nothing: unchanged, failed to prepare, or already removed.
    Skipped,
    /// The target was deleted.
    Removed,
    /// Only the permissions were updated.
    Chmod,
    /// The contents were written.
    Written,
}

/// Bring one prepared dotfile's target in line with its sources.
///
/// # Errors
///
/// Returns an error if the target cannot be removed, created or written, or
/// if the run was cancelled before this dotfile was reached.
pub fn install_dotfile(
    prepared: &PreparedDotfile<'_>,
    config: &InstallConfig<'_>,
) -> Result<InstallAction, DotfileError> {
    if config.cancel.is_cancelled() {
        return Err(DotfileError::Cancelled);
    }
    if prepared.prepare_error.is_some() {
        return Ok(InstallAction::Skipped);
    }
    if !prepared.is_changed() && !config.force_reinstall {
        return Ok(InstallAction::Skipped);
    }

    let dotfile = prepared.dotfile;
    let path = config.target_root().join(&dotfile.path);

    if dotfile.removed {
        if prepared.removed_null {
            return Ok(InstallAction::Skipped);
        }
        fs::remove_file(&path).map_err(|e| DotfileError::io("remove", &path, e))?;
        return Ok(InstallAction::Removed);
    }

    // an override root holds no copy of the target to chmod
    if !prepared.is_new
        && !prepared.contents_differ
        && prepared.permissions.is_changed()
        && config.override_install_path.is_none()
    {
        set_mode(&path, prepared.permissions.new)
            .map_err(|e| DotfileError::io("chmod", &path, e))?;
        return Ok(InstallAction::Chmod);
    }

    ensure_parent_dir(&path).map_err(|e| DotfileError::io("mkdir", &path, e))?;
    remove_symlink(&path).map_err(|e| DotfileError::io("unlink", &path, e))?;

    let mut reader = open_dotfile(dotfile, config.source_path)?;
    let mode = prepared.permissions.new;
    let mut file =
        create_truncated(&path, mode).map_err(|e| DotfileError::io("create", &path, e))?;
    io::copy(&mut reader, &mut file).map_err(|e| DotfileError::io("write", &path, e))?;
    if mode != 0 {
        set_mode(&path, mode).map_err(|e| DotfileError::io("chmod", &path, e))?;
    }
    Ok(InstallAction::Written)
}

/// Install every prepared dotfile in parallel.
///
/// Results are index-aligned with `prepared.dotfiles`.
#[must_use]
pub fn install_dotfiles<'p, 'a>(
    prepared: &'p PreparedInstall<'a>,
    config: &InstallConfig<'_>,
) -> Vec<InstalledDotfile<'p, 'a>> {
    config.observer.install_starting(prepared);
    let installed: Vec<InstalledDotfile<'p, 'a>> = prepared
        .dotfiles
        .par_iter()
        .map(|dotfile| {
            let (action, install_error) = match install_dotfile(dotfile, config) {
                Ok(action) => (Some(action), None),
                Err(e) => (None, Some(e)),
            };
            let installed = InstalledDotfile {
                prepared: dotfile,
                action,
                install_error,
            };
            config.observer.dotfile_installed(&installed);
            installed
        })
        .collect();
    config.observer.install_done(&installed);
    installed
}

/// Record the outcome of an install in the lockfile and write it.
///
/// Entries for dotfiles outside this batch are kept. Within the batch only
/// dotfiles that installed without error and were not removed are recorded.
///
/// Returns `false` without writing when the run was cancelled.
///
/// # Errors
///
/// Returns an error if the lockfile cannot be written.
pub fn finalize_install(
    installed: &[InstalledDotfile<'_, '_>],
    lockfile: &mut Lockfile,
    lockfile_path: &Path,
    config: &InstallConfig<'_>,
) -> Result<bool, ConfigError> {
    if config.cancel.is_cancelled() {
        return Ok(false);
    }
    lockfile.installed_files = installed_files(installed, &lockfile.installed_files);
    lockfile.write(lockfile_path)?;
    Ok(true)
}

fn installed_files(installed: &[InstalledDotfile<'_, '_>], previous: &[String]) -> Vec<String> {
    let batch: BTreeSet<&str> = installed
        .iter()
        .map(|i| i.prepared.dotfile.path.as_str())
        .collect();
    let outside = previous
        .iter()
        .map(String::as_str)
        .filter(|path| !batch.contains(path));
    let succeeded = installed
        .iter()
        .filter(|i| i.error().is_none() && !i.prepared.dotfile.removed)
        .map(|i| i.prepared.dotfile.path.as_str());
    outside
        .chain(succeeded)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}
