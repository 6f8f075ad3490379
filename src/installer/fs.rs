//! File-system helpers shared by the preparer and the installer.
use std::fs;
use std::io;
use std::path::Path;

/// Mode used for directories created while installing dotfiles.
pub const DIRECTORY_MODE: u32 = 0o755;

/// Mask selecting the permission bits of a mode.
pub const PERMISSION_MASK: u32 = 0o777;

/// Ensure the parent directory of `path` exists, creating it (and any
/// ancestors) with [`DIRECTORY_MODE`] if necessary.
///
/// Sibling installs may create the same ancestors concurrently; a directory
/// that appears while this runs is not an error.
///
/// # Errors
///
/// Returns an error if the directory cannot be created.
pub fn ensure_parent_dir(path: &Path) -> io::Result<()> {
    let Some(parent) = path.parent() else {
        return Ok(());
    };
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt as _;
        builder.mode(DIRECTORY_MODE);
    }
    match builder.create(parent) {
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists && parent.is_dir() => Ok(()),
        other => other,
    }
}

/// Remove an existing symlink at `path`, including broken symlinks, so a
/// write lands on a fresh file instead of the link's target.
///
/// Does nothing if `path` does not exist or is not a symlink.
///
/// # Errors
///
/// Returns an error if the symlink exists but cannot be removed.
pub fn remove_symlink(path: &Path) -> io::Result<()> {
    match path.symlink_metadata() {
        Ok(meta) if meta.file_type().is_symlink() => fs::remove_file(path),
        _ => Ok(()),
    }
}

/// Open `path` for writing, creating it with `mode` or truncating it.
///
/// # Errors
///
/// Returns an error if the file cannot be opened.
pub fn create_truncated(path: &Path, mode: u32) -> io::Result<fs::File> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt as _;
        options.mode(mode);
    }
    #[cfg(not(unix))]
    let _ = mode;
    options.open(path)
}

/// Permission bits of `meta`.
#[cfg(unix)]
#[must_use]
pub fn permission_bits(meta: &fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt as _;
    meta.permissions().mode() & PERMISSION_MASK
}

/// Permission bits of `meta`.
#[cfg(not(unix))]
#[must_use]
pub fn permission_bits(meta: &fs::Metadata) -> u32 {
    if meta.permissions().readonly() {
        0o444
    } else {
        0o644
    }
}

/// Whether `meta` has the owner execute bit set.
#[must_use]
pub fn is_executable(meta: &fs::Metadata) -> bool {
    permission_bits(meta) & 0o100 != 0
}

/// Set the permission bits of `path` to `mode`.
///
/// # Errors
///
/// Returns an error if the permissions cannot be changed.
#[cfg(unix)]
pub fn set_mode(path: &Path, mode: u32) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt as _;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
}

/// Set the permission bits of `path` to `mode`.
///
/// # Errors
///
/// Returns an error if the permissions cannot be changed.
#[cfg(not(unix))]
pub fn set_mode(path: &Path, mode: u32) -> io::Result<()> {
    let mut permissions = fs::metadata(path)?.permissions();
    permissions.set_readonly(mode & 0o200 == 0);
    fs::set_permissions(path, permissions)
}
