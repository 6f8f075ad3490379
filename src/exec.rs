//! Child process helpers for install scripts and external tools.
//!
//! The process helpers pass standard output and standard error straight through to
//! the invoking terminal; callers only inspect the exit status.
use std::ffi::OsStr;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};

/// Run `program` in `dir` with extra environment variables and inherited
/// stdio, waiting for it to exit.
///
/// # Errors
///
/// Returns the spawn error if the program could not be started.
pub fn status_in_with_env<P, A>(
    dir: &Path,
    program: P,
    args: &[A],
    env: &[(&str, &str)],
) -> io::Result<ExitStatus>
where
    P: AsRef<OsStr>,
    A: AsRef<OsStr>,
{
    let mut cmd = Command::new(program);
    cmd.args(args)
        .current_dir(dir)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit());
    for (k, v) in env {
        cmd.env(k, v);
    }
    cmd.status()
}

/// Run `program` with inherited stdio in the current directory.
///
/// # Errors
///
/// Returns the spawn error if the program could not be started.
pub fn status<P, A>(program: P, args: &[A]) -> io::Result<ExitStatus>
where
    P: AsRef<OsStr>,
    A: AsRef<OsStr>,
{
    Command::new(program)
        .args(args)
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
}

/// Locate `program` on `PATH`.
#[must_use]
pub fn which(program: &str) -> Option<PathBuf> {
    which::which(program).ok()
}
