use std::ffi::OsString;
use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};

use super::CommandSetup;
use crate::cli::{DiffOpts, GlobalOpts};
use crate::exec;
use crate::installer::{InstallConfig, install_dotfiles, prepare_dotfiles};
use crate::logging::Logger;
use crate::resolver::Dotfile;

/// Run the diff command: install changed dotfiles into a staging directory
/// and let `git diff` compare it with the install root.
///
/// # Errors
///
/// Returns an error if git is missing, setup fails, or the staging directory
/// cannot be created.
pub fn run(global: &GlobalOpts, opts: &DiffOpts, log: &Logger) -> Result<()> {
    let Some(git) = exec::which("git") else {
        anyhow::bail!("git is required for diff");
    };

    let (flags, filter) = split_args(&opts.args);
    let setup = CommandSetup::init(global, log)?;
    let config = &setup.config;
    let dotfiles: Vec<Dotfile> = setup
        .resolve(log)?
        .filter(&filter)
        .iter()
        .filter(|d| !d.removed)
        .cloned()
        .collect();

    let staged = tempfile::Builder::new()
        .prefix("dots-staged")
        .tempdir()
        .context("failed to create staging directory")?;
    let link = StagedLink::create(staged.path(), &config.install_path)?;

    let prepared = prepare_dotfiles(&dotfiles, &config.source_path, &config.install_path);
    let mut install = InstallConfig::new(config);
    install.override_install_path = Some(staged.path());
    install.skip_install_scripts = true;
    for item in install_dotfiles(&prepared, &install) {
        if let Some(e) = item.error() {
            log.warn(&format!("{}: {e}", item.prepared.dotfile.path));
        }
    }

    let args = git_args(&flags, &config.install_path, link.path());
    log.debug(&format!("git {args:?}"));
    // git diff exits 1 when there are differences
    let status = exec::status(&git, &args).context("failed to run git diff")?;
    log.debug(&format!("git diff exited with {status}"));
    Ok(())
}

/// Split arguments into git-diff flags and destination filters, dropping
/// `--` separators.
fn split_args(args: &[String]) -> (Vec<String>, Vec<String>) {
    args.iter()
        .filter(|arg| *arg != "--")
        .cloned()
        .partition(|arg| arg.starts_with('-'))
}

fn git_args(flags: &[String], install_path: &Path, staged: &Path) -> Vec<OsString> {
    let mut staged_dir = staged.as_os_str().to_owned();
    staged_dir.push("/");

    let mut args: Vec<OsString> = ["diff", "--no-index", "--diff-filter=MA"]
        .into_iter()
        .map(OsString::from)
        .collect();
    args.extend(flags.iter().map(OsString::from));
    args.push("--".into());
    args.push(install_path.as_os_str().to_owned());
    args.push(staged_dir);
    args
}

/// `<install_path>-staged` pointing at the staging directory so the diff
/// shows readable paths. Removed on drop.
#[derive(Debug)]
struct StagedLink(PathBuf);

impl StagedLink {
    #[cfg(unix)]
    fn create(target: &Path, install_path: &Path) -> Result<Self> {
        let mut link = install_path.as_os_str().to_owned();
        link.push("-staged");
        let link = PathBuf::from(link);
        std::os::unix::fs::symlink(target, &link)
            .with_context(|| format!("failed to create {}", link.display()))?;
        Ok(Self(link))
    }

    #[cfg(not(unix))]
    #[allow(clippy::unnecessary_wraps)]
    fn create(target: &Path, _install_path: &Path) -> Result<Self> {
        Ok(Self(target.to_path_buf()))
    }

    fn path(&self) -> &Path {
        &self.0
    }
}

impl Drop for StagedLink {
    fn drop(&mut self) {
        #[cfg(unix)]
        let _ = std::fs::remove_file(&self.0);
    }
}
