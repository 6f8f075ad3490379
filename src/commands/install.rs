use anyhow::Result;

use super::CommandSetup;
use crate::cli::{GlobalOpts, InstallOpts};
use crate::installer::{
    CancelToken, InstallConfig, finalize_install, install_dotfiles, prepare_dotfiles,
    run_install_scripts,
};
use crate::logging::Logger;
use crate::output::InstallReport;

/// Run the install command.
///
/// # Errors
///
/// Returns an error if setup fails, if any dotfile or install script failed,
/// or if the lockfile could not be written.
pub fn run(
    global: &GlobalOpts,
    opts: &InstallOpts,
    verbose: bool,
    log: &Logger,
    cancel: &CancelToken,
) -> Result<()> {
    log.debug(&format!("dots {}", env!("DOTS_VERSION")));

    let mut setup = CommandSetup::init(global, log)?;

    log.stage("Resolving dotfiles");
    let dotfiles = setup.resolve(log)?.filter(&opts.filter);
    log.info(&format!("{} dotfiles selected", dotfiles.len()));

    log.stage("Preparing dotfiles");
    let prepared = prepare_dotfiles(
        dotfiles.as_slice(),
        &setup.config.source_path,
        &setup.config.install_path,
    );

    let report = InstallReport::new(log, verbose || opts.dry_run, opts.reinstall);
    report.install_info(&setup.config);

    if opts.dry_run {
        report.dry_run(&prepared);
        log.print_summary();
        return Ok(());
    }

    let mut install = InstallConfig::new(&setup.config);
    install.force_reinstall = opts.reinstall;
    install.skip_install_scripts = opts.skip_scripts;
    install.cancel = cancel.clone();
    install.observer = &report;

    log.stage("Installing dotfiles");
    let installed = install_dotfiles(&prepared, &install);
    let executed = run_install_scripts(&prepared, &install);
    let finalized = finalize_install(
        &installed,
        &mut setup.lockfile,
        &setup.config.lockfile_path,
        &install,
    );

    log.print_summary();

    if installed.iter().any(|i| i.error().is_some()) {
        anyhow::bail!("some dotfiles failed to install");
    }
    if executed.iter().any(|s| s.error().is_some()) {
        anyhow::bail!("some install scripts failed");
    }
    match finalized {
        Ok(true) => Ok(()),
        Ok(false) => anyhow::bail!("install cancelled"),
        Err(e) => anyhow::bail!("finalization error: {e}"),
    }
}
