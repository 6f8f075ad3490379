//! Sequential execution of install scripts after dotfiles are written.
use super::{
    ExecutedScript, FORCE_REINSTALL_ENV, InstallConfig, InstallScript, PreparedInstall, SOURCE_ENV,
};
use crate::error::DotfileError;
use crate::exec;

/// Run one install script if any dotfile requiring it changed, or always
/// when reinstalling.
///
/// Returns whether the script was started. Scripts without the owner execute
/// bit, or that failed to prepare, are not run.
///
/// # Errors
///
/// Returns an error if the script cannot be started or exits unsuccessfully,
/// or if the run was cancelled first.
pub fn run_install_script(
    script: &InstallScript,
    prepared: &PreparedInstall<'_>,
    config: &InstallConfig<'_>,
) -> Result<bool, DotfileError> {
    if config.cancel.is_cancelled() {
        return Err(DotfileError::Cancelled);
    }
    if script.prepare_error.is_some() {
        return Ok(false);
    }
    if !config.force_reinstall && !script.should_install(&prepared.dotfiles) {
        return Ok(false);
    }
    if !script.executable {
        tracing::debug!("skipping {}: not executable", script.path);
        return Ok(false);
    }

    let dir = config.target_root().join(&script.relative_dir);
    let source = config.source_path.to_string_lossy();
    let force = if config.force_reinstall { "true" } else { "false" };
    let env = [(SOURCE_ENV, source.as_ref()), (FORCE_REINSTALL_ENV, force)];

    config.observer.script_executing(script);
    let status = exec::status_in_with_env(&dir, &script.file_path, &[] as &[&str], &env)
        .map_err(|e| DotfileError::io("execute", &script.file_path, e))?;
    if !status.success() {
        return Err(DotfileError::ScriptFailed {
            script: script.file_path.clone(),
            code: status.code(),
        });
    }
    Ok(true)
}

/// Run the install scripts of `prepared` one at a time, in order.
///
/// Nothing runs when scripts are disabled. A failing script does not stop
/// the ones after it.
#[must_use]
pub fn run_install_scripts<'p>(
    prepared: &'p PreparedInstall<'_>,
    config: &InstallConfig<'_>,
) -> Vec<ExecutedScript<'p>> {
    if config.skip_install_scripts {
        return Vec::new();
    }
    config.observer.script_exec_started(&prepared.install_scripts);
    let executed: Vec<ExecutedScript<'p>> = prepared
        .install_scripts
        .iter()
        .map(|script| {
            let (executed, execution_error) = match run_install_script(script, prepared, config) {
                Ok(executed) => (executed, None),
                Err(e) => (matches!(e, DotfileError::ScriptFailed { .. }), Some(e)),
            };
            let result = ExecutedScript {
                script,
                executed,
                execution_error,
            };
            config.observer.script_completed(&result);
            result
        })
        .collect();
    config.observer.script_exec_done(&executed);
    executed
}
