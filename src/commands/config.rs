use anyhow::Result;

use super::CommandSetup;
use crate::cli::{ConfigCommand, ConfigOpts, GlobalOpts};
use crate::config::{Lockfile, SourceConfig};
use crate::logging::Logger;

/// Run the config command.
///
/// # Errors
///
/// Returns an error if setup fails, if a new selection does not validate,
/// or if the lockfile cannot be written.
pub fn run(global: &GlobalOpts, opts: &ConfigOpts, log: &Logger) -> Result<()> {
    let mut setup = CommandSetup::init(global, log)?;
    match &opts.command {
        ConfigCommand::Profiles => print_lines(&setup.config.profile_names()),
        ConfigCommand::Groups => print_lines(&setup.config.groups),
        ConfigCommand::Active => print!("{}", active(&setup.config, &setup.lockfile)),
        ConfigCommand::Use { profile } => {
            use_profile(&mut setup.lockfile, profile);
            save(&setup, log)?;
        }
        ConfigCommand::Override { groups } => {
            override_groups(&mut setup.lockfile, groups);
            save(&setup, log)?;
        }
        ConfigCommand::Clear => {
            clear(&mut setup.lockfile);
            save(&setup, log)?;
        }
    }
    Ok(())
}

fn print_lines<S: AsRef<str>>(lines: &[S]) {
    for line in lines {
        println!("{}", line.as_ref());
    }
}

/// The active profile and its groups, or the explicit groups.
#[must_use]
pub fn active(config: &SourceConfig, lockfile: &Lockfile) -> String {
    let profile = if lockfile.profile.is_empty() {
        "<no profile>"
    } else {
        &lockfile.profile
    };
    format!(
        "profile: {profile}\ngroups:  [{}]\n",
        lockfile.selected_groups(config).join(", ")
    )
}

/// Select `profile`, dropping any explicit groups.
pub fn use_profile(lockfile: &mut Lockfile, profile: &str) {
    lockfile.profile = profile.to_string();
    lockfile.groups.clear();
}

/// Select explicit `groups`, dropping any profile.
pub fn override_groups(lockfile: &mut Lockfile, groups: &[String]) {
    lockfile.profile.clear();
    lockfile.groups = groups.to_vec();
}

/// Drop both the profile and the explicit groups.
pub fn clear(lockfile: &mut Lockfile) {
    lockfile.profile.clear();
    lockfile.groups.clear();
}

fn save(setup: &CommandSetup, log: &Logger) -> Result<()> {
    setup.lockfile.validate(&setup.config)?;
    setup.lockfile.write(&setup.config.lockfile_path)?;
    log.info(&active(&setup.config, &setup.lockfile).trim_end().replace('\n', ", "));
    Ok(())
}
