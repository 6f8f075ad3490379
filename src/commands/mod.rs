pub mod config;
pub mod diff;
pub mod files;
pub mod install;

use anyhow::Result;

use crate::cli::GlobalOpts;
use crate::config::{Lockfile, SourceConfig, sanitize, source_config_path};
use crate::logging::Logger;
use crate::resolver::{Dotfiles, resolve_dotfiles};

/// Shared state produced by the common command setup sequence.
///
/// Encapsulates locating, loading and sanitizing the source configuration and
/// loading the lockfile so that each command does not have to repeat the
/// boilerplate.
#[derive(Debug)]
pub struct CommandSetup {
    /// Sanitized source configuration.
    pub config: SourceConfig,
    /// Lockfile as read from disk.
    pub lockfile: Lockfile,
}

impl CommandSetup {
    /// Load the source configuration, repair it with warnings, and load the
    /// lockfile.
    ///
    /// The lockfile is not validated here so `config` subcommands can replace
    /// a broken selection.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be located, read or
    /// parsed, if its source path does not exist, or if the lockfile cannot be
    /// read.
    pub fn init(global: &GlobalOpts, log: &Logger) -> Result<Self> {
        let path = source_config_path(global.config.as_deref())?;
        log.debug(&format!("loading config from {}", path.display()));
        let mut config = SourceConfig::load(&path)?;
        if let Ok(absolute) = std::path::absolute(&config.source_path) {
            config.source_path = absolute;
        }

        let warnings = sanitize(&mut config)?;
        if !warnings.is_empty() {
            log.warn(&format!(
                "found {} configuration warning(s):",
                warnings.len()
            ));
            for warning in &warnings {
                log.warn(&format!("  {warning}"));
            }
        }
        log.debug(&format!(
            "{} groups, {} base groups, {} profiles",
            config.groups.len(),
            config.base_groups.len(),
            config.profiles.len()
        ));

        let lockfile = Lockfile::load(&config.lockfile_path)?;
        Ok(Self { config, lockfile })
    }

    /// Validate the lockfile and resolve the dotfiles of the active groups.
    ///
    /// # Errors
    ///
    /// Returns an error if the lockfile's selection is invalid.
    pub fn resolve(&self, log: &Logger) -> Result<Dotfiles> {
        self.lockfile.validate(&self.config)?;
        let dotfiles = resolve_dotfiles(&self.config, &self.lockfile);
        log.debug(&format!("resolved {} dotfiles", dotfiles.len()));
        Ok(dotfiles)
    }
}
