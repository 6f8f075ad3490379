use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Top-level CLI entry point for the dots installer.
#[derive(Parser, Debug)]
#[command(
    name = "dots",
    about = "Compose and install dotfiles from cascading source groups",
    version = env!("DOTS_VERSION")
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(flatten)]
    pub global: GlobalOpts,
}

/// Options shared across all subcommands.
#[derive(Parser, Debug, Clone, Default)]
pub struct GlobalOpts {
    /// Source configuration file (defaults to $DOTS_CONFIG, then ~/.local/etc/config.yml)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Install and compile dotfiles from sources
    Install(InstallOpts),
    /// List resolved dotfile paths
    Files(FilesOpts),
    /// Compare the installed dotfiles to their sources
    Diff(DiffOpts),
    /// Manage the active profile and groups
    Config(ConfigOpts),
}

impl Command {
    /// Name used for the log file of this command.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Install(_) => "install",
            Self::Files(_) => "files",
            Self::Diff(_) => "diff",
            Self::Config(_) => "config",
        }
    }
}

/// Options for the `install` subcommand.
#[derive(Parser, Debug, Clone, Default)]
pub struct InstallOpts {
    /// Only install dotfiles under these destination prefixes
    pub filter: Vec<String>,

    /// Reinstall every dotfile and run every install script
    #[arg(short, long)]
    pub reinstall: bool,

    /// Report what would change without touching anything (implies --verbose)
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Do not run install scripts
    #[arg(long)]
    pub skip_scripts: bool,
}

/// Options for the `files` subcommand.
#[derive(Parser, Debug, Clone, Default)]
pub struct FilesOpts {
    /// Only list dotfiles under these destination prefixes
    pub filter: Vec<String>,
}

/// Options for the `diff` subcommand.
#[derive(Parser, Debug, Clone, Default)]
pub struct DiffOpts {
    /// git-diff options (starting with '-') and destination prefixes
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, value_name = "ARGS")]
    pub args: Vec<String>,
}

/// Options for the `config` subcommand.
#[derive(Parser, Debug, Clone)]
pub struct ConfigOpts {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

/// Lockfile selection management.
#[derive(Subcommand, Debug, Clone)]
pub enum ConfigCommand {
    /// List configured profiles
    Profiles,
    /// List configured groups
    Groups,
    /// Show the active profile and groups
    Active,
    /// Select a profile for this host
    Use {
        /// Profile name
        profile: String,
    },
    /// Select groups for this host instead of a profile
    Override {
        /// Group names
        #[arg(required = true)]
        groups: Vec<String>,
    },
    /// Clear the profile and group selection
    Clear,
}
