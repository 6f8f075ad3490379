// Shared helpers for integration tests.
//
// Provides a temporary-directory-backed source tree and install root plus a
// fluent builder so each integration test can set up an isolated environment
// without repeating filesystem boilerplate.
//
// Used by all integration test binaries that declare `mod common;`.
#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use dots::cli::{GlobalOpts, InstallOpts};
use dots::commands::{self, CommandSetup};
use dots::config::{Lockfile, SourceConfig};
use dots::installer::{CancelToken, PreparedDotfile, prepare_dotfiles};
use dots::logging::Logger;
use dots::resolver::Dotfiles;

/// Groups present in every test source tree.
pub const GROUPS: &[&str] = &["base", "machines/desktop", "machines/laptop"];

fn config_yaml(install: &Path, extra: &str) -> String {
    format!(
        "install_path: {}\n\
         groups: [base, machines/desktop, machines/laptop]\n\
         base_groups: [base]\n\
         profiles:\n  desktop: [machines/desktop]\n  laptop: [machines/laptop]\n\
         {extra}",
        install.display()
    )
}

/// An isolated source tree and install root backed by a [`tempfile::TempDir`].
///
/// The source tree lives in `src/` with the configuration at
/// `src/config.yml`; dotfiles install into `home/`.
pub struct IntegrationTestContext {
    /// Temporary directory holding both trees.
    pub root: tempfile::TempDir,
    /// Logger whose summary points into the temporary directory.
    pub log: Logger,
}

impl IntegrationTestContext {
    /// Create a context with empty group directories and a default config.
    pub fn new() -> Self {
        let root = tempfile::tempdir().expect("create temp dir");
        for group in GROUPS {
            fs::create_dir_all(root.path().join("src").join(group)).expect("create group dir");
        }
        fs::create_dir_all(root.path().join("home")).expect("create install dir");
        let log = Logger::with_log_file(&root.path().join("test.log"));
        let ctx = Self { root, log };
        ctx.write_config("");
        ctx
    }

    /// Root of the source tree.
    pub fn source_path(&self) -> PathBuf {
        self.root.path().join("src")
    }

    /// Root dotfiles install into.
    pub fn install_path(&self) -> PathBuf {
        self.root.path().join("home")
    }

    /// Path of the source configuration.
    pub fn config_path(&self) -> PathBuf {
        self.source_path().join("config.yml")
    }

    /// Options pointing the commands at this context's configuration.
    pub fn global(&self) -> GlobalOpts {
        GlobalOpts {
            config: Some(self.config_path()),
        }
    }

    /// Rewrite the configuration with `extra` YAML appended.
    pub fn write_config(&self, extra: &str) {
        fs::write(self.config_path(), config_yaml(&self.install_path(), extra))
            .expect("write config");
    }

    /// Write a source file relative to the source root.
    pub fn write_source(&self, rel: &str, contents: &str) {
        let path = self.source_path().join(rel);
        fs::create_dir_all(path.parent().expect("source parent")).expect("create source dir");
        fs::write(path, contents).expect("write source");
    }

    /// Delete a source file.
    pub fn remove_source(&self, rel: &str) {
        fs::remove_file(self.source_path().join(rel)).expect("remove source");
    }

    /// Write an executable install script relative to the source root.
    #[cfg(unix)]
    pub fn write_script(&self, rel: &str, body: &str) {
        use std::os::unix::fs::PermissionsExt as _;
        self.write_source(rel, body);
        fs::set_permissions(self.source_path().join(rel), fs::Permissions::from_mode(0o755))
            .expect("chmod script");
    }

    /// Path of an installed dotfile.
    pub fn installed(&self, rel: &str) -> PathBuf {
        self.install_path().join(rel)
    }

    /// Contents of an installed dotfile.
    pub fn read_installed(&self, rel: &str) -> String {
        fs::read_to_string(self.installed(rel)).expect("read installed dotfile")
    }

    /// Load and sanitize the configuration and lockfile.
    pub fn setup(&self) -> CommandSetup {
        CommandSetup::init(&self.global(), &self.log).expect("command setup")
    }

    /// The current lockfile contents.
    pub fn lockfile(&self) -> Lockfile {
        let setup = self.setup();
        Lockfile::load(&setup.config.lockfile_path).expect("load lockfile")
    }

    /// Resolve the dotfiles of the current selection.
    pub fn resolve(&self) -> (SourceConfig, Dotfiles) {
        let setup = self.setup();
        let dotfiles = setup.resolve(&self.log).expect("resolve");
        (setup.config, dotfiles)
    }

    /// Whether every dotfile of the current selection is unchanged.
    pub fn all_unchanged(&self) -> bool {
        let (config, dotfiles) = self.resolve();
        let prepared = prepare_dotfiles(
            dotfiles.as_slice(),
            &config.source_path,
            &config.install_path,
        );
        prepared
            .dotfiles
            .iter()
            .all(|p: &PreparedDotfile<'_>| p.prepare_error.is_none() && !p.is_changed())
    }

    /// Run the install command with `opts`.
    pub fn install_with(&self, opts: &InstallOpts) -> anyhow::Result<()> {
        commands::install::run(&self.global(), opts, false, &self.log, &CancelToken::new())
    }

    /// Run a plain install.
    pub fn install(&self) -> anyhow::Result<()> {
        self.install_with(&InstallOpts::default())
    }
}

/// Fluent builder for [`IntegrationTestContext`].
///
/// Allows individual tests to populate the source tree before the context
/// is finalised without modifying the shared setup.
pub struct TestContextBuilder {
    ctx: IntegrationTestContext,
}

impl TestContextBuilder {
    /// Begin building a new context with empty groups.
    pub fn new() -> Self {
        Self {
            ctx: IntegrationTestContext::new(),
        }
    }

    /// Add a source file relative to the source root.
    pub fn with_source(self, rel: &str, contents: &str) -> Self {
        self.ctx.write_source(rel, contents);
        self
    }

    /// Append extra YAML to the configuration.
    pub fn with_config(self, extra: &str) -> Self {
        self.ctx.write_config(extra);
        self
    }

    /// Select a profile in the lockfile.
    pub fn with_profile(self, profile: &str) -> Self {
        let setup = self.ctx.setup();
        let lockfile = Lockfile {
            profile: profile.to_string(),
            ..setup.lockfile
        };
        lockfile
            .write(&setup.config.lockfile_path)
            .expect("write lockfile");
        self
    }

    /// Finish building and return the configured context.
    pub fn build(self) -> IntegrationTestContext {
        self.ctx
    }
}

impl From<IntegrationTestContext> for TestContextBuilder {
    /// Continue building on top of an existing context.
    fn from(ctx: IntegrationTestContext) -> Self {
        Self { ctx }
    }
}
