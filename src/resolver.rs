//! Resolution of the source tree into one [`Dotfile`] per destination path.
//!
//! Groups are applied in cascade order. Every file under `<group>/` in the
//! source tree contributes a [`SourceFile`] to the destination with the group
//! prefix stripped:
//!
//! ```text
//! base/bashrc              ─┐
//! machines/desktop/bashrc  ─┴─> bashrc  [base, machines/desktop]
//! machines/desktop/vimrc   ───> vimrc   [machines/desktop]
//! ```
//!
//! After each group, `<path>.<override suffix>` entries are folded into
//! `<path>`. Once all groups are merged, `<path>.<install suffix>` entries are
//! attached as install scripts to the dotfiles at or below `<path>`, removed
//! dotfiles are synthesized from the lockfile, and the set is sorted.
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::Path;

use walkdir::WalkDir;

use crate::config::{Lockfile, SourceConfig};

/// One source file contributing to a dotfile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Group the file belongs to.
    pub group: String,
    /// Path relative to the source root, including the group prefix.
    pub path: String,
    /// Whether the file came from an override source.
    pub is_override: bool,
}

impl SourceFile {
    fn new(group: &str, path: &str) -> Self {
        Self {
            group: group.to_string(),
            path: path.to_string(),
            is_override: false,
        }
    }
}

/// A destination path and everything needed to produce it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Dotfile {
    /// Destination relative to the install root.
    pub path: String,
    /// Previously installed but no longer provided by any active group.
    pub removed: bool,
    /// Not recorded in the lockfile's installed files.
    pub added: bool,
    /// Compile with `${NAME}` environment expansion.
    pub expand_env: bool,
    /// Contributing sources in cascade order.
    pub sources: Vec<SourceFile>,
    /// Source-relative paths of install scripts triggered by this dotfile.
    pub install_scripts: BTreeSet<String>,
}

impl Dotfile {
    fn new(path: &str) -> Self {
        Self {
            path: path.to_string(),
            ..Self::default()
        }
    }
}

/// Resolved dotfiles, sorted by destination path.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Dotfiles(Vec<Dotfile>);

impl Dotfiles {
    /// Destination paths of all dotfiles, in order.
    #[must_use]
    pub fn files(&self) -> Vec<&str> {
        self.0.iter().map(|d| d.path.as_str()).collect()
    }

    /// Keep only dotfiles whose path starts with one of `prefixes`.
    ///
    /// An empty prefix list keeps everything.
    #[must_use]
    pub fn filter<S: AsRef<str>>(self, prefixes: &[S]) -> Self {
        if prefixes.is_empty() {
            return self;
        }
        Self(
            self.0
                .into_iter()
                .filter(|d| prefixes.iter().any(|p| d.path.starts_with(p.as_ref())))
                .collect(),
        )
    }

    /// Iterate over the dotfiles.
    pub fn iter(&self) -> std::slice::Iter<'_, Dotfile> {
        self.0.iter()
    }

    /// Borrow the dotfiles as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[Dotfile] {
        &self.0
    }

    /// Number of dotfiles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no dotfiles.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'a> IntoIterator for &'a Dotfiles {
    type Item = &'a Dotfile;
    type IntoIter = std::slice::Iter<'a, Dotfile>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Inputs to [`resolve`] besides the source file listing.
#[derive(Debug, Clone, Copy)]
pub struct ResolveOptions<'a> {
    /// Active groups in cascade order.
    pub groups: &'a [String],
    /// Destinations recorded as installed by the previous run.
    pub installed_files: &'a [String],
    /// Override suffix without the leading dot.
    pub override_suffix: &'a str,
    /// Install-script suffix without the leading dot.
    pub install_suffix: &'a str,
    /// Destinations compiled with environment expansion.
    pub expand_environment: &'a [String],
}

impl<'a> ResolveOptions<'a> {
    /// Options drawn from the configuration and lockfile for `groups`.
    #[must_use]
    pub fn new(config: &'a SourceConfig, lockfile: &'a Lockfile, groups: &'a [String]) -> Self {
        Self {
            groups,
            installed_files: &lockfile.installed_files,
            override_suffix: &config.override_suffix,
            install_suffix: &config.install_suffix,
            expand_environment: &config.expand_environment,
        }
    }
}

type DotfileMap = BTreeMap<String, Dotfile>;

/// Resolve `source_files` (paths relative to the source root) into dotfiles.
#[must_use]
pub fn resolve(source_files: &[String], opts: &ResolveOptions<'_>) -> Dotfiles {
    let mut dotfiles = DotfileMap::new();
    let override_suffix = format!(".{}", opts.override_suffix);
    let install_suffix = format!(".{}", opts.install_suffix);

    for group in opts.groups {
        resolve_sources(&mut dotfiles, source_files, group);
        resolve_overrides(&mut dotfiles, &override_suffix);
    }

    resolve_install_scripts(&mut dotfiles, &install_suffix);

    let installed: HashSet<&str> = opts.installed_files.iter().map(String::as_str).collect();
    for dotfile in dotfiles.values_mut() {
        dotfile.added = !installed.contains(dotfile.path.as_str());
    }

    resolve_removed(&mut dotfiles, opts.installed_files);

    for path in opts.expand_environment {
        if let Some(dotfile) = dotfiles.get_mut(path) {
            dotfile.expand_env = true;
        }
    }

    tracing::debug!(
        groups = opts.groups.len(),
        sources = source_files.len(),
        "resolved {} dotfiles",
        dotfiles.len()
    );

    Dotfiles(dotfiles.into_values().collect())
}

/// Walk the source tree and resolve it for the lockfile's active groups.
#[must_use]
pub fn resolve_dotfiles(config: &SourceConfig, lockfile: &Lockfile) -> Dotfiles {
    let sources = source_files(&config.source_path);
    let groups = lockfile.resolve_groups(config);
    resolve(&sources, &ResolveOptions::new(config, lockfile, &groups))
}

/// List every non-directory entry under `root` as a `/`-separated path
/// relative to `root`. Unreadable entries are skipped.
#[must_use]
pub fn source_files(root: &Path) -> Vec<String> {
    WalkDir::new(root)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::debug!("skipping unreadable source entry: {e}");
                None
            }
        })
        .filter(|entry| !entry.file_type().is_dir())
        .filter_map(|entry| {
            let relative = entry.path().strip_prefix(root).ok()?;
            let parts: Option<Vec<&str>> = relative
                .components()
                .map(|c| c.as_os_str().to_str())
                .collect();
            if parts.is_none() {
                tracing::debug!("skipping non UTF-8 source path: {}", relative.display());
            }
            parts.map(|p| p.join("/"))
        })
        .collect()
}

/// Merge the files of `group` into `dotfiles`.
///
/// A source belongs to the group only when the group name is a whole
/// leading path segment: `basement/x` is not part of `base`.
fn resolve_sources(dotfiles: &mut DotfileMap, sources: &[String], group: &str) {
    let prefix = format!("{group}/");
    for source in sources {
        let Some(dest) = source.strip_prefix(&prefix) else {
            continue;
        };
        if dest.is_empty() {
            continue;
        }
        dotfiles
            .entry(dest.to_string())
            .or_insert_with(|| Dotfile::new(dest))
            .sources
            .push(SourceFile::new(group, source));
    }
}

/// Fold `<path><suffix>` entries into `<path>`.
///
/// Override sources are flagged and appended after the existing sources. An
/// override with nothing to override is renamed to `<path>`.
fn resolve_overrides(dotfiles: &mut DotfileMap, suffix: &str) {
    let overrides: Vec<String> = dotfiles
        .keys()
        .filter(|path| path.len() > suffix.len() && path.ends_with(suffix))
        .cloned()
        .collect();

    for path in overrides {
        let Some(mut overriding) = dotfiles.remove(&path) else {
            continue;
        };
        for source in &mut overriding.sources {
            source.is_override = true;
        }

        let target = &path[..path.len() - suffix.len()];
        match dotfiles.get_mut(target) {
            Some(dotfile) => dotfile.sources.append(&mut overriding.sources),
            None => {
                overriding.path = target.to_string();
                dotfiles.insert(target.to_string(), overriding);
            }
        }
    }
}

/// Attach install scripts to the dotfiles they apply to and drop the script
/// entries from the set.
///
/// `<key><suffix>` applies to the dotfile `<key>` and to every dotfile under
/// the directory `<key>/`.
fn resolve_install_scripts(dotfiles: &mut DotfileMap, suffix: &str) {
    let script_paths: Vec<String> = dotfiles
        .keys()
        .filter(|path| path.len() > suffix.len() && path.ends_with(suffix))
        .cloned()
        .collect();

    let mut scripts: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for path in script_paths {
        if let Some(script) = dotfiles.remove(&path) {
            let key = path[..path.len() - suffix.len()].to_string();
            scripts
                .entry(key)
                .or_default()
                .extend(script.sources.into_iter().map(|s| s.path));
        }
    }

    if scripts.is_empty() {
        return;
    }

    let mut used: HashSet<&str> = HashSet::new();
    for dotfile in dotfiles.values_mut() {
        for key in script_keys(&dotfile.path) {
            if let Some((key, sources)) = scripts.get_key_value(key) {
                dotfile.install_scripts.extend(sources.iter().cloned());
                used.insert(key.as_str());
            }
        }
    }

    for key in scripts.keys().filter(|k| !used.contains(k.as_str())) {
        tracing::debug!("install script {key}{suffix} applies to no dotfile");
    }
}

/// The dotfile's own path followed by each of its ancestor directories.
fn script_keys(path: &str) -> impl Iterator<Item = &str> {
    std::iter::successors(Some(path), |&p| p.rfind('/').map(|i| &p[..i]))
}

/// Insert removed entries for installed files no longer resolved.
fn resolve_removed(dotfiles: &mut DotfileMap, installed_files: &[String]) {
    for path in installed_files {
        dotfiles.entry(path.clone()).or_insert_with(|| Dotfile {
            removed: true,
            ..Dotfile::new(path)
        });
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use std::fs;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(ToString::to_string).collect()
    }

    fn run(groups: &[&str], sources: &[&str], installed: &[&str]) -> Dotfiles {
        run_with_expand(groups, sources, installed, &[])
    }

    fn run_with_expand(
        groups: &[&str],
        sources: &[&str],
        installed: &[&str],
        expand: &[&str],
    ) -> Dotfiles {
        let groups = strings(groups);
        let installed = strings(installed);
        let expand = strings(expand);
        let opts = ResolveOptions {
            groups: &groups,
            installed_files: &installed,
            override_suffix: "override",
            install_suffix: "install",
            expand_environment: &expand,
        };
        resolve(&strings(sources), &opts)
    }

    fn source(group: &str, path: &str, is_override: bool) -> SourceFile {
        SourceFile {
            group: group.to_string(),
            path: path.to_string(),
            is_override,
        }
    }

    // -----------------------------------------------------------------------
    // group merging
    // -----------------------------------------------------------------------

    #[test]
    fn no_groups_produce_nothing() {
        assert!(run(&[], &["base/one", "machine/two"], &[]).is_empty());
    }

    #[test]
    fn cascade_order_follows_group_order() {
        let dotfiles = run(&["base", "desktop"], &["base/bashrc", "desktop/bashrc"], &[]);
        assert_eq!(dotfiles.len(), 1);
        let bashrc = &dotfiles.as_slice()[0];
        assert_eq!(bashrc.path, "bashrc");
        assert_eq!(
            bashrc.sources,
            vec![
                source("base", "base/bashrc", false),
                source("desktop", "desktop/bashrc", false),
            ]
        );
    }

    #[test]
    fn group_prefix_is_segment_exact() {
        let dotfiles = run(&["base"], &["basement/x", "base/y"], &[]);
        assert_eq!(dotfiles.files(), vec!["y"]);
    }

    #[test]
    fn nested_groups_are_stripped() {
        let dotfiles = run(
            &["base", "machines/desktop"],
            &["machines/desktop/vim/vimrc", "base/vim/vimrc"],
            &[],
        );
        assert_eq!(dotfiles.files(), vec!["vim/vimrc"]);
        assert_eq!(dotfiles.as_slice()[0].sources[1].group, "machines/desktop");
    }

    #[test]
    fn inactive_groups_are_ignored() {
        let dotfiles = run(&["base"], &["base/a", "work/b"], &[]);
        assert_eq!(dotfiles.files(), vec!["a"]);
    }

    #[test]
    fn output_is_sorted_and_unique() {
        let dotfiles = run(
            &["b", "a"],
            &["b/z", "a/z", "b/m", "a/c", "b/c/d"],
            &[],
        );
        assert_eq!(dotfiles.files(), vec!["c", "c/d", "m", "z"]);
    }

    // -----------------------------------------------------------------------
    // overrides
    // -----------------------------------------------------------------------

    #[test]
    fn override_is_appended_and_flagged() {
        let dotfiles = run(&["base", "desktop"], &["base/x", "desktop/x.override"], &[]);
        assert_eq!(dotfiles.files(), vec!["x"]);
        assert_eq!(
            dotfiles.as_slice()[0].sources,
            vec![
                source("base", "base/x", false),
                source("desktop", "desktop/x.override", true),
            ]
        );
    }

    #[test]
    fn lone_override_is_renamed() {
        let dotfiles = run(&["base"], &["base/only.override"], &[]);
        assert_eq!(dotfiles.files(), vec!["only"]);
        assert_eq!(
            dotfiles.as_slice()[0].sources,
            vec![source("base", "base/only.override", true)]
        );
    }

    #[test]
    fn override_in_same_group_is_folded() {
        let dotfiles = run(&["base"], &["base/x", "base/x.override"], &[]);
        assert_eq!(dotfiles.files(), vec!["x"]);
        assert_eq!(dotfiles.as_slice()[0].sources.len(), 2);
    }

    #[test]
    fn later_group_appends_after_renamed_override() {
        let dotfiles = run(&["a", "b"], &["a/x.override", "b/x"], &[]);
        assert_eq!(
            dotfiles.as_slice()[0].sources,
            vec![source("a", "a/x.override", true), source("b", "b/x", false)]
        );
    }

    #[test]
    fn bare_suffix_is_not_an_override() {
        let dotfiles = run(&["base"], &["base/.override"], &[]);
        assert_eq!(dotfiles.files(), vec![".override"]);
    }

    // -----------------------------------------------------------------------
    // install scripts
    // -----------------------------------------------------------------------

    #[test]
    fn directory_script_applies_to_nested_dotfiles() {
        let dotfiles = run(
            &["base"],
            &["base/vim/vimrc", "base/vim/colors/dark.vim", "base/vim.install", "base/bashrc"],
            &[],
        );
        assert_eq!(dotfiles.files(), vec!["bashrc", "vim/colors/dark.vim", "vim/vimrc"]);
        let expected: BTreeSet<String> = ["base/vim.install".to_string()].into();
        assert!(dotfiles.as_slice()[0].install_scripts.is_empty());
        assert_eq!(dotfiles.as_slice()[1].install_scripts, expected);
        assert_eq!(dotfiles.as_slice()[2].install_scripts, expected);
    }

    #[test]
    fn same_named_script_applies_to_file() {
        let dotfiles = run(&["base"], &["base/bashrc", "base/bashrc.install"], &[]);
        assert_eq!(dotfiles.files(), vec!["bashrc"]);
        assert!(
            dotfiles.as_slice()[0]
                .install_scripts
                .contains("base/bashrc.install")
        );
    }

    #[test]
    fn scripts_from_several_groups_are_collected() {
        let dotfiles = run(
            &["base", "desktop"],
            &["base/vim/vimrc", "base/vim.install", "desktop/vim.install"],
            &[],
        );
        assert_eq!(dotfiles.as_slice()[0].install_scripts.len(), 2);
    }

    #[test]
    fn script_prefix_is_segment_exact() {
        let dotfiles = run(&["base"], &["base/vimfiles/x", "base/vim.install"], &[]);
        assert!(dotfiles.as_slice()[0].install_scripts.is_empty());
    }

    #[test]
    fn orphan_scripts_are_dropped() {
        let dotfiles = run(&["base"], &["base/nothing.install"], &[]);
        assert!(dotfiles.is_empty());
    }

    // -----------------------------------------------------------------------
    // removals, added, expand
    // -----------------------------------------------------------------------

    #[test]
    fn previously_installed_file_is_removed() {
        let dotfiles = run(&[], &[], &["old"]);
        assert_eq!(
            dotfiles.as_slice(),
            &[Dotfile {
                path: "old".to_string(),
                removed: true,
                ..Dotfile::default()
            }]
        );
    }

    #[test]
    fn added_reflects_installed_files() {
        let dotfiles = run(&["base"], &["base/new", "base/kept"], &["kept"]);
        let added: Vec<bool> = dotfiles.iter().map(|d| d.added).collect();
        assert_eq!(dotfiles.files(), vec!["kept", "new"]);
        assert_eq!(added, vec![false, true]);
        assert!(dotfiles.iter().all(|d| !d.removed));
    }

    #[test]
    fn renamed_override_uses_final_name_for_added() {
        let dotfiles = run(&["base"], &["base/x.override"], &["x"]);
        assert!(!dotfiles.as_slice()[0].added);
    }

    #[test]
    fn expand_environment_marks_listed_paths() {
        let dotfiles = run_with_expand(&["base"], &["base/a", "base/b"], &[], &["b", "missing"]);
        let flags: Vec<bool> = dotfiles.iter().map(|d| d.expand_env).collect();
        assert_eq!(flags, vec![false, true]);
    }

    // -----------------------------------------------------------------------
    // Dotfiles helpers
    // -----------------------------------------------------------------------

    #[test]
    fn filter_by_prefix() {
        let dotfiles = run(&["base"], &["base/bash/rc", "base/vim/rc", "base/zsh"], &[]);
        let filtered = dotfiles.clone().filter(&["bash", "zsh"]);
        assert_eq!(filtered.files(), vec!["bash/rc", "zsh"]);
        assert_eq!(dotfiles.clone().filter::<&str>(&[]), dotfiles);
    }

    #[test]
    fn source_files_lists_files_relative_to_root() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("base/vim/colors")).unwrap();
        fs::create_dir_all(dir.path().join("empty")).unwrap();
        fs::write(dir.path().join("base/bashrc"), "").unwrap();
        fs::write(dir.path().join("base/vim/colors/dark.vim"), "").unwrap();
        fs::write(dir.path().join("config.yml"), "").unwrap();
        assert_eq!(
            source_files(dir.path()),
            strings(&["base/bashrc", "base/vim/colors/dark.vim", "config.yml"])
        );
    }
}
