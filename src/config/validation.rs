//! Sanitizing of the loaded source configuration.
//!
//! Problems with group names never abort a run. Offending entries are
//! removed from the configuration and reported as [`ValidationWarning`]s so
//! the remaining groups can still be installed.
use std::collections::HashSet;
use std::fmt;

use super::SourceConfig;
use crate::error::ConfigError;

/// A validation warning detected while sanitizing the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationWarning {
    /// Configuration key the warning applies to (e.g. `groups`, `profile laptop`).
    pub source: String,
    /// The group that triggered the warning.
    pub item: String,
    /// Human-readable warning message.
    pub message: String,
}

impl ValidationWarning {
    #[must_use]
    pub fn new(
        source: impl Into<String>,
        item: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            item: item.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]: {}", self.source, self.item, self.message)
    }
}

/// Validate and repair `config` in place.
///
/// The following rules are applied, each violation removing the offending
/// entry and producing a warning:
///
/// 1. groups are not duplicated
/// 2. groups exist as directories under the source path
/// 3. base groups are configured groups
/// 4. base groups are not duplicated
/// 5. profile groups are configured groups
/// 6. profile groups are not duplicated
/// 7. profile groups are not already base groups
///
/// Groups missing from the source tree are only stripped once every other
/// rule has run. A missing group that is also a base group is therefore
/// reported again by rule 7 for every profile that lists it.
///
/// # Errors
///
/// Returns [`ConfigError::MissingSourcePath`] if the source path does not
/// exist; no other rule can be checked without it.
pub fn sanitize(config: &mut SourceConfig) -> Result<Vec<ValidationWarning>, ConfigError> {
    if !config.source_path.exists() {
        return Err(ConfigError::MissingSourcePath(config.source_path.clone()));
    }

    let mut warnings = Vec::new();

    let (groups, dupes) = remove_dupes(&config.groups);
    config.groups = groups;
    for group in dupes {
        warnings.push(ValidationWarning::new("groups", group, "already specified"));
    }

    let missing: Vec<String> = config
        .groups
        .iter()
        .filter(|group| !config.source_path.join(group).is_dir())
        .cloned()
        .collect();
    for group in &missing {
        warnings.push(ValidationWarning::new(
            "groups",
            group,
            "does not exist in sources",
        ));
    }

    let bad_base = difference(&config.base_groups, &config.groups);
    for group in &bad_base {
        warnings.push(ValidationWarning::new(
            "base_groups",
            group,
            "is not a valid group",
        ));
    }
    let (base_groups, dupes) = remove_dupes(&difference(&config.base_groups, &bad_base));
    config.base_groups = base_groups;
    for group in dupes {
        warnings.push(ValidationWarning::new(
            "base_groups",
            group,
            "already specified",
        ));
    }

    for (profile, groups) in &mut config.profiles {
        let source = format!("profile {profile}");

        let bad = difference(groups, &config.groups);
        for group in &bad {
            warnings.push(ValidationWarning::new(&source, group, "is not a valid group"));
        }

        let (deduped, dupes) = remove_dupes(&difference(groups, &bad));
        for group in dupes {
            warnings.push(ValidationWarning::new(&source, group, "already specified"));
        }

        for group in intersect(&deduped, &config.base_groups) {
            warnings.push(ValidationWarning::new(
                &source,
                group,
                "is already specified in the base groups",
            ));
        }
        *groups = difference(&deduped, &config.base_groups);
    }

    config.groups = difference(&config.groups, &missing);
    config.base_groups = difference(&config.base_groups, &missing);
    for groups in config.profiles.values_mut() {
        *groups = difference(groups, &missing);
    }

    Ok(warnings)
}

/// Items of `list` that are not in `exclude`, in order.
pub(crate) fn difference(list: &[String], exclude: &[String]) -> Vec<String> {
    list.iter()
        .filter(|item| !exclude.contains(item))
        .cloned()
        .collect()
}

/// Items of `list` that are also in `other`, in order.
pub(crate) fn intersect(list: &[String], other: &[String]) -> Vec<String> {
    list.iter()
        .filter(|item| other.contains(item))
        .cloned()
        .collect()
}

/// Split `list` into its first occurrences and the repeated entries.
fn remove_dupes(list: &[String]) -> (Vec<String>, Vec<String>) {
    let mut seen = HashSet::new();
    let mut kept = Vec::new();
    let mut dupes = Vec::new();
    for item in list {
        if seen.insert(item.as_str()) {
            kept.push(item.clone());
        } else {
            dupes.push(item.clone());
        }
    }
    (kept, dupes)
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(ToString::to_string).collect()
    }

    /// Build a config rooted at a temp dir containing `dirs` as group directories.
    fn config_with_dirs(root: &Path, dirs: &[&str]) -> SourceConfig {
        for dir in dirs {
            fs::create_dir_all(root.join(dir)).unwrap();
        }
        SourceConfig {
            source_path: root.to_path_buf(),
            install_path: root.join("install"),
            lockfile_path: root.join("install/dots/dotlock.json"),
            override_suffix: "override".to_string(),
            install_suffix: "install".to_string(),
            groups: Vec::new(),
            base_groups: Vec::new(),
            profiles: super::super::Profiles::new(),
            expand_environment: Vec::new(),
        }
    }

    fn messages(warnings: &[ValidationWarning]) -> Vec<String> {
        warnings.iter().map(ToString::to_string).collect()
    }

    // -----------------------------------------------------------------------
    // list helpers
    // -----------------------------------------------------------------------

    #[test]
    fn difference_keeps_order() {
        let out = difference(&strings(&["a", "b", "c", "b"]), &strings(&["b"]));
        assert_eq!(out, strings(&["a", "c"]));
    }

    #[test]
    fn intersect_keeps_order() {
        let out = intersect(&strings(&["c", "a", "x"]), &strings(&["a", "c"]));
        assert_eq!(out, strings(&["c", "a"]));
    }

    #[test]
    fn remove_dupes_reports_each_repeat() {
        let (kept, dupes) = remove_dupes(&strings(&["a", "b", "a", "a"]));
        assert_eq!(kept, strings(&["a", "b"]));
        assert_eq!(dupes, strings(&["a", "a"]));
    }

    // -----------------------------------------------------------------------
    // sanitize
    // -----------------------------------------------------------------------

    #[test]
    fn missing_source_path_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config_with_dirs(dir.path(), &[]);
        config.source_path = dir.path().join("missing");
        let err = sanitize(&mut config).unwrap_err();
        assert!(matches!(err, ConfigError::MissingSourcePath(_)));
    }

    #[test]
    fn valid_config_has_no_warnings() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config_with_dirs(dir.path(), &["base", "machines/desktop"]);
        config.groups = strings(&["base", "machines/desktop"]);
        config.base_groups = strings(&["base"]);
        config
            .profiles
            .insert("desktop".to_string(), strings(&["machines/desktop"]));
        let before = config.clone();
        assert!(sanitize(&mut config).unwrap().is_empty());
        assert_eq!(config, before);
    }

    #[test]
    fn duplicate_and_missing_groups_are_removed() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config_with_dirs(dir.path(), &["base"]);
        config.groups = strings(&["base", "base", "gone"]);
        let warnings = sanitize(&mut config).unwrap();
        assert_eq!(
            messages(&warnings),
            vec![
                "groups [base]: already specified",
                "groups [gone]: does not exist in sources",
            ]
        );
        assert_eq!(config.groups, strings(&["base"]));
    }

    #[test]
    fn group_that_is_a_file_counts_as_missing() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config_with_dirs(dir.path(), &[]);
        fs::write(dir.path().join("base"), "").unwrap();
        config.groups = strings(&["base"]);
        let warnings = sanitize(&mut config).unwrap();
        assert_eq!(warnings.len(), 1);
        assert!(config.groups.is_empty());
    }

    #[test]
    fn bad_and_duplicate_base_groups_are_removed() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config_with_dirs(dir.path(), &["base"]);
        config.groups = strings(&["base"]);
        config.base_groups = strings(&["base", "nope", "base"]);
        let warnings = sanitize(&mut config).unwrap();
        assert_eq!(
            messages(&warnings),
            vec![
                "base_groups [nope]: is not a valid group",
                "base_groups [base]: already specified",
            ]
        );
        assert_eq!(config.base_groups, strings(&["base"]));
    }

    #[test]
    fn profile_groups_are_sanitized() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config_with_dirs(dir.path(), &["base", "desktop"]);
        config.groups = strings(&["base", "desktop"]);
        config.base_groups = strings(&["base"]);
        config.profiles.insert(
            "home".to_string(),
            strings(&["desktop", "nope", "desktop", "base"]),
        );
        let warnings = sanitize(&mut config).unwrap();
        assert_eq!(
            messages(&warnings),
            vec![
                "profile home [nope]: is not a valid group",
                "profile home [desktop]: already specified",
                "profile home [base]: is already specified in the base groups",
            ]
        );
        assert_eq!(config.profiles["home"], strings(&["desktop"]));
    }

    #[test]
    fn missing_base_group_is_also_reported_per_profile() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config_with_dirs(dir.path(), &["base"]);
        config.groups = strings(&["base", "gone"]);
        config.base_groups = strings(&["base", "gone"]);
        config
            .profiles
            .insert("p".to_string(), strings(&["gone"]));
        let warnings = sanitize(&mut config).unwrap();
        assert_eq!(warnings.len(), 2);
        assert_eq!(warnings[0].to_string(), "groups [gone]: does not exist in sources");
        assert_eq!(
            warnings[1].to_string(),
            "profile p [gone]: is already specified in the base groups"
        );
        assert_eq!(config.groups, strings(&["base"]));
        assert_eq!(config.base_groups, strings(&["base"]));
        assert!(config.profiles["p"].is_empty());
    }
}
