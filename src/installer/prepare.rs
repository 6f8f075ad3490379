//! Comparison of resolved dotfiles against the install root.
use std::collections::HashMap;
use std::fs::{self, File, Metadata};
use std::io;
use std::path::Path;

use rayon::prelude::*;

use super::compiler::{open_dotfile, should_compile};
use super::fs::{is_executable, permission_bits};
use super::transforms::{compare_readers, flatten_modes};
use super::{FileMode, InstallScript, PreparedDotfile, PreparedInstall};
use crate::error::DotfileError;
use crate::resolver::Dotfile;

/// Prepare every dotfile in parallel and collect their install scripts.
///
/// The result is index-aligned with `dotfiles`. Failures are stored on the
/// dotfile or script they concern.
#[must_use]
pub fn prepare_dotfiles<'a>(
    dotfiles: &'a [Dotfile],
    source_root: &Path,
    install_root: &Path,
) -> PreparedInstall<'a> {
    let prepared: Vec<PreparedDotfile<'a>> = dotfiles
        .par_iter()
        .map(|dotfile| prepare_dotfile(dotfile, source_root, install_root))
        .collect();
    let install_scripts = prepare_install_scripts(&prepared, source_root);
    PreparedInstall {
        dotfiles: prepared,
        install_scripts,
    }
}

/// Compare one dotfile with its installed counterpart.
#[must_use]
pub fn prepare_dotfile<'a>(
    dotfile: &'a Dotfile,
    source_root: &Path,
    install_root: &Path,
) -> PreparedDotfile<'a> {
    let mut prepared = PreparedDotfile::new(dotfile);
    if let Err(e) = inspect(&mut prepared, source_root, install_root) {
        prepared.prepare_error = Some(e);
    }
    prepared
}

fn inspect(
    prepared: &mut PreparedDotfile<'_>,
    source_root: &Path,
    install_root: &Path,
) -> Result<(), DotfileError> {
    let dotfile = prepared.dotfile;
    let install_path = install_root.join(&dotfile.path);

    let target = match fs::symlink_metadata(&install_path) {
        Ok(meta) => Some(meta),
        Err(e) if e.kind() == io::ErrorKind::NotFound => None,
        Err(e) => return Err(DotfileError::io("stat", &install_path, e)),
    };
    let exists = target.is_some();
    prepared.is_new = !exists;
    prepared.overwrites_existing = dotfile.added && exists;
    prepared.removed_null = dotfile.removed && !exists;

    let sources = dotfile
        .sources
        .iter()
        .map(|source| {
            let path = source_root.join(&source.path);
            fs::symlink_metadata(&path).map_err(|e| DotfileError::io("stat", &path, e))
        })
        .collect::<Result<Vec<Metadata>, _>>()?;

    let modes: Vec<u32> = sources.iter().map(permission_bits).collect();
    let (mode, differ) = flatten_modes(&modes);
    prepared.permissions = FileMode {
        old: target.as_ref().map_or(0, permission_bits),
        new: mode,
    };
    prepared.source_permissions_differ = differ;

    prepared.sources_are_irregular = !sources.iter().all(|meta| meta.file_type().is_file());
    if prepared.sources_are_irregular {
        return Err(DotfileError::IrregularSources);
    }

    let Some(target) = target else {
        return Ok(());
    };
    if dotfile.removed {
        return Ok(());
    }

    if !should_compile(dotfile)
        && let Some(source) = sources.first()
        && source.len() != target.len()
    {
        prepared.contents_differ = true;
        return Ok(());
    }

    let compiled = open_dotfile(dotfile, source_root)?;
    let installed =
        File::open(&install_path).map_err(|e| DotfileError::io("open", &install_path, e))?;
    let same = compare_readers(compiled, installed)
        .map_err(|e| DotfileError::io("compare", &install_path, e))?;
    prepared.contents_differ = !same;
    Ok(())
}

/// Deduplicate the install scripts of `dotfiles`, in order of first use.
fn prepare_install_scripts(
    dotfiles: &[PreparedDotfile<'_>],
    source_root: &Path,
) -> Vec<InstallScript> {
    let mut order: Vec<(&str, Vec<usize>)> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();
    for (i, prepared) in dotfiles.iter().enumerate() {
        for script in &prepared.dotfile.install_scripts {
            let slot = *index.entry(script.as_str()).or_insert_with(|| {
                order.push((script.as_str(), Vec::new()));
                order.len() - 1
            });
            if let Some((_, required_by)) = order.get_mut(slot) {
                required_by.push(i);
            }
        }
    }

    order
        .into_iter()
        .map(|(path, required_by)| {
            let relative_dir = common_dir(
                required_by
                    .iter()
                    .filter_map(|&i| dotfiles.get(i))
                    .map(|p| p.dotfile.path.as_str()),
            );
            let joined = source_root.join(path);
            let file_path = std::path::absolute(&joined).unwrap_or_else(|_| joined.clone());
            let (executable, prepare_error) = match fs::metadata(&file_path) {
                Ok(meta) => (is_executable(&meta), None),
                Err(e) => (false, Some(DotfileError::io("stat", &file_path, e))),
            };
            InstallScript {
                path: path.to_string(),
                file_path,
                relative_dir,
                required_by,
                executable,
                prepare_error,
            }
        })
        .collect()
}

/// Longest directory shared by the parents of every path.
fn common_dir<'p>(paths: impl IntoIterator<Item = &'p str>) -> String {
    let mut common: Option<Vec<&str>> = None;
    for path in paths {
        let dir: Vec<&str> = path
            .rsplit_once('/')
            .map_or_else(Vec::new, |(dir, _)| dir.split('/').collect());
        common = Some(match common {
            None => dir,
            Some(prev) => prev
                .into_iter()
                .zip(dir)
                .take_while(|(a, b)| a == b)
                .map(|(a, _)| a)
                .collect(),
        });
    }
    common.unwrap_or_default().join("/")
}
