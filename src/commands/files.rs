use anyhow::Result;

use super::CommandSetup;
use crate::cli::{FilesOpts, GlobalOpts};
use crate::logging::Logger;
use crate::resolver::Dotfiles;

/// Run the files command: print every resolved destination path.
///
/// # Errors
///
/// Returns an error if setup fails or the lockfile's selection is invalid.
pub fn run(global: &GlobalOpts, opts: &FilesOpts, log: &Logger) -> Result<()> {
    let setup = CommandSetup::init(global, log)?;
    let dotfiles = setup.resolve(log)?.filter(&opts.filter);
    let listing = listing(&dotfiles);
    if !listing.is_empty() {
        println!("{listing}");
    }
    Ok(())
}

/// Destination paths, one per line.
#[must_use]
pub fn listing(dotfiles: &Dotfiles) -> String {
    dotfiles.files().join("\n")
}
