//! Log file location, ANSI stripping and timestamps.
use std::fs;
use std::path::PathBuf;

/// Remove ANSI escape sequences.
///
/// A CSI sequence (`ESC [`) runs up to its final byte in `@`..=`~`; any other
/// escape swallows the single character after `ESC`.
pub(super) fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(start) = rest.find('\x1b') {
        out.push_str(rest.get(..start).unwrap_or_default());
        let mut tail = rest.get(start + 1..).unwrap_or_default().chars();
        if tail.next() == Some('[') {
            tail.by_ref().find(|c| ('@'..='~').contains(c));
        }
        rest = tail.as_str();
    }
    out.push_str(rest);
    out
}

/// Log file for `command`: `$XDG_CACHE_HOME/dots/<command>.log`, falling
/// back to `~/.cache`. The directory is created on demand.
pub(super) fn log_file_path(command: &str) -> Option<PathBuf> {
    let cache = std::env::var_os("XDG_CACHE_HOME")
        .filter(|dir| !dir.is_empty())
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".cache")))?;
    let dir = cache.join("dots");
    fs::create_dir_all(&dir).ok()?;
    Some(dir.join(format!("{command}.log")))
}

/// Current UTC time as `YYYY-MM-DD HH:MM:SS`.
pub(super) fn format_utc_datetime() -> String {
    chrono::Utc::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Current UTC time as `HH:MM:SS`.
pub(super) fn format_utc_time() -> String {
    chrono::Utc::now().format("%H:%M:%S").to_string()
}
