//! Byte-level transformations used when compiling and comparing dotfiles.
use std::io::{self, Read};

/// Chunk size used by [`compare_readers`].
const CHUNK_SIZE: usize = 4096;

/// Trim spaces, tabs and newlines from both ends of `data`.
#[must_use]
pub fn trim_whitespace(data: &[u8]) -> &[u8] {
    let is_blank = |b: &u8| matches!(b, b'\n' | b'\t' | b' ');
    let start = data.iter().position(|b| !is_blank(b)).unwrap_or(data.len());
    let end = data.iter().rposition(|b| !is_blank(b)).map_or(start, |i| i + 1);
    data.get(start..end).unwrap_or_default()
}

/// Strip a single leading `#!...\n` line from `data`.
///
/// A shebang without a terminating newline is left in place.
#[must_use]
pub fn trim_shebang(data: &[u8]) -> &[u8] {
    if !data.starts_with(b"#!") {
        return data;
    }
    data.iter()
        .position(|&b| b == b'\n')
        .and_then(|i| data.get(i + 1..))
        .unwrap_or(data)
}

/// Replace `$NAME` and `${NAME}` with values from the process environment.
/// Undefined variables expand to the empty string.
#[must_use]
pub fn expand_environment(text: &str) -> String {
    expand_environment_with(text, |name| std::env::var(name).ok())
}

/// Like [`expand_environment`] but resolving names through `lookup`.
pub fn expand_environment_with<F>(text: &str, mut lookup: F) -> String
where
    F: FnMut(&str) -> Option<String>,
{
    shellexpand::env_with_context_no_errors(text, |name| Some(lookup(name).unwrap_or_default()))
        .into_owned()
}

/// Reduce a set of permission values to the lowest one.
///
/// The flag is `true` when not every value was equal. An empty set flattens
/// to `(0, false)`.
#[must_use]
pub fn flatten_modes(modes: &[u32]) -> (u32, bool) {
    let Some((&first, rest)) = modes.split_first() else {
        return (0, false);
    };
    rest.iter().fold((first, false), |(lowest, differ), &mode| {
        (lowest.min(mode), differ || mode != first)
    })
}

/// Compare two readers chunk by chunk, returning `true` when both yield the
/// same bytes and end at the same length.
///
/// # Errors
///
/// Returns the first read error from either reader.
pub fn compare_readers<A: Read, B: Read>(mut a: A, mut b: B) -> io::Result<bool> {
    let mut buf_a = [0u8; CHUNK_SIZE];
    let mut buf_b = [0u8; CHUNK_SIZE];
    loop {
        let n_a = read_chunk(&mut a, &mut buf_a)?;
        let n_b = read_chunk(&mut b, &mut buf_b)?;
        if n_a != n_b || buf_a.get(..n_a) != buf_b.get(..n_b) {
            return Ok(false);
        }
        if n_a < CHUNK_SIZE {
            return Ok(true);
        }
    }
}

/// Fill `buf` from `reader`, stopping early only at end of stream.
fn read_chunk<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while let Some(rest) = buf.get_mut(filled..) {
        if rest.is_empty() {
            break;
        }
        match reader.read(rest) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
