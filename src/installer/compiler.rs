//! Composition of a dotfile's sources into its installed contents.
//!
//! A dotfile with a single source and no environment expansion is streamed
//! verbatim. Anything else is compiled:
//!
//! 1. every source is trimmed of surrounding spaces, tabs and newlines
//! 2. sources after the first also lose a leading shebang line
//! 3. sources are joined with one blank line between them
//! 4. `${NAME}` references are expanded when the dotfile asks for it
//! 5. a single trailing newline is appended
use std::fs::File;
use std::io::{self, Cursor, Read};
use std::path::Path;

use super::transforms::{expand_environment, trim_shebang, trim_whitespace};
use crate::error::DotfileError;
use crate::resolver::Dotfile;

/// Whether `dotfile` must be compiled rather than copied from its only source.
#[must_use]
pub fn should_compile(dotfile: &Dotfile) -> bool {
    dotfile.sources.len() > 1 || dotfile.expand_env
}

/// Compile already-read source contents.
///
/// # Errors
///
/// Returns [`DotfileError::NonUtf8Expansion`] if expansion is requested for
/// content that is not valid UTF-8.
pub fn compile_sources<S: AsRef<[u8]>>(
    sources: &[S],
    expand_env: bool,
) -> Result<Vec<u8>, DotfileError> {
    let mut compiled = Vec::new();
    for (i, data) in sources.iter().enumerate() {
        let mut data = trim_whitespace(data.as_ref());
        if i != 0 {
            data = trim_whitespace(trim_shebang(data));
            compiled.extend_from_slice(b"\n\n");
        }
        compiled.extend_from_slice(data);
    }

    if expand_env {
        let text = String::from_utf8(compiled).map_err(|_| DotfileError::NonUtf8Expansion)?;
        compiled = expand_environment(&text).into_bytes();
    }

    compiled.push(b'\n');
    Ok(compiled)
}

/// Open the sources of `dotfile` (relative to `source_root`) for reading its
/// installed contents.
///
/// Opening is eager so missing sources are reported up front; compilation
/// is deferred to the first read.
///
/// # Errors
///
/// Returns an error if any source cannot be opened.
pub fn open_dotfile(dotfile: &Dotfile, source_root: &Path) -> Result<DotfileReader, DotfileError> {
    let mut files = dotfile
        .sources
        .iter()
        .map(|source| {
            let path = source_root.join(&source.path);
            File::open(&path).map_err(|e| DotfileError::io("open", &path, e))
        })
        .collect::<Result<Vec<_>, _>>()?;

    if !should_compile(dotfile)
        && let Some(file) = files.pop()
    {
        return Ok(DotfileReader::Passthrough(file));
    }

    Ok(DotfileReader::Compiled(Compilation {
        files,
        expand_env: dotfile.expand_env,
        content: None,
    }))
}

/// Reader over a dotfile's installed contents.
#[derive(Debug)]
pub enum DotfileReader {
    /// The single source, byte for byte.
    Passthrough(File),
    /// Sources compiled on first read.
    Compiled(Compilation),
}

impl Read for DotfileReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Self::Passthrough(file) => file.read(buf),
            Self::Compiled(compilation) => compilation.content()?.read(buf),
        }
    }
}

/// Lazily compiled contents of a multi-source or expanded dotfile.
#[derive(Debug)]
pub struct Compilation {
    files: Vec<File>,
    expand_env: bool,
    content: Option<Cursor<Vec<u8>>>,
}

impl Compilation {
    fn content(&mut self) -> io::Result<&mut Cursor<Vec<u8>>> {
        let cursor = match self.content.take() {
            Some(cursor) => cursor,
            None => Cursor::new(self.compile()?),
        };
        Ok(self.content.insert(cursor))
    }

    fn compile(&mut self) -> io::Result<Vec<u8>> {
        let sources = self
            .files
            .iter_mut()
            .map(|file| {
                let mut data = Vec::new();
                file.read_to_end(&mut data).map(|_| data)
            })
            .collect::<io::Result<Vec<_>>>()?;
        compile_sources(&sources, self.expand_env)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::resolver::SourceFile;
    use std::fs;

    fn dotfile(sources: &[&str], expand_env: bool) -> Dotfile {
        Dotfile {
            path: "out".to_string(),
            expand_env,
            sources: sources
                .iter()
                .map(|p| SourceFile {
                    group: "base".to_string(),
                    path: (*p).to_string(),
                    is_override: false,
                })
                .collect(),
            ..Dotfile::default()
        }
    }

    fn read_all(mut reader: DotfileReader) -> Vec<u8> {
        let mut out = Vec::new();
        reader.read_to_end(&mut out).unwrap();
        out
    }

    // -----------------------------------------------------------------------
    // compile_sources
    // -----------------------------------------------------------------------

    #[test]
    fn compile_trims_and_strips_later_shebangs() {
        let out = compile_sources(&["  a\n", "#!/bin/sh\nb  "], false).unwrap();
        assert_eq!(out, b"a\n\nb\n");
    }

    #[test]
    fn compile_keeps_first_shebang() {
        let out = compile_sources(&["#!/bin/sh\necho a\n", "#!/bin/sh\n\necho b\n"], false)
            .unwrap();
        assert_eq!(out, b"#!/bin/sh\necho a\n\necho b\n");
    }

    #[test]
    fn compile_single_source_appends_newline() {
        assert_eq!(compile_sources(&["x"], false).unwrap(), b"x\n");
        assert_eq!(compile_sources(&["\n\n"], false).unwrap(), b"\n");
    }

    #[test]
    fn compile_expands_after_joining() {
        let out = compile_sources(&["a=${DOTS_SURELY_UNSET_VAR}", "b"], true).unwrap();
        assert_eq!(out, b"a=\n\nb\n");
    }

    #[test]
    fn compile_rejects_non_utf8_expansion() {
        let err = compile_sources(&[&[0xffu8, 0xfe][..]], true).unwrap_err();
        assert!(matches!(err, DotfileError::NonUtf8Expansion));
        assert!(compile_sources(&[&[0xffu8, 0xfe][..]], false).is_ok());
    }

    // -----------------------------------------------------------------------
    // open_dotfile
    // -----------------------------------------------------------------------

    #[test]
    fn single_source_is_passed_through_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("base")).unwrap();
        fs::write(dir.path().join("base/x"), "  raw\n\n").unwrap();
        let reader = open_dotfile(&dotfile(&["base/x"], false), dir.path()).unwrap();
        assert!(matches!(reader, DotfileReader::Passthrough(_)));
        assert_eq!(read_all(reader), b"  raw\n\n");
    }

    #[test]
    fn multiple_sources_are_compiled() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("base")).unwrap();
        fs::create_dir_all(dir.path().join("desktop")).unwrap();
        fs::write(dir.path().join("base/x"), "  a\n").unwrap();
        fs::write(dir.path().join("desktop/x"), "#!/bin/sh\nb  ").unwrap();
        let reader = open_dotfile(&dotfile(&["base/x", "desktop/x"], false), dir.path()).unwrap();
        assert_eq!(read_all(reader), b"a\n\nb\n");
    }

    #[test]
    fn compiled_reader_can_be_read_in_small_pieces() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("x"), "hello").unwrap();
        let mut reader = open_dotfile(&dotfile(&["x"], true), dir.path()).unwrap();
        let mut buf = [0u8; 2];
        let mut out = Vec::new();
        loop {
            let n = reader.read(&mut buf).unwrap();
            if n == 0 {
                break;
            }
            out.extend_from_slice(&buf[..n]);
        }
        assert_eq!(out, b"hello\n");
    }

    #[test]
    fn missing_source_fails_to_open() {
        let dir = tempfile::tempdir().unwrap();
        let err = open_dotfile(&dotfile(&["nope"], false), dir.path()).unwrap_err();
        assert!(matches!(err, DotfileError::Io { action: "open", .. }));
    }
}
