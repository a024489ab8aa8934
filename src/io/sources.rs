//! Source discovery and reading

use crate::error::{BuildError, MacroError};
use std::fs;
use std::path::{Path, PathBuf};

/// Extensions expanded when none are configured.
pub const DEFAULT_EXTENSIONS: &[&str] = &["sv", "v"];

/// A source file read into memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    path: PathBuf,
    content: String,
}

impl SourceFile {
    pub fn new(path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }

    pub fn read(path: impl AsRef<Path>) -> Result<Self, MacroError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| MacroError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::new(path, content))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn content(&self) -> &str {
        &self.content
    }
}

/// Whether `path` carries one of `extensions` (compared without the dot).
pub fn is_recognized<S: AsRef<str>>(path: &Path, extensions: &[S]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| extensions.iter().any(|e| e.as_ref() == ext))
}

/// Regular files directly inside `dir` with a recognized extension, sorted by
/// path.
pub fn list_sources<S: AsRef<str>>(
    dir: &Path,
    extensions: &[S],
) -> Result<Vec<PathBuf>, BuildError> {
    if !dir.is_dir() {
        return Err(BuildError::MissingDirectory(dir.to_path_buf()));
    }
    let read_error = |source| BuildError::ReadDirectory {
        path: dir.to_path_buf(),
        source,
    };

    let mut sources = Vec::new();
    for entry in fs::read_dir(dir).map_err(read_error)? {
        let path = entry.map_err(read_error)?.path();
        if path.is_file() && is_recognized(&path, extensions) {
            sources.push(path);
        }
    }
    sources.sort();

    Ok(sources)
}
