//! Output sinks
//!
//! A [`FileSink`] writes into a temporary file next to its destination and
//! renames it into place on [`FileSink::close`]. Until then the destination is
//! untouched, so a file whose expansion fails leaves no partial output behind.

use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;

/// Prefix of in-flight temporary files.
pub const TEMP_PREFIX: &str = ".svmacro-";

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("cannot open output for {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot write output for {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot finalize {}: {source}", path.display())]
    Close {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("output {} is already closed", path.display())]
    Closed { path: PathBuf },
}

/// Destination of expanded text.
pub trait Sink {
    fn write(&mut self, text: &str) -> Result<(), SinkError>;
}

impl Sink for String {
    fn write(&mut self, text: &str) -> Result<(), SinkError> {
        self.push_str(text);
        Ok(())
    }
}

enum SinkState {
    Open(BufWriter<NamedTempFile>),
    Closed,
}

/// Atomic file output.
pub struct FileSink {
    path: PathBuf,
    state: SinkState,
}

impl FileSink {
    /// Create the temporary file in the destination's directory.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, SinkError> {
        let path = path.into();
        let dir = path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        let file = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .suffix(".tmp")
            .tempfile_in(dir)
            .map_err(|source| SinkError::Open {
                path: path.clone(),
                source,
            })?;

        Ok(Self {
            path,
            state: SinkState::Open(BufWriter::new(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.state, SinkState::Closed)
    }

    pub fn write(&mut self, text: &str) -> Result<(), SinkError> {
        match &mut self.state {
            SinkState::Open(writer) => {
                writer
                    .write_all(text.as_bytes())
                    .map_err(|source| SinkError::Write {
                        path: self.path.clone(),
                        source,
                    })
            }
            SinkState::Closed => Err(SinkError::Closed {
                path: self.path.clone(),
            }),
        }
    }

    /// Flush and move the output onto its destination. Closing twice is a
    /// no-op.
    pub fn close(&mut self) -> Result<(), SinkError> {
        let SinkState::Open(writer) = std::mem::replace(&mut self.state, SinkState::Closed) else {
            return Ok(());
        };
        let close_error = |source| SinkError::Close {
            path: self.path.clone(),
            source,
        };

        let file = writer
            .into_inner()
            .map_err(|err| close_error(err.into_error()))?;
        set_output_permissions(file.as_file()).map_err(close_error)?;
        file.persist(&self.path)
            .map_err(|err| close_error(err.error))?;

        tracing::trace!(path = %self.path.display(), "persisted output");
        Ok(())
    }

    /// Drop the output. The temporary file is removed and the destination is
    /// left as it was.
    pub fn discard(&mut self) {
        if let SinkState::Open(_) = std::mem::replace(&mut self.state, SinkState::Closed) {
            tracing::trace!(path = %self.path.display(), "discarded output");
        }
    }
}

impl Sink for FileSink {
    fn write(&mut self, text: &str) -> Result<(), SinkError> {
        FileSink::write(self, text)
    }
}

/// Temporary files are created owner-only; outputs get regular permissions.
#[cfg(unix)]
fn set_output_permissions(file: &fs::File) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    file.set_permissions(fs::Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn set_output_permissions(_file: &fs::File) -> io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn entries(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_close_persists_output() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.sv");

        let mut sink = FileSink::open(&path).unwrap();
        sink.write("module top;\n").unwrap();
        sink.write("endmodule\n").unwrap();
        assert!(!path.exists());

        sink.close().unwrap();
        assert!(sink.is_closed());
        assert_eq!(fs::read_to_string(&path).unwrap(), "module top;\nendmodule\n");
        assert_eq!(entries(dir.path()), vec!["out.sv"]);
    }

    #[test]
    fn test_close_is_idempotent() {
        let dir = tempdir().unwrap();
        let mut sink = FileSink::open(dir.path().join("a.sv")).unwrap();
        sink.close().unwrap();
        sink.close().unwrap();
    }

    #[test]
    fn test_write_after_close_fails() {
        let dir = tempdir().unwrap();
        let mut sink = FileSink::open(dir.path().join("a.sv")).unwrap();
        sink.close().unwrap();
        assert!(matches!(sink.write("x"), Err(SinkError::Closed { .. })));
    }

    #[test]
    fn test_discard_leaves_destination_untouched() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.sv");
        fs::write(&path, "previous").unwrap();

        let mut sink = FileSink::open(&path).unwrap();
        sink.write("partial").unwrap();
        sink.discard();
        sink.discard();

        assert_eq!(fs::read_to_string(&path).unwrap(), "previous");
        assert_eq!(entries(dir.path()), vec!["out.sv"]);
    }

    #[test]
    fn test_drop_removes_temporary() {
        let dir = tempdir().unwrap();
        {
            let mut sink = FileSink::open(dir.path().join("out.sv")).unwrap();
            sink.write("partial").unwrap();
        }
        assert!(entries(dir.path()).is_empty());
    }

    #[test]
    fn test_close_replaces_existing_output() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.sv");
        fs::write(&path, "old").unwrap();

        let mut sink = FileSink::open(&path).unwrap();
        sink.write("new").unwrap();
        sink.close().unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "new");
    }

    #[test]
    fn test_open_in_missing_directory_fails() {
        let dir = tempdir().unwrap();
        let err = FileSink::open(dir.path().join("missing").join("out.sv")).err();
        assert!(matches!(err, Some(SinkError::Open { .. })));
    }

    #[test]
    fn test_string_sink() {
        let mut out = String::new();
        Sink::write(&mut out, "a").unwrap();
        Sink::write(&mut out, "b").unwrap();
        assert_eq!(out, "ab");
    }
}
