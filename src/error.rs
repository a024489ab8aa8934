//! Error types shared by the expansion pipeline and the build driver.
//!
//! [`MacroError`] is fatal for a single file; [`BuildError`] is fatal for the
//! whole build and is raised before any file is processed.

use crate::io::sink::SinkError;
use crate::plugins::PluginError;
use crate::script::{EvalError, ScriptError};
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort the expansion of one source file.
#[derive(Debug, Error)]
pub enum MacroError {
    #[error("line {line}: block macro opened here is never closed")]
    UnterminatedBlockMacro { line: usize },

    #[error("line {line}: unmatched inline macro delimiter in `{content}`")]
    UnmatchedInlineDelimiter { line: usize, content: String },

    #[error("line {line}: {source}")]
    Syntax {
        line: usize,
        #[source]
        source: ScriptError,
    },

    #[error("line {line}: {source}")]
    Evaluation {
        line: usize,
        #[source]
        source: EvalError,
    },

    #[error(transparent)]
    Sink(#[from] SinkError),

    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl MacroError {
    /// Source line the error points at, when it has one.
    pub fn line(&self) -> Option<usize> {
        match self {
            MacroError::UnterminatedBlockMacro { line }
            | MacroError::UnmatchedInlineDelimiter { line, .. }
            | MacroError::Syntax { line, .. }
            | MacroError::Evaluation { line, .. } => Some(*line),
            MacroError::Sink(_) | MacroError::Read { .. } => None,
        }
    }
}

/// Errors that prevent a build from starting.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("input directory {} does not exist", .0.display())]
    MissingDirectory(PathBuf),

    #[error("cannot read directory {}: {source}", path.display())]
    ReadDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot create output directory {}: {source}", path.display())]
    CreateOutputDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Plugin(#[from] PluginError),

    #[error("cannot start worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}
