//! File input and output
//!
//! - [`sources`]: discovers and reads source files
//! - [`sink`]: writes expanded text, atomically for files

pub mod sink;
pub mod sources;

pub use sink::{FileSink, Sink, SinkError};
pub use sources::{is_recognized, list_sources, SourceFile, DEFAULT_EXTENSIONS};
