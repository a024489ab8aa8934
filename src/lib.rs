//! # svmacro
//!
//! Macro expansion for SystemVerilog and Verilog sources.
//!
//! Source files mix literal HDL text with three kinds of directives:
//!
//! - `$ stmt` on its own line: a line macro, executed for effect
//! - `$$$` ... `$$$`: a block macro, whose lines are executed as one script
//! - `$$expr$$` inside a literal line: an inline macro, replaced by its value
//!
//! Every file goes through the same one-way pipeline:
//!
//! ```text
//! list_sources -> LineClassifier -> CodeEmitter -> Evaluator -> FileSink
//! ```
//!
//! Directive bodies are written in a small embedded script language (see
//! [`script`]) and may call symbols exported by [`plugins`].

pub mod build;
pub mod error;
pub mod evaluation;
pub mod expansion;
pub mod io;
pub mod plugins;
pub mod script;

pub use build::{build, expand_str, BuildOptions, BuildReport, Builder, FileOutcome};
pub use error::{BuildError, MacroError};
pub use plugins::{Plugin, PluginRegistry, PluginSet};
