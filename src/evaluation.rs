//! Execution of instruction programs
//!
//! - [`context`]: per-file sink, bindings and plugin symbols
//! - [`evaluator`]: compiles and runs a [`crate::expansion::Program`]

pub mod context;
pub mod evaluator;

pub use context::EvaluationContext;
pub use evaluator::{compile, evaluate, CompiledProgram, CompiledStep, Evaluator};
