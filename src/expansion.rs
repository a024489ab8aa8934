//! Translation of macro sources into instruction programs
//!
//! - [`line_classification`]: per-line state machine over the macro syntax
//! - [`emitter`]: turns classified lines into [`EmitInstruction`]s
//! - [`instructions`]: the instruction types and their serializations

pub mod emitter;
pub mod instructions;
pub mod line_classification;

pub use emitter::{emit_program, CodeEmitter};
pub use instructions::{escape_literal, EmitInstruction, Program, Step};
pub use line_classification::{
    classify_line, classify_source, ClassifiedLine, LineClassification, LineClassifier, Segment,
    BLOCK_DELIMITER, INLINE_DELIMITER, LINE_MACRO_PREFIX,
};

use crate::error::MacroError;

/// Classify and translate a whole source text into its instruction program.
pub fn translate(source: &str) -> Result<Program, MacroError> {
    let lines = classify_source(source)?;
    Ok(emit_program(lines))
}
