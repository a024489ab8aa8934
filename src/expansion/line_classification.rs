//! Line Classification
//!
//! Every source line is in exactly one of four states: literal text, a line
//! macro, a block macro boundary, or inside a block macro. The only state
//! carried from one line to the next is whether a block macro is open.
//!
//! Classification follows this order:
//! 1. Inside a block: `$$$` closes it, anything else is block content
//! 2. Trimmed line starts with `$ `: line macro
//! 3. Trimmed line is `$$$`: block macro start
//! 4. Default to literal, split on `$$` into literal/expression segments

use crate::error::MacroError;
use serde::Serialize;

/// Marker that turns a whole line into a line macro.
pub const LINE_MACRO_PREFIX: &str = "$ ";
/// A trimmed line equal to this opens or closes a block macro.
pub const BLOCK_DELIMITER: &str = "$$$";
/// Paired delimiter around inline expressions.
pub const INLINE_DELIMITER: &str = "$$";

/// One piece of a literal line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "text", rename_all = "snake_case")]
pub enum Segment {
    Literal(String),
    Expr(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum LineClassification {
    /// Alternating literal/expression segments, always starting with a literal.
    Literal(Vec<Segment>),
    /// Host code of a line macro, prefix and terminator stripped.
    LineMacro(String),
    BlockMacroStart,
    /// Raw block content, terminator stripped.
    BlockMacroLine(String),
    BlockMacroEnd,
}

/// A classification together with its 1-based source line number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassifiedLine {
    pub number: usize,
    pub classification: LineClassification,
}

/// A literal line holding an odd number of inline delimiters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelimiterMismatch {
    pub delimiters: usize,
}

/// Classify a single line given whether a block macro is currently open.
///
/// Returns the classification and the block state for the next line. The line
/// may carry its terminator; literal segments keep it as data.
pub fn classify_line(
    line: &str,
    inside_block: bool,
) -> Result<(LineClassification, bool), DelimiterMismatch> {
    let trimmed = line.trim();

    if inside_block {
        if trimmed == BLOCK_DELIMITER {
            return Ok((LineClassification::BlockMacroEnd, false));
        }
        let raw = strip_terminator(line).to_string();
        return Ok((LineClassification::BlockMacroLine(raw), true));
    }

    if let Some(code) = trimmed.strip_prefix(LINE_MACRO_PREFIX) {
        return Ok((LineClassification::LineMacro(code.to_string()), false));
    }

    if trimmed == BLOCK_DELIMITER {
        return Ok((LineClassification::BlockMacroStart, true));
    }

    let segments = split_segments(line)?;
    Ok((LineClassification::Literal(segments), false))
}

/// Split a literal line on the inline delimiter.
///
/// Even indexes are literal text and odd indexes are expressions, so a balanced
/// line always yields an odd number of segments.
fn split_segments(line: &str) -> Result<Vec<Segment>, DelimiterMismatch> {
    let parts: Vec<&str> = line.split(INLINE_DELIMITER).collect();
    if parts.len() % 2 == 0 {
        return Err(DelimiterMismatch {
            delimiters: parts.len() - 1,
        });
    }

    Ok(parts
        .into_iter()
        .enumerate()
        .map(|(i, part)| {
            if i % 2 == 0 {
                Segment::Literal(part.to_string())
            } else {
                Segment::Expr(part.to_string())
            }
        })
        .collect())
}

fn strip_terminator(line: &str) -> &str {
    line.trim_end_matches(['\n', '\r'])
}

/// Stateful classifier over the lines of one file.
#[derive(Debug, Default)]
pub struct LineClassifier {
    inside_block: bool,
    line_number: usize,
    block_opened_at: Option<usize>,
}

impl LineClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_inside_block(&self) -> bool {
        self.inside_block
    }

    /// Classify the next line of the file.
    pub fn classify(&mut self, line: &str) -> Result<ClassifiedLine, MacroError> {
        self.line_number += 1;
        let number = self.line_number;

        let (classification, inside_block) = classify_line(line, self.inside_block).map_err(
            |_| MacroError::UnmatchedInlineDelimiter {
                line: number,
                content: strip_terminator(line).to_string(),
            },
        )?;

        match classification {
            LineClassification::BlockMacroStart => self.block_opened_at = Some(number),
            LineClassification::BlockMacroEnd => self.block_opened_at = None,
            _ => {}
        }
        self.inside_block = inside_block;

        Ok(ClassifiedLine {
            number,
            classification,
        })
    }

    /// Check the end-of-file state.
    pub fn finish(self) -> Result<(), MacroError> {
        match self.block_opened_at {
            Some(line) if self.inside_block => Err(MacroError::UnterminatedBlockMacro { line }),
            _ => Ok(()),
        }
    }
}

/// Classify every line of a source text.
pub fn classify_source(source: &str) -> Result<Vec<ClassifiedLine>, MacroError> {
    let mut classifier = LineClassifier::new();
    let lines = source
        .split_inclusive('\n')
        .map(|line| classifier.classify(line))
        .collect::<Result<Vec<_>, _>>()?;
    classifier.finish()?;
    Ok(lines)
}
