//! Emit instructions
//!
//! A [`Program`] is the ordered instruction stream for one source file. Order is
//! the only guarantee: instructions run, and their writes land, strictly in
//! sequence.
//!
//! Programs have two serializations:
//!
//! - the *listing* ([`Program::to_listing`]), which is itself a valid script:
//!   literals become `write("...")` calls with their payload escaped
//! - JSON ([`Program::to_json`]) for tooling

use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op", content = "text", rename_all = "snake_case")]
pub enum EmitInstruction {
    /// Write the text verbatim.
    WriteLiteral(String),
    /// Evaluate the expression and write its value.
    WriteExpr(String),
    /// Execute host statements for effect.
    ExecStatement(String),
}

impl fmt::Display for EmitInstruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmitInstruction::WriteLiteral(text) => write!(f, "write(\"{}\")", escape_literal(text)),
            EmitInstruction::WriteExpr(expr) => write!(f, "write({})", expr.trim()),
            EmitInstruction::ExecStatement(code) => write!(f, "{}", code),
        }
    }
}

/// An instruction and the 1-based source line it was emitted for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Step {
    pub line: usize,
    pub instruction: EmitInstruction,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Program {
    steps: Vec<Step>,
}

impl Program {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, line: usize, instruction: EmitInstruction) {
        self.steps.push(Step { line, instruction });
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Render the program as a script, one instruction per line.
    pub fn to_listing(&self) -> String {
        let mut listing = String::new();
        for step in &self.steps {
            listing.push_str(&step.instruction.to_string());
            listing.push('\n');
        }
        listing
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.steps)
    }
}

/// Escape literal text so it can be embedded in a double-quoted script string.
///
/// Quotes and backslashes are escaped; line terminators and tabs become escape
/// sequences so that a literal always stays on one listing line.
pub fn escape_literal(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '"' => escaped.push_str("\\\""),
            '\\' => escaped.push_str("\\\\"),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\t' => escaped.push_str("\\t"),
            c => escaped.push(c),
        }
    }
    escaped
}
