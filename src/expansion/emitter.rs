//! Code emission
//!
//! Turns classified lines into emit instructions, preserving arrival order.
//! Block macro lines are collected while the block is open and flushed as a
//! single `ExecStatement` when it closes, so that multi-line constructs inside
//! a block are executed as one unit.

use super::instructions::{EmitInstruction, Program};
use super::line_classification::{ClassifiedLine, LineClassification, Segment};

#[derive(Debug)]
struct PendingBlock {
    first_line: usize,
    lines: Vec<String>,
}

#[derive(Debug, Default)]
pub struct CodeEmitter {
    program: Program,
    block: Option<PendingBlock>,
}

impl CodeEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Emit the instructions for one classified line.
    pub fn emit(&mut self, line: ClassifiedLine) {
        let number = line.number;
        match line.classification {
            LineClassification::Literal(segments) => {
                for segment in segments {
                    match segment {
                        Segment::Literal(text) if text.is_empty() => {}
                        Segment::Expr(expr) if expr.trim().is_empty() => {}
                        Segment::Literal(text) => {
                            self.program
                                .push(number, EmitInstruction::WriteLiteral(text));
                        }
                        Segment::Expr(expr) => {
                            self.program.push(number, EmitInstruction::WriteExpr(expr));
                        }
                    }
                }
            }
            LineClassification::LineMacro(code) => {
                self.program
                    .push(number, EmitInstruction::ExecStatement(code));
            }
            LineClassification::BlockMacroStart => {
                self.flush_block();
                self.block = Some(PendingBlock {
                    first_line: number + 1,
                    lines: Vec::new(),
                });
            }
            LineClassification::BlockMacroLine(raw) => {
                self.block
                    .get_or_insert_with(|| PendingBlock {
                        first_line: number,
                        lines: Vec::new(),
                    })
                    .lines
                    .push(raw);
            }
            LineClassification::BlockMacroEnd => self.flush_block(),
        }
    }

    fn flush_block(&mut self) {
        let Some(block) = self.block.take() else {
            return;
        };
        if block.lines.iter().all(|line| line.trim().is_empty()) {
            return;
        }
        self.program.push(
            block.first_line,
            EmitInstruction::ExecStatement(block.lines.join("\n")),
        );
    }

    /// Finish emission and return the program.
    pub fn finish(mut self) -> Program {
        self.flush_block();
        self.program
    }
}

/// Emit a whole classified file.
pub fn emit_program(lines: impl IntoIterator<Item = ClassifiedLine>) -> Program {
    let mut emitter = CodeEmitter::new();
    for line in lines {
        emitter.emit(line);
    }
    emitter.finish()
}
