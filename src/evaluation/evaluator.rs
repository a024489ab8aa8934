//! Instruction execution
//!
//! A [`Program`] is compiled before it runs: every directive is parsed up
//! front, so a syntax error anywhere in a file aborts it before any output is
//! produced. Execution is strictly in instruction order.

use super::context::EvaluationContext;
use crate::error::MacroError;
use crate::expansion::{EmitInstruction, Program};
use crate::io::sink::Sink;
use crate::plugins::PluginSet;
use crate::script::{parse_expression, parse_program, EvalError, Expr, ScriptError, Stmt};

#[derive(Debug, Clone, PartialEq)]
pub enum CompiledStep {
    Write(String),
    Eval(Expr),
    Exec(Vec<Stmt>),
}

/// A program whose directives have all been parsed.
#[derive(Debug, Clone, Default)]
pub struct CompiledProgram {
    steps: Vec<(usize, CompiledStep)>,
}

impl CompiledProgram {
    pub fn steps(&self) -> &[(usize, CompiledStep)] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Parse every directive of `program`.
pub fn compile(program: &Program) -> Result<CompiledProgram, MacroError> {
    let mut steps = Vec::with_capacity(program.len());

    for step in program.steps() {
        let compiled = match &step.instruction {
            EmitInstruction::WriteLiteral(text) => CompiledStep::Write(text.clone()),
            EmitInstruction::WriteExpr(expr) => CompiledStep::Eval(
                parse_expression(expr).map_err(|err| syntax_error(step.line, expr, err))?,
            ),
            EmitInstruction::ExecStatement(code) => CompiledStep::Exec(
                parse_program(code).map_err(|err| syntax_error(step.line, code, err))?,
            ),
        };
        steps.push((step.line, compiled));
    }

    Ok(CompiledProgram { steps })
}

/// Point the error at the source line holding the offending input, which is
/// below `line` when `text` spans several block lines.
fn syntax_error(line: usize, text: &str, source: ScriptError) -> MacroError {
    let offset = source.span().start.min(text.len());
    let before = text.get(..offset).unwrap_or(text);
    MacroError::Syntax {
        line: line + before.matches('\n').count(),
        source,
    }
}

fn evaluation_error(line: usize, err: EvalError) -> MacroError {
    match err {
        EvalError::Sink(err) => MacroError::Sink(err),
        source => MacroError::Evaluation { line, source },
    }
}

/// Runs compiled programs against one file's context.
pub struct Evaluator<'s> {
    context: EvaluationContext<'s>,
}

impl<'s> Evaluator<'s> {
    pub fn new(sink: &'s mut dyn Sink, plugins: &'s PluginSet) -> Self {
        Self {
            context: EvaluationContext::new(sink, plugins),
        }
    }

    pub fn context(&self) -> &EvaluationContext<'s> {
        &self.context
    }

    /// Execute every step in order, stopping at the first error.
    pub fn run(&mut self, program: &CompiledProgram) -> Result<(), MacroError> {
        for (line, step) in program.steps() {
            match step {
                CompiledStep::Write(text) => self.context.write(text)?,
                CompiledStep::Eval(expr) => {
                    let value = self
                        .context
                        .eval(expr)
                        .map_err(|err| evaluation_error(*line, err))?;
                    self.context.write(&value.to_string())?;
                }
                CompiledStep::Exec(stmts) => self
                    .context
                    .exec(stmts)
                    .map_err(|err| evaluation_error(*line, err))?,
            }
        }
        Ok(())
    }
}

/// Compile and run `program`, writing into `sink`.
pub fn evaluate(
    program: &Program,
    sink: &mut dyn Sink,
    plugins: &PluginSet,
) -> Result<(), MacroError> {
    let compiled = compile(program)?;
    Evaluator::new(sink, plugins).run(&compiled)
}
