//! The embedded script language used inside macros
//!
//! A small dynamically typed language with integers, strings, booleans, lists
//! and functions. Line and block macros hold statements; inline macros hold a
//! single expression whose value is written in place.
//!
//! ```text
//! width = 8
//! fn mask(bits) { return (1 << bits) - 1 }
//! for i in 0..4 {
//!     write("assign q[", i, "] = d[", i, "];\n")
//! }
//! ```
//!
//! Modules:
//! - [`tokens`]: logos lexer
//! - [`ast`]: syntax tree
//! - [`parser`]: chumsky grammar
//! - [`value`]: runtime values and native functions
//! - [`interpreter`]: tree-walking evaluation against a [`Host`]

pub mod ast;
pub mod interpreter;
pub mod parser;
pub mod tokens;
pub mod value;

pub use ast::{AssignOp, BinaryOp, Expr, FunctionDef, Literal, Stmt, UnaryOp};
pub use interpreter::{
    apply_binary, apply_unary, repeat_str, Environment, EvalError, Host, Interpreter,
    MAX_CALL_DEPTH, MAX_REPEAT_LEN,
};
pub use parser::{parse_expression, parse_program, ScriptError};
pub use tokens::{tokenize, Token};
pub use value::{Arity, Builtin, Function, NativeFunction, Value};
