//! `fmt` plugin: number and string formatting
//!
//! `hex`, `bin` and `dec` take an optional minimum digit count and zero-pad to
//! it, which is what sized HDL literals need:
//!
//! ```text
//! 8'h$$fmt.hex(mask, 2)$$   ->   8'h0f
//! ```

use super::{int_arg, str_arg, Exports, Plugin};
use crate::script::interpreter::repeat_limit_message;
use crate::script::{repeat_str, Arity, EvalError, Value};

pub struct FmtPlugin;

impl Plugin for FmtPlugin {
    fn name(&self) -> &str {
        "fmt"
    }

    fn description(&self) -> &str {
        "Formatting: hex, bin, dec, upper, lower, join, pad, repeat"
    }

    fn register(&self, exports: &mut Exports) {
        exports
            .function("hex", Arity::Between(1, 2), |args| radix("hex", args, 16))
            .function("bin", Arity::Between(1, 2), |args| radix("bin", args, 2))
            .function("dec", Arity::Between(1, 2), |args| radix("dec", args, 10))
            .function("upper", Arity::Exact(1), |args| {
                Ok(Value::Str(str_arg("upper", args, 0)?.to_uppercase()))
            })
            .function("lower", Arity::Exact(1), |args| {
                Ok(Value::Str(str_arg("lower", args, 0)?.to_lowercase()))
            })
            .function("join", Arity::Between(1, 2), |args| {
                let Value::List(items) = &args[0] else {
                    return Err(EvalError::function(
                        "join",
                        format!("argument 1 must be a list, got {}", args[0].type_name()),
                    ));
                };
                let separator = if args.len() > 1 {
                    str_arg("join", args, 1)?
                } else {
                    ""
                };
                let parts: Vec<String> = items.iter().map(Value::to_string).collect();
                Ok(Value::Str(parts.join(separator)))
            })
            .function("pad", Arity::Exact(2), |args| {
                let text = args[0].to_string();
                let width = width_arg("pad", args, 1)?;
                Ok(Value::Str(format!("{text:<width$}")))
            })
            .function("repeat", Arity::Exact(2), |args| {
                let text = str_arg("repeat", args, 0)?;
                let count = int_arg("repeat", args, 1)?;
                repeat_str(text, count).map(Value::Str).ok_or_else(|| {
                    EvalError::function("repeat", repeat_limit_message(text, count))
                })
            });
    }
}

fn width_arg(function: &str, args: &[Value], index: usize) -> Result<usize, EvalError> {
    if args.len() <= index {
        return Ok(0);
    }
    let width = int_arg(function, args, index)?;
    usize::try_from(width)
        .ok()
        .filter(|&w| w <= 4096)
        .ok_or_else(|| EvalError::function(function, format!("invalid width {width}")))
}

fn radix(function: &str, args: &[Value], radix: u32) -> Result<Value, EvalError> {
    let value = int_arg(function, args, 0)?;
    let width = width_arg(function, args, 1)?;
    let text = match radix {
        16 if value >= 0 => format!("{value:0width$x}"),
        2 if value >= 0 => format!("{value:0width$b}"),
        10 => format!("{value:0width$}"),
        _ => {
            return Err(EvalError::function(
                function,
                "negative values have no unsigned representation",
            ))
        }
    };
    Ok(Value::Str(text))
}
