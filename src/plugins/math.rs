//! `math` plugin: integer helpers for widths and sizes

use super::{int_arg, Exports, Plugin};
use crate::script::{Arity, EvalError, Value};

pub struct MathPlugin;

impl Plugin for MathPlugin {
    fn name(&self) -> &str {
        "math"
    }

    fn description(&self) -> &str {
        "Integer helpers: clog2, pow2, abs, min, max, pow, is_pow2"
    }

    fn register(&self, exports: &mut Exports) {
        exports
            .function("clog2", Arity::Exact(1), |args| {
                let n = int_arg("clog2", args, 0)?;
                if n < 0 {
                    return Err(EvalError::function("clog2", "argument must not be negative"));
                }
                Ok(Value::Int(clog2(n)))
            })
            .function("pow2", Arity::Exact(1), |args| {
                let n = int_arg("pow2", args, 0)?;
                if !(0..63).contains(&n) {
                    return Err(EvalError::function("pow2", format!("exponent {n} is out of range")));
                }
                Ok(Value::Int(1 << n))
            })
            .function("abs", Arity::Exact(1), |args| {
                Ok(Value::Int(int_arg("abs", args, 0)?.wrapping_abs()))
            })
            .function("min", Arity::AtLeast(1), |args| extremum("min", args, |ints| ints.min()))
            .function("max", Arity::AtLeast(1), |args| extremum("max", args, |ints| ints.max()))
            .function("pow", Arity::Exact(2), |args| {
                let base = int_arg("pow", args, 0)?;
                let exponent = int_arg("pow", args, 1)?;
                let exponent = u32::try_from(exponent)
                    .map_err(|_| EvalError::function("pow", "exponent must not be negative"))?;
                Ok(Value::Int(base.wrapping_pow(exponent)))
            })
            .function("is_pow2", Arity::Exact(1), |args| {
                let n = int_arg("is_pow2", args, 0)?;
                Ok(Value::Bool(n > 0 && n & (n - 1) == 0))
            });
    }
}

/// Ceiling of log2, as SystemVerilog's `$clog2`: bits needed to address `n`
/// items. `clog2(0)` and `clog2(1)` are 0.
pub fn clog2(n: i64) -> i64 {
    if n <= 1 {
        return 0;
    }
    64 - i64::from((n - 1).leading_zeros())
}

/// `min`/`max` over the arguments, or over the items of a single list argument.
fn extremum(
    function: &str,
    args: &[Value],
    pick: fn(std::vec::IntoIter<i64>) -> Option<i64>,
) -> Result<Value, EvalError> {
    let values = match args {
        [Value::List(items)] => items.as_slice(),
        _ => args,
    };
    let ints = (0..values.len())
        .map(|i| int_arg(function, values, i))
        .collect::<Result<Vec<_>, _>>()?;
    pick(ints.into_iter())
        .map(Value::Int)
        .ok_or_else(|| EvalError::function(function, "empty sequence"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugins::call_export;
    use rstest::rstest;

    fn call(name: &str, args: &[Value]) -> Result<Value, EvalError> {
        call_export(&MathPlugin, name, args)
    }

    #[rstest]
    #[case(0, 0)]
    #[case(1, 0)]
    #[case(2, 1)]
    #[case(3, 2)]
    #[case(4, 2)]
    #[case(5, 3)]
    #[case(256, 8)]
    #[case(257, 9)]
    fn test_clog2(#[case] n: i64, #[case] expected: i64) {
        assert_eq!(clog2(n), expected);
        assert_eq!(call("clog2", &[Value::Int(n)]).unwrap(), Value::Int(expected));
    }

    #[test]
    fn test_clog2_rejects_negative() {
        assert!(call("clog2", &[Value::Int(-1)]).is_err());
    }

    #[test]
    fn test_pow_helpers() {
        assert_eq!(call("pow2", &[Value::Int(10)]).unwrap(), Value::Int(1024));
        assert!(call("pow2", &[Value::Int(64)]).is_err());
        assert_eq!(
            call("pow", &[Value::Int(3), Value::Int(4)]).unwrap(),
            Value::Int(81)
        );
        assert!(call("pow", &[Value::Int(3), Value::Int(-1)]).is_err());
        assert_eq!(call("is_pow2", &[Value::Int(64)]).unwrap(), Value::Bool(true));
        assert_eq!(call("is_pow2", &[Value::Int(0)]).unwrap(), Value::Bool(false));
        assert_eq!(call("is_pow2", &[Value::Int(12)]).unwrap(), Value::Bool(false));
    }

    #[test]
    fn test_min_max() {
        let args = [Value::Int(4), Value::Int(-2), Value::Int(9)];
        assert_eq!(call("min", &args).unwrap(), Value::Int(-2));
        assert_eq!(call("max", &args).unwrap(), Value::Int(9));
        assert_eq!(
            call("max", &[Value::from(vec![1i64, 7, 3])]).unwrap(),
            Value::Int(7)
        );
        assert!(call("min", &[Value::List(vec![])]).is_err());
        assert!(call("min", &[]).is_err());
    }

    #[test]
    fn test_abs_and_type_errors() {
        assert_eq!(call("abs", &[Value::Int(-5)]).unwrap(), Value::Int(5));
        let err = call("abs", &[Value::from("x")]).unwrap_err();
        assert_eq!(err.to_string(), "abs(): argument 1 must be an int, got str");
    }
}
