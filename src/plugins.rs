//! Plugins: symbol namespaces available to macro expressions
//!
//! Built-in plugins:
//! - `math`: integer helpers for widths and sizes ([`MathPlugin`])
//! - `fmt`: number and string formatting ([`FmtPlugin`])
//!
//! Custom plugins implement [`Plugin`] and are registered with a
//! [`PluginRegistry`] before the build resolves them.

pub mod fmt;
pub mod math;
pub mod registry;

pub use fmt::FmtPlugin;
pub use math::MathPlugin;
pub use registry::{Exports, Plugin, PluginError, PluginRegistry, PluginSet};

use crate::script::{EvalError, Value};

/// Integer argument `index` of `function`.
pub(crate) fn int_arg(function: &str, args: &[Value], index: usize) -> Result<i64, EvalError> {
    let value = args.get(index).unwrap_or(&Value::None);
    value.as_int().ok_or_else(|| {
        EvalError::function(
            function,
            format!(
                "argument {} must be an int, got {}",
                index + 1,
                value.type_name()
            ),
        )
    })
}

/// String argument `index` of `function`.
pub(crate) fn str_arg<'a>(
    function: &str,
    args: &'a [Value],
    index: usize,
) -> Result<&'a str, EvalError> {
    let value = args.get(index).unwrap_or(&Value::None);
    value.as_str().ok_or_else(|| {
        EvalError::function(
            function,
            format!(
                "argument {} must be a str, got {}",
                index + 1,
                value.type_name()
            ),
        )
    })
}

/// Call an exported function directly, for plugin tests.
#[cfg(test)]
pub(crate) fn call_export(
    plugin: &dyn Plugin,
    name: &str,
    args: &[Value],
) -> Result<Value, EvalError> {
    let mut exports = Exports::new();
    plugin.register(&mut exports);
    match exports.get(name) {
        Some(Value::Function(crate::script::Function::Native(f))) => f.call(args),
        other => panic!("{name} is not an exported function: {other:?}"),
    }
}
