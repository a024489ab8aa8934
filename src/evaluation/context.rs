//! Per-file evaluation state

use crate::io::sink::{Sink, SinkError};
use crate::plugins::PluginSet;
use crate::script::{Environment, EvalError, Expr, Host, Interpreter, Stmt, Value};

/// Output sink, bindings and plugin symbols of one file.
///
/// There is exactly one context per file and nothing in it is shared with
/// other files except the read-only plugin set.
pub struct EvaluationContext<'s> {
    sink: &'s mut dyn Sink,
    plugins: &'s PluginSet,
    env: Environment,
}

impl<'s> EvaluationContext<'s> {
    pub fn new(sink: &'s mut dyn Sink, plugins: &'s PluginSet) -> Self {
        Self {
            sink,
            plugins,
            env: Environment::new(),
        }
    }

    pub fn environment(&self) -> &Environment {
        &self.env
    }

    pub fn plugins(&self) -> &PluginSet {
        self.plugins
    }

    /// Append text to the output.
    pub fn write(&mut self, text: &str) -> Result<(), SinkError> {
        self.sink.write(text)
    }

    /// Execute statements for effect.
    pub fn exec(&mut self, stmts: &[Stmt]) -> Result<(), EvalError> {
        let mut host = ContextHost {
            sink: &mut *self.sink,
            plugins: self.plugins,
        };
        Interpreter::new(&mut self.env, &mut host).run(stmts)
    }

    /// Evaluate an expression.
    pub fn eval(&mut self, expr: &Expr) -> Result<Value, EvalError> {
        let mut host = ContextHost {
            sink: &mut *self.sink,
            plugins: self.plugins,
        };
        Interpreter::new(&mut self.env, &mut host).eval(expr)
    }
}

/// The sink and plugins, borrowed apart from the environment.
struct ContextHost<'a> {
    sink: &'a mut dyn Sink,
    plugins: &'a PluginSet,
}

impl Host for ContextHost<'_> {
    fn write(&mut self, text: &str) -> Result<(), EvalError> {
        Ok(self.sink.write(text)?)
    }

    fn lookup(&self, name: &str) -> Option<Value> {
        self.plugins.lookup(name).cloned()
    }

    fn has_namespace(&self, name: &str) -> bool {
        self.plugins.has_namespace(name)
    }

    fn lookup_in(&self, namespace: &str, name: &str) -> Option<Value> {
        self.plugins.lookup_qualified(namespace, name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugins::PluginRegistry;
    use crate::script::{parse_expression, parse_program};

    #[test]
    fn test_statements_write_to_sink() {
        let plugins = PluginSet::empty();
        let mut out = String::new();
        let mut context = EvaluationContext::new(&mut out, &plugins);

        context.write("a").unwrap();
        context
            .exec(&parse_program("write(\"b\", 1 + 1)").unwrap())
            .unwrap();
        drop(context);

        assert_eq!(out, "ab2");
    }

    #[test]
    fn test_bindings_live_in_the_context() {
        let plugins = PluginSet::empty();
        let mut out = String::new();
        let mut context = EvaluationContext::new(&mut out, &plugins);

        context.exec(&parse_program("x = 5").unwrap()).unwrap();
        let value = context.eval(&parse_expression("x").unwrap()).unwrap();

        assert_eq!(value, Value::Int(5));
        assert_eq!(context.environment().get("x"), Some(&Value::Int(5)));
    }

    #[test]
    fn test_plugin_symbols_are_visible() {
        let plugins = PluginRegistry::with_defaults()
            .resolve(&["math"])
            .unwrap();
        let mut out = String::new();
        let mut context = EvaluationContext::new(&mut out, &plugins);

        let qualified = context
            .eval(&parse_expression("math.clog2(16)").unwrap())
            .unwrap();
        let unqualified = context.eval(&parse_expression("clog2(17)").unwrap()).unwrap();

        assert_eq!(qualified, Value::Int(4));
        assert_eq!(unqualified, Value::Int(5));
        assert!(context.plugins().has_namespace("math"));
    }

    #[test]
    fn test_unloaded_plugin_is_undefined() {
        let plugins = PluginSet::empty();
        let mut out = String::new();
        let mut context = EvaluationContext::new(&mut out, &plugins);

        let err = context
            .eval(&parse_expression("math.clog2(16)").unwrap())
            .unwrap_err();
        assert!(matches!(err, EvalError::UndefinedName(name) if name == "math"));
    }
}
