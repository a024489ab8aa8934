//! Plugin registry
//!
//! Plugins implement the [`Plugin`] trait and are registered with a
//! [`PluginRegistry`]. A build resolves the plugin names it was configured with
//! into a [`PluginSet`]: an ordered, read-only list of namespaces whose symbols
//! are visible to every file's expressions.

use crate::script::{Arity, EvalError, NativeFunction, Value};
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

/// Error that can occur while resolving plugins
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PluginError {
    #[error("unknown plugin '{name}' (available: {available})")]
    UnknownPlugin { name: String, available: String },
}

/// Trait for symbol providers
///
/// Implementors export constants and native functions under their name, which
/// becomes the namespace of those symbols (`math.clog2`).
pub trait Plugin: Send + Sync {
    /// The namespace of this plugin (e.g., "math", "fmt")
    fn name(&self) -> &str;

    /// Add this plugin's symbols to `exports`
    fn register(&self, exports: &mut Exports);

    /// Optional description of this plugin
    fn description(&self) -> &str {
        ""
    }
}

/// Symbols exported by one plugin.
#[derive(Debug, Default, Clone)]
pub struct Exports {
    symbols: BTreeMap<String, Value>,
}

impl Exports {
    pub fn new() -> Self {
        Self::default()
    }

    /// Export a constant value.
    pub fn constant(&mut self, name: &str, value: impl Into<Value>) -> &mut Self {
        self.symbols.insert(name.to_string(), value.into());
        self
    }

    /// Export a native function. The argument count is checked before `func`
    /// runs.
    pub fn function<F>(&mut self, name: &str, arity: Arity, func: F) -> &mut Self
    where
        F: Fn(&[Value]) -> Result<Value, EvalError> + Send + Sync + 'static,
    {
        let native = NativeFunction::new(name, arity, func);
        self.symbols.insert(name.to_string(), native.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.symbols.get(name)
    }

    /// Exported names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.symbols.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

/// Resolved plugins of one build, in configuration order.
#[derive(Debug, Default, Clone)]
pub struct PluginSet {
    namespaces: Vec<(String, Exports)>,
}

impl PluginSet {
    /// A set with no plugins.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Resolve an unqualified name. The first plugin exporting it wins.
    pub fn lookup(&self, name: &str) -> Option<&Value> {
        self.namespaces
            .iter()
            .find_map(|(_, exports)| exports.get(name))
    }

    /// Resolve `plugin.name`.
    pub fn lookup_qualified(&self, plugin: &str, name: &str) -> Option<&Value> {
        self.exports(plugin)?.get(name)
    }

    pub fn has_namespace(&self, plugin: &str) -> bool {
        self.exports(plugin).is_some()
    }

    pub fn exports(&self, plugin: &str) -> Option<&Exports> {
        self.namespaces
            .iter()
            .find(|(name, _)| name == plugin)
            .map(|(_, exports)| exports)
    }

    /// Namespace names in resolution order.
    pub fn namespaces(&self) -> impl Iterator<Item = &str> {
        self.namespaces.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.namespaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.namespaces.is_empty()
    }
}

/// Registry of plugins
///
/// Provides a centralized registry for all available plugins.
/// Plugins can be registered and retrieved by name.
pub struct PluginRegistry {
    plugins: HashMap<String, Box<dyn Plugin>>,
}

impl PluginRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        PluginRegistry {
            plugins: HashMap::new(),
        }
    }

    /// Register a plugin
    ///
    /// If a plugin with the same name already exists, it will be replaced.
    pub fn register<P: Plugin + 'static>(&mut self, plugin: P) {
        self.plugins
            .insert(plugin.name().to_string(), Box::new(plugin));
    }

    /// Get a plugin by name
    pub fn get(&self, name: &str) -> Option<&dyn Plugin> {
        self.plugins.get(name).map(|p| p.as_ref())
    }

    /// Check if a plugin exists
    pub fn has(&self, name: &str) -> bool {
        self.plugins.contains_key(name)
    }

    /// List all available plugin names (sorted)
    pub fn list_plugins(&self) -> Vec<String> {
        let mut names: Vec<_> = self.plugins.keys().cloned().collect();
        names.sort();
        names
    }

    /// Collect the exports of the named plugins, in order.
    ///
    /// A name listed twice is loaded once, at its first position.
    pub fn resolve<S: AsRef<str>>(&self, names: &[S]) -> Result<PluginSet, PluginError> {
        let mut set = PluginSet::empty();

        for name in names.iter().map(AsRef::as_ref) {
            if set.has_namespace(name) {
                continue;
            }
            let plugin = self.get(name).ok_or_else(|| PluginError::UnknownPlugin {
                name: name.to_string(),
                available: self.list_plugins().join(", "),
            })?;

            let mut exports = Exports::new();
            plugin.register(&mut exports);
            tracing::debug!(plugin = name, symbols = exports.len(), "resolved plugin");
            set.namespaces.push((name.to_string(), exports));
        }

        Ok(set)
    }

    /// Create a registry with the built-in plugins
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();

        registry.register(super::MathPlugin);
        registry.register(super::FmtPlugin);

        registry
    }
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
