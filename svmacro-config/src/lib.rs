//! Configuration loader for svmacro.
//!
//! `defaults/svmacro.default.toml` is embedded into the binary so that the
//! documented defaults and runtime behavior stay in sync. Callers layer project
//! and user files on top of it via [`Loader`] before deserializing into
//! [`SvmacroConfig`].

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, File, FileFormat, ValueKind};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub use config::ConfigError;

const DEFAULT_TOML: &str = include_str!("../defaults/svmacro.default.toml");

/// Name of the project configuration file picked up from the working directory.
pub const PROJECT_FILE: &str = "svmacro.toml";

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SvmacroConfig {
    pub build: BuildConfig,
    pub logging: LoggingConfig,
}

/// Where sources are read from and written to, and which plugins they see.
#[derive(Debug, Clone, Deserialize)]
pub struct BuildConfig {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    #[serde(default)]
    pub plugins: Vec<String>,
    pub extensions: Vec<String>,
    pub jobs: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

/// Helper for layering user overrides over the built-in defaults.
#[derive(Debug, Clone)]
pub struct Loader {
    builder: ConfigBuilder<DefaultState>,
}

impl Loader {
    /// Start a loader seeded with the embedded defaults.
    pub fn new() -> Self {
        let builder = Config::builder().add_source(File::from_str(DEFAULT_TOML, FileFormat::Toml));
        Self { builder }
    }

    /// Layer a configuration file. Missing files trigger an error.
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(true);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Layer an optional configuration file (ignored if the file is absent).
    pub fn with_optional_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(false);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Apply a single key/value override (useful for CLI flags).
    pub fn set_override<I>(mut self, key: &str, value: I) -> Result<Self, ConfigError>
    where
        I: Into<ValueKind>,
    {
        self.builder = self.builder.set_override(key, value)?;
        Ok(self)
    }

    /// Finalize the builder and deserialize the resulting configuration.
    pub fn build(self) -> Result<SvmacroConfig, ConfigError> {
        self.builder.build()?.try_deserialize()
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience helper for callers that only need the defaults.
pub fn load_defaults() -> Result<SvmacroConfig, ConfigError> {
    Loader::new().build()
}
