//! Build driver
//!
//! Runs the pipeline over every source file of an input directory:
//!
//! ```text
//! list_sources -> translate -> compile -> Evaluator -> FileSink
//! ```
//!
//! Files are independent and processed in parallel with rayon. Inside a file
//! everything is sequential. A file that fails is reported in the
//! [`BuildReport`] and leaves no output; its siblings are unaffected.

use crate::error::{BuildError, MacroError};
use crate::evaluation::{compile, Evaluator};
use crate::expansion::translate;
use crate::io::{list_sources, FileSink, SourceFile, DEFAULT_EXTENSIONS};
use crate::plugins::{PluginRegistry, PluginSet};
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};

/// What to build and how.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOptions {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Plugin names, in resolution order.
    pub plugins: Vec<String>,
    /// Recognized extensions, without the dot.
    pub extensions: Vec<String>,
    /// Worker threads; 0 uses the global rayon pool.
    pub jobs: usize,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("src"),
            output_dir: PathBuf::from("build"),
            plugins: Vec::new(),
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            jobs: 0,
        }
    }
}

impl BuildOptions {
    pub fn new(input_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            input_dir: input_dir.into(),
            output_dir: output_dir.into(),
            ..Self::default()
        }
    }

    pub fn with_plugins<I, S>(mut self, plugins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.plugins = plugins.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs;
        self
    }
}

/// Result of expanding one source file.
#[derive(Debug)]
pub struct FileOutcome {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub result: Result<(), MacroError>,
}

impl FileOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Per-file outcomes, in source order.
#[derive(Debug, Default)]
pub struct BuildReport {
    outcomes: Vec<FileOutcome>,
}

impl BuildReport {
    pub fn outcomes(&self) -> &[FileOutcome] {
        &self.outcomes
    }

    pub fn succeeded(&self) -> impl Iterator<Item = &FileOutcome> {
        self.outcomes.iter().filter(|o| o.is_success())
    }

    pub fn failed(&self) -> impl Iterator<Item = &FileOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }

    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(FileOutcome::is_success)
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }
}

/// Runs builds against a plugin registry.
pub struct Builder {
    registry: PluginRegistry,
}

impl Builder {
    /// A builder with the built-in plugins.
    pub fn new() -> Self {
        Self::with_registry(PluginRegistry::with_defaults())
    }

    pub fn with_registry(registry: PluginRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut PluginRegistry {
        &mut self.registry
    }

    /// Expand every source file of `options.input_dir` into
    /// `options.output_dir`.
    ///
    /// Fails without touching any file when the input directory is missing,
    /// a plugin is unknown, or the output directory cannot be created.
    pub fn build(&self, options: &BuildOptions) -> Result<BuildReport, BuildError> {
        let sources = list_sources(&options.input_dir, options.extensions.as_slice())?;
        let plugins = self.registry.resolve(options.plugins.as_slice())?;
        fs::create_dir_all(&options.output_dir).map_err(|source| {
            BuildError::CreateOutputDirectory {
                path: options.output_dir.clone(),
                source,
            }
        })?;

        tracing::info!(
            input = %options.input_dir.display(),
            output = %options.output_dir.display(),
            files = sources.len(),
            "starting build"
        );

        let process_all = || {
            sources
                .par_iter()
                .map(|source| process_file(source, &options.output_dir, &plugins))
                .collect::<Vec<_>>()
        };
        let outcomes = if options.jobs > 0 {
            rayon::ThreadPoolBuilder::new()
                .num_threads(options.jobs)
                .build()?
                .install(process_all)
        } else {
            process_all()
        };

        let report = BuildReport { outcomes };
        tracing::info!(
            succeeded = report.succeeded().count(),
            failed = report.failed().count(),
            "build finished"
        );
        Ok(report)
    }
}

impl Default for Builder {
    fn default() -> Self {
        Self::new()
    }
}

/// Build with the built-in plugins.
pub fn build(options: &BuildOptions) -> Result<BuildReport, BuildError> {
    Builder::new().build(options)
}

fn process_file(source: &Path, output_dir: &Path, plugins: &PluginSet) -> FileOutcome {
    let destination = output_dir.join(source.file_name().unwrap_or_default());
    let result = expand_file(source, &destination, plugins);

    match &result {
        Ok(()) => tracing::info!(
            source = %source.display(),
            destination = %destination.display(),
            "expanded"
        ),
        Err(err) => tracing::warn!(source = %source.display(), error = %err, "expansion failed"),
    }

    FileOutcome {
        source: source.to_path_buf(),
        destination,
        result,
    }
}

/// Expand one file into `destination`.
///
/// The file is translated and compiled before the output is opened. On any
/// error the output is discarded and `destination` is left as it was.
pub fn expand_file(
    source: &Path,
    destination: &Path,
    plugins: &PluginSet,
) -> Result<(), MacroError> {
    let file = SourceFile::read(source)?;
    let program = translate(file.content())?;
    let compiled = compile(&program)?;
    tracing::debug!(
        source = %source.display(),
        instructions = program.len(),
        "translated"
    );

    let mut sink = FileSink::open(destination)?;
    let result = Evaluator::new(&mut sink, plugins).run(&compiled);
    match result {
        Ok(()) => Ok(sink.close()?),
        Err(err) => {
            sink.discard();
            Err(err)
        }
    }
}

/// Expand source text in memory.
pub fn expand_str(source: &str, plugins: &PluginSet) -> Result<String, MacroError> {
    let compiled = compile(&translate(source)?)?;
    let mut out = String::new();
    Evaluator::new(&mut out, plugins).run(&compiled)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_plugins(names: &[&str]) -> PluginSet {
        PluginRegistry::with_defaults().resolve(names).unwrap()
    }

    #[test]
    fn test_default_options() {
        let options = BuildOptions::default();
        assert_eq!(options.input_dir, PathBuf::from("src"));
        assert_eq!(options.output_dir, PathBuf::from("build"));
        assert!(options.plugins.is_empty());
        assert_eq!(options.extensions, vec!["sv", "v"]);
        assert_eq!(options.jobs, 0);
    }

    #[test]
    fn test_options_builders() {
        let options = BuildOptions::new("rtl", "out")
            .with_plugins(["math"])
            .with_extensions(["svh"])
            .with_jobs(2);
        assert_eq!(options.input_dir, PathBuf::from("rtl"));
        assert_eq!(options.plugins, vec!["math"]);
        assert_eq!(options.extensions, vec!["svh"]);
        assert_eq!(options.jobs, 2);
    }

    #[test]
    fn test_expand_str_full_file() {
        let source = "\
// generated \"regs\"
$ width = 8
$$$
fn port(i) {
    return \"data_\" + str(i)
}
$$$
module regs (
$$$
for i in 0..3 {
    write(\"  input logic [\", width - 1, \":0] \", port(i), \",\\n\")
}
$$$
  output logic [$$math.clog2(256) - 1$$:0] sel
);
  localparam MASK = 16'h$$fmt.hex(255, 4)$$;
endmodule
";
        let out = expand_str(source, &with_plugins(&["math", "fmt"])).unwrap();
        insta::assert_snapshot!(out, @r#"
        // generated "regs"
        module regs (
          input logic [7:0] data_0,
          input logic [7:0] data_1,
          input logic [7:0] data_2,
          output logic [7:0] sel
        );
          localparam MASK = 16'h00ff;
        endmodule
        "#);
    }

    #[test]
    fn test_expand_str_reports_first_error() {
        let err = expand_str("ok\n$ write(missing)\n", &PluginSet::empty()).unwrap_err();
        assert_eq!(err.line(), Some(2));
        assert_eq!(err.to_string(), "line 2: undefined name 'missing'");
    }

    #[test]
    fn test_build_report_counts() {
        let report = BuildReport {
            outcomes: vec![
                FileOutcome {
                    source: PathBuf::from("a.sv"),
                    destination: PathBuf::from("build/a.sv"),
                    result: Ok(()),
                },
                FileOutcome {
                    source: PathBuf::from("b.sv"),
                    destination: PathBuf::from("build/b.sv"),
                    result: Err(MacroError::UnterminatedBlockMacro { line: 1 }),
                },
            ],
        };
        assert_eq!(report.len(), 2);
        assert_eq!(report.succeeded().count(), 1);
        assert_eq!(report.failed().count(), 1);
        assert!(!report.is_success());
    }
}
