//! Command-line interface for svmacro
//! This binary expands macro-annotated SystemVerilog/Verilog sources.
//!
//! Usage:
//!   svmacro build [--input `<dir>`] [--output `<dir>`] [--plugin `<name>`]... [--jobs `<n>`]
//!   svmacro expand `<file>` [--plugin `<name>`]... [--emit output|listing|json]
//!   svmacro plugins                                   - List available plugins
//!
//! Settings come from the built-in defaults, `./svmacro.toml`, `--config <file>`
//! and finally the flags above.

use clap::{Arg, ArgAction, ArgMatches, Command};
use std::error::Error;
use std::path::Path;
use std::process::ExitCode;
use svmacro::expansion::translate;
use svmacro::io::SourceFile;
use svmacro::{build, expand_str, BuildOptions, PluginRegistry};
use svmacro_config::{ConfigError, Loader, SvmacroConfig, PROJECT_FILE};
use tracing_subscriber::EnvFilter;

fn cli() -> Command {
    let plugin_arg = Arg::new("plugin")
        .long("plugin")
        .short('p')
        .help("Load a plugin (repeatable; replaces the configured list)")
        .action(ArgAction::Append);

    Command::new("svmacro")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Macro expansion for SystemVerilog and Verilog sources")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .help("Configuration file layered over ./svmacro.toml")
                .global(true),
        )
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .help("Log filter used when RUST_LOG is unset (e.g., 'info', 'svmacro=debug')")
                .global(true),
        )
        .subcommand(
            Command::new("build")
                .about("Expand every source of the input directory into the output directory")
                .arg(
                    Arg::new("input")
                        .long("input")
                        .short('i')
                        .help("Input directory (default: src)"),
                )
                .arg(
                    Arg::new("output")
                        .long("output")
                        .short('o')
                        .help("Output directory (default: build)"),
                )
                .arg(plugin_arg.clone())
                .arg(
                    Arg::new("jobs")
                        .long("jobs")
                        .short('j')
                        .help("Worker threads (0: one per core)")
                        .value_parser(clap::value_parser!(usize)),
                ),
        )
        .subcommand(
            Command::new("expand")
                .about("Expand a single file to stdout")
                .arg(
                    Arg::new("file")
                        .help("Source file to expand")
                        .required(true)
                        .index(1),
                )
                .arg(plugin_arg)
                .arg(
                    Arg::new("emit")
                        .long("emit")
                        .short('e')
                        .help("What to print: the expansion, its instruction listing, or JSON")
                        .value_parser(["output", "listing", "json"])
                        .default_value("output"),
                ),
        )
        .subcommand(Command::new("plugins").about("List available plugins and their exports"))
}

fn main() -> ExitCode {
    let matches = cli().get_matches();
    let Some((command, sub_matches)) = matches.subcommand() else {
        return ExitCode::FAILURE;
    };

    let config = match load_config(sub_matches) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Configuration error: {err}");
            return ExitCode::FAILURE;
        }
    };
    init_tracing(&config.logging.level);

    match command {
        "build" => handle_build_command(&config),
        "expand" => {
            let file = sub_matches
                .get_one::<String>("file")
                .map(String::as_str)
                .unwrap_or_default();
            let emit = sub_matches
                .get_one::<String>("emit")
                .map(String::as_str)
                .unwrap_or("output");
            handle_expand_command(Path::new(file), &config.build.plugins, emit)
        }
        "plugins" => handle_plugins_command(),
        _ => ExitCode::FAILURE,
    }
}

/// Layer defaults, project file, `--config` and flags.
fn load_config(matches: &ArgMatches) -> Result<SvmacroConfig, ConfigError> {
    let mut loader = Loader::new().with_optional_file(PROJECT_FILE);
    if let Some(path) = matches.get_one::<String>("config") {
        loader = loader.with_file(path);
    }

    if let Some(level) = matches.get_one::<String>("log-level") {
        loader = loader.set_override("logging.level", level.as_str())?;
    }
    if let Some(input) = try_get::<String>(matches, "input") {
        loader = loader.set_override("build.input_dir", input.as_str())?;
    }
    if let Some(output) = try_get::<String>(matches, "output") {
        loader = loader.set_override("build.output_dir", output.as_str())?;
    }
    if let Some(jobs) = try_get::<usize>(matches, "jobs") {
        loader = loader.set_override("build.jobs", *jobs as i64)?;
    }
    if let Ok(Some(plugins)) = matches.try_get_many::<String>("plugin") {
        let plugins: Vec<String> = plugins.cloned().collect();
        loader = loader.set_override("build.plugins", plugins)?;
    }

    loader.build()
}

/// Arguments that only some subcommands define.
fn try_get<'a, T: Clone + Send + Sync + 'static>(
    matches: &'a ArgMatches,
    id: &str,
) -> Option<&'a T> {
    matches.try_get_one::<T>(id).ok().flatten()
}

/// Log to stderr. `RUST_LOG` wins over the configured level.
fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Handle the build command
fn handle_build_command(config: &SvmacroConfig) -> ExitCode {
    let options = BuildOptions::new(&config.build.input_dir, &config.build.output_dir)
        .with_plugins(config.build.plugins.iter().cloned())
        .with_extensions(config.build.extensions.iter().cloned())
        .with_jobs(config.build.jobs);

    let report = match build(&options) {
        Ok(report) => report,
        Err(err) => {
            eprintln!("Build error: {err}");
            return ExitCode::FAILURE;
        }
    };

    for outcome in report.failed() {
        if let Err(err) = &outcome.result {
            eprintln!("{}: {err}", outcome.source.display());
        }
    }
    println!(
        "Expanded {} of {} file(s) into {}",
        report.succeeded().count(),
        report.len(),
        options.output_dir.display()
    );

    if report.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

/// Handle the expand command
fn handle_expand_command(path: &Path, plugins: &[String], emit: &str) -> ExitCode {
    match render(path, plugins, emit) {
        Ok(text) => {
            print!("{text}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("{}: {err}", path.display());
            ExitCode::FAILURE
        }
    }
}

fn render(path: &Path, plugins: &[String], emit: &str) -> Result<String, Box<dyn Error>> {
    let source = SourceFile::read(path)?;
    match emit {
        "listing" => Ok(translate(source.content())?.to_listing()),
        "json" => {
            let mut json = translate(source.content())?.to_json()?;
            json.push('\n');
            Ok(json)
        }
        _ => {
            let plugins = PluginRegistry::with_defaults().resolve(plugins)?;
            Ok(expand_str(source.content(), &plugins)?)
        }
    }
}

/// Handle the plugins command
fn handle_plugins_command() -> ExitCode {
    let registry = PluginRegistry::with_defaults();
    println!("Available plugins:");
    for name in registry.list_plugins() {
        let description = registry
            .get(&name)
            .map(|plugin| plugin.description())
            .unwrap_or_default();
        println!("  {name:<8} {description}");

        if let Ok(set) = registry.resolve(&[name.as_str()]) {
            if let Some(exports) = set.exports(&name) {
                let symbols: Vec<&str> = exports.names().collect();
                println!("  {:<8} {}", "", symbols.join(", "));
            }
        }
    }
    ExitCode::SUCCESS
}
