//! End-to-end builds over temporary directories

use std::fs;
use std::path::Path;
use svmacro::plugins::Exports;
use svmacro::script::{Arity, Value};
use svmacro::{build, BuildError, BuildOptions, Builder, MacroError, Plugin, PluginRegistry};
use tempfile::{tempdir, TempDir};

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new(files: &[(&str, &str)]) -> Self {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("src")).unwrap();
        for (name, content) in files {
            fs::write(dir.path().join("src").join(name), content).unwrap();
        }
        Self { dir }
    }

    fn options(&self) -> BuildOptions {
        BuildOptions::new(self.dir.path().join("src"), self.dir.path().join("build"))
    }

    fn output(&self, name: &str) -> Option<String> {
        fs::read_to_string(self.dir.path().join("build").join(name)).ok()
    }

    fn output_entries(&self) -> Vec<String> {
        entries(&self.dir.path().join("build"))
    }
}

fn entries(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

struct DoublePlugin;

impl Plugin for DoublePlugin {
    fn name(&self) -> &str {
        "util"
    }

    fn register(&self, exports: &mut Exports) {
        exports.function("double", Arity::Exact(1), |args| {
            let n = args[0].as_int().unwrap_or_default();
            Ok(Value::Int(n * 2))
        });
    }
}

#[test]
fn literal_only_file_is_copied_verbatim() {
    let source = "module top;\n  // \"quoted\" \\ path\n\n  assign a = b;\nendmodule";
    let ws = Workspace::new(&[("top.sv", source)]);

    let report = build(&ws.options()).unwrap();

    assert!(report.is_success());
    assert_eq!(ws.output("top.sv").as_deref(), Some(source));
}

#[test]
fn line_macro_binding_is_visible_to_inline_macro() {
    let ws = Workspace::new(&[("a.sv", "$ x = 5\nvalue = $$x$$;\n")]);
    build(&ws.options()).unwrap();
    assert_eq!(ws.output("a.sv").as_deref(), Some("value = 5;\n"));
}

#[test]
fn inline_macro_is_replaced_in_place() {
    let ws = Workspace::new(&[("a.v", "a$$1+1$$b\n")]);
    build(&ws.options()).unwrap();
    assert_eq!(ws.output("a.v").as_deref(), Some("a2b\n"));
}

#[test]
fn block_contents_only_contribute_their_writes() {
    let source = "\
begin
$$$
# generated assigns
for i in 0..3 {
    write(\"  assign y[\", i, \"] = x[\", 2 - i, \"];\\n\")
}
$$$
end
";
    let ws = Workspace::new(&[("rev.sv", source)]);
    build(&ws.options()).unwrap();

    let out = ws.output("rev.sv").unwrap();
    assert_eq!(
        out,
        "begin\n  assign y[0] = x[2];\n  assign y[1] = x[1];\n  assign y[2] = x[0];\nend\n"
    );
    assert!(!out.contains("for i"));
    assert!(!out.contains("$$$"));
}

#[test]
fn failed_file_leaves_no_output_and_siblings_succeed() {
    let ws = Workspace::new(&[
        ("a_good.sv", "wire a;\n"),
        ("b_bad.sv", "wire $$b;\n"),
        ("c_good.sv", "wire $$\"c\"$$;\n"),
        ("d_open.sv", "$$$\nwrite(1)\n"),
    ]);

    let report = build(&ws.options()).unwrap();

    assert!(!report.is_success());
    assert_eq!(report.len(), 4);
    assert_eq!(report.succeeded().count(), 2);

    let failed: Vec<_> = report.failed().collect();
    assert!(matches!(
        failed[0].result,
        Err(MacroError::UnmatchedInlineDelimiter { line: 1, .. })
    ));
    assert!(matches!(
        failed[1].result,
        Err(MacroError::UnterminatedBlockMacro { line: 1 })
    ));

    assert_eq!(ws.output("a_good.sv").as_deref(), Some("wire a;\n"));
    assert_eq!(ws.output("c_good.sv").as_deref(), Some("wire c;\n"));
    assert_eq!(ws.output_entries(), vec!["a_good.sv", "c_good.sv"]);
}

#[test]
fn runtime_failure_leaves_no_partial_output() {
    let ws = Workspace::new(&[("a.sv", "first line\n$ write(1 / 0)\nlast line\n")]);

    let report = build(&ws.options()).unwrap();

    let outcome = &report.outcomes()[0];
    assert!(matches!(
        outcome.result,
        Err(MacroError::Evaluation { line: 2, .. })
    ));
    assert!(ws.output_entries().is_empty());
}

#[test]
fn oversized_repetition_fails_only_its_file() {
    let ws = Workspace::new(&[
        ("a.sv", "wire a;\n"),
        ("b.sv", "$$\"ab\" * 9223372036854775807$$\n"),
        ("c.sv", "$$fmt.repeat(\"ab\", 9223372036854775807)$$\n"),
    ]);

    let report = build(&ws.options().with_plugins(["fmt"])).unwrap();

    assert_eq!(report.succeeded().count(), 1);
    let failed: Vec<_> = report.failed().collect();
    assert_eq!(failed.len(), 2);
    assert!(failed
        .iter()
        .all(|outcome| matches!(outcome.result, Err(MacroError::Evaluation { line: 1, .. }))));
    assert_eq!(ws.output_entries(), vec!["a.sv"]);
}

#[test]
fn failed_rebuild_keeps_previous_output() {
    let ws = Workspace::new(&[("a.sv", "v$$1$$\n")]);
    build(&ws.options()).unwrap();

    fs::write(ws.dir.path().join("src/a.sv"), "v$$missing$$\n").unwrap();
    let report = build(&ws.options()).unwrap();

    assert!(!report.is_success());
    assert_eq!(ws.output("a.sv").as_deref(), Some("v1\n"));
    assert_eq!(ws.output_entries(), vec!["a.sv"]);
}

#[test]
fn missing_input_directory_fails_before_any_output() {
    let dir = tempdir().unwrap();
    let options = BuildOptions::new(dir.path().join("src"), dir.path().join("build"));

    let err = build(&options).unwrap_err();

    assert!(matches!(err, BuildError::MissingDirectory(_)));
    assert!(!dir.path().join("build").exists());
}

#[test]
fn unknown_plugin_fails_the_build() {
    let ws = Workspace::new(&[("a.sv", "a\n")]);
    let err = build(&ws.options().with_plugins(["nope"])).unwrap_err();
    assert!(matches!(err, BuildError::Plugin(_)));
}

#[test]
fn rebuilding_is_byte_identical() {
    let ws = Workspace::new(&[
        ("a.sv", "$ n = 3\n$$$\nfor i in 0..n { write(i) }\n$$$\n\nx$$n * n$$\n"),
        ("b.v", "plain\n"),
    ]);

    build(&ws.options()).unwrap();
    let first = (ws.output("a.sv"), ws.output("b.v"));
    build(&ws.options()).unwrap();
    let second = (ws.output("a.sv"), ws.output("b.v"));

    assert_eq!(first, second);
    assert_eq!(first.0.as_deref(), Some("012\nx9\n"));
}

#[test]
fn custom_plugin_functions_are_callable() {
    let ws = Workspace::new(&[("a.sv", "$$double(3)$$ $$util.double(4)$$\n")]);
    let mut registry = PluginRegistry::with_defaults();
    registry.register(DoublePlugin);

    let report = Builder::with_registry(registry)
        .build(&ws.options().with_plugins(["util"]))
        .unwrap();

    assert!(report.is_success());
    assert_eq!(ws.output("a.sv").as_deref(), Some("6 8\n"));
}

#[test]
fn builtin_plugins_resolve_in_order() {
    let ws = Workspace::new(&[(
        "a.sv",
        "[$$clog2(1024) - 1$$:0] $$fmt.bin(5, 4)$$ $$upper(\"ok\")$$\n",
    )]);
    build(&ws.options().with_plugins(["math", "fmt"])).unwrap();
    assert_eq!(ws.output("a.sv").as_deref(), Some("[9:0] 0101 OK\n"));
}

#[test]
fn files_are_isolated_from_each_other() {
    let ws = Workspace::new(&[
        ("a.sv", "$ shared = 1\n$$shared$$\n"),
        ("b.sv", "$$shared$$\n"),
    ]);

    let report = build(&ws.options()).unwrap();

    assert_eq!(ws.output("a.sv").as_deref(), Some("1\n"));
    assert!(ws.output("b.sv").is_none());
    assert_eq!(report.failed().count(), 1);
}

#[test]
fn dedicated_worker_pool_and_extensions() {
    let ws = Workspace::new(&[
        ("pkg.svh", "localparam W = $$2 ** 3$$;\n"),
        ("top.sv", "ignored\n"),
    ]);

    let report = build(&ws.options().with_extensions(["svh"]).with_jobs(2)).unwrap();

    assert_eq!(report.len(), 1);
    assert_eq!(ws.output("pkg.svh").as_deref(), Some("localparam W = 8;\n"));
    assert!(ws.output("top.sv").is_none());
}
