use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::{tempdir, TempDir};

fn project(files: &[(&str, &str)]) -> TempDir {
    let dir = tempdir().unwrap();
    fs::create_dir(dir.path().join("src")).unwrap();
    for (name, content) in files {
        fs::write(dir.path().join("src").join(name), content).unwrap();
    }
    dir
}

fn read(dir: &Path, path: &str) -> String {
    fs::read_to_string(dir.join(path)).unwrap()
}

#[test]
fn build_expands_sources_with_defaults() {
    let dir = project(&[
        ("counter.sv", "$ width = 4\nlogic [$$width-1$$:0] count;\n"),
        ("notes.txt", "$$not expanded$$\n"),
    ]);

    let mut cmd = cargo_bin_cmd!("svmacro");
    cmd.current_dir(dir.path()).arg("build");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Expanded 1 of 1 file(s)"));

    assert_eq!(read(dir.path(), "build/counter.sv"), "logic [3:0] count;\n");
    assert!(!dir.path().join("build/notes.txt").exists());
}

#[test]
fn build_honors_directory_and_plugin_flags() {
    let dir = project(&[("fifo.sv", "localparam AW = $$clog2(16)$$;\n")]);

    let mut cmd = cargo_bin_cmd!("svmacro");
    cmd.current_dir(dir.path())
        .args(["build", "--input", "src", "--output", "gen", "--plugin", "math", "--jobs", "2"]);
    cmd.assert().success();

    assert_eq!(read(dir.path(), "gen/fifo.sv"), "localparam AW = 4;\n");
}

#[test]
fn build_reads_project_config() {
    let dir = project(&[("top.sv", "$$fmt.hex(255)$$\n")]);
    fs::write(
        dir.path().join("svmacro.toml"),
        "[build]\noutput_dir = \"out\"\nplugins = [\"fmt\"]\n",
    )
    .unwrap();

    let mut cmd = cargo_bin_cmd!("svmacro");
    cmd.current_dir(dir.path()).arg("build");
    cmd.assert().success();

    assert_eq!(read(dir.path(), "out/top.sv"), "ff\n");
}

#[test]
fn build_reports_failed_files_and_keeps_siblings() {
    let dir = project(&[
        ("bad.sv", "a$$b\n"),
        ("good.sv", "module good; endmodule\n"),
    ]);

    let mut cmd = cargo_bin_cmd!("svmacro");
    cmd.current_dir(dir.path()).arg("build");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("bad.sv").and(predicate::str::contains(
            "unmatched inline macro delimiter",
        )))
        .stdout(predicate::str::contains("Expanded 1 of 2 file(s)"));

    assert_eq!(read(dir.path(), "build/good.sv"), "module good; endmodule\n");
    assert!(!dir.path().join("build/bad.sv").exists());
}

#[test]
fn build_fails_on_missing_input() {
    let dir = tempdir().unwrap();

    let mut cmd = cargo_bin_cmd!("svmacro");
    cmd.current_dir(dir.path()).arg("build");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));

    assert!(!dir.path().join("build").exists());
}

#[test]
fn build_fails_on_unknown_plugin() {
    let dir = project(&[("a.sv", "a\n")]);

    let mut cmd = cargo_bin_cmd!("svmacro");
    cmd.current_dir(dir.path()).args(["build", "--plugin", "nope"]);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("unknown plugin 'nope'"));
}

#[test]
fn expand_prints_output() {
    let dir = project(&[("mux.sv", "$$$\nfor i in 0..2 {\n  write(\"in\", i, \"\\n\")\n}\n$$$\n")]);

    let mut cmd = cargo_bin_cmd!("svmacro");
    cmd.current_dir(dir.path()).args(["expand", "src/mux.sv"]);
    cmd.assert().success().stdout("in0\nin1\n");
}

#[test]
fn expand_emits_listing_and_json() {
    let dir = project(&[("a.sv", "// \"q\"\n$ x = 1\nv$$x$$\n")]);

    let mut listing = cargo_bin_cmd!("svmacro");
    listing
        .current_dir(dir.path())
        .args(["expand", "src/a.sv", "--emit", "listing"]);
    listing
        .assert()
        .success()
        .stdout("write(\"// \\\"q\\\"\\n\")\nx = 1\nwrite(\"v\")\nwrite(x)\nwrite(\"\\n\")\n");

    let mut json = cargo_bin_cmd!("svmacro");
    json.current_dir(dir.path())
        .args(["expand", "src/a.sv", "--emit", "json"]);
    json.assert().success().stdout(
        predicate::str::contains("\"op\": \"exec_statement\"")
            .and(predicate::str::contains("\"line\": 3")),
    );
}

#[test]
fn expand_reports_errors_with_line() {
    let dir = project(&[("a.sv", "ok\n$$$\nx = 1\n")]);

    let mut cmd = cargo_bin_cmd!("svmacro");
    cmd.current_dir(dir.path()).args(["expand", "src/a.sv"]);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("line 2: block macro opened here is never closed"));
}

#[test]
fn plugins_lists_builtins_and_exports() {
    let mut cmd = cargo_bin_cmd!("svmacro");
    cmd.arg("plugins");
    cmd.assert().success().stdout(
        predicate::str::contains("math")
            .and(predicate::str::contains("fmt"))
            .and(predicate::str::contains("clog2"))
            .and(predicate::str::contains("hex")),
    );
}
