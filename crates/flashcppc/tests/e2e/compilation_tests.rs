//! Full pipeline E2E tests (§8): lex → parse → sem → IR → LIR → object,
//! exercised end to end through the `flashcppc` binary.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn flashcppc_bin() -> Command {
    Command::new(env!("CARGO_BIN_EXE_flashcppc"))
}

fn write_source(dir: &TempDir, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, contents).expect("writes fixture source");
    path
}

#[test]
fn compiles_an_empty_function() {
    let dir = TempDir::new().expect("temp dir");
    let input = write_source(&dir, "empty.cpp", "int main() { }");
    let output = dir.path().join("empty.o");

    flashcppc_bin().arg("--target-linux").arg("-o").arg(&output).arg(&input).assert().success();
    assert!(output.exists());
}

#[test]
fn compiles_a_function_returning_a_constant() {
    let dir = TempDir::new().expect("temp dir");
    let input = write_source(&dir, "returns_zero.cpp", "int main() { return 0; }");
    let output = dir.path().join("returns_zero.o");

    flashcppc_bin().arg("--target-linux").arg("-o").arg(&output).arg(&input).assert().success();
    assert!(output.exists());
}

#[test]
fn compiles_arithmetic_and_a_direct_call() {
    let dir = TempDir::new().expect("temp dir");
    let input = write_source(
        &dir,
        "add.cpp",
        "int add(int a, int b) { return a + b; } int main() { return add(1, 2); }",
    );
    let output = dir.path().join("add.o");

    flashcppc_bin().arg("--target-linux").arg("-o").arg(&output).arg(&input).assert().success();
    assert!(output.exists());
}

#[test]
fn compiles_a_top_level_variable_declaration() {
    let dir = TempDir::new().expect("temp dir");
    let input = write_source(&dir, "global.cpp", "int counter = 0; int main() { return counter; }");
    let output = dir.path().join("global.o");

    flashcppc_bin().arg("--target-linux").arg("-o").arg(&output).arg(&input).assert().success();
    assert!(output.exists());
}

#[test]
fn rejects_malformed_syntax_and_leaves_no_object_behind() {
    let dir = TempDir::new().expect("temp dir");
    let input = write_source(&dir, "unbalanced.cpp", "int main( { return 0; }");
    let output = dir.path().join("unbalanced.o");

    flashcppc_bin()
        .arg("--target-linux")
        .arg("-o")
        .arg(&output)
        .arg(&input)
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("error"));

    assert!(!output.exists());
}

#[test]
fn reports_an_undeclared_identifier_as_a_name_error() {
    let dir = TempDir::new().expect("temp dir");
    let input = write_source(&dir, "undeclared.cpp", "int main() { return undeclared_name; }");
    let output = dir.path().join("undeclared.o");

    flashcppc_bin()
        .arg("--target-linux")
        .arg("-o")
        .arg(&output)
        .arg(&input)
        .assert()
        .failure()
        .code(1);

    assert!(!output.exists());
}

/// §8 Determinism: compiling the same input twice produces byte-identical
/// object files.
#[test]
fn compilation_is_deterministic() {
    let dir = TempDir::new().expect("temp dir");
    let input = write_source(
        &dir,
        "add.cpp",
        "int add(int a, int b) { return a + b; } int main() { return add(1, 2); }",
    );
    let first = dir.path().join("first.o");
    let second = dir.path().join("second.o");

    flashcppc_bin().arg("--target-linux").arg("-o").arg(&first).arg(&input).assert().success();
    flashcppc_bin().arg("--target-linux").arg("-o").arg(&second).arg(&input).assert().success();

    let a = std::fs::read(&first).expect("read first object");
    let b = std::fs::read(&second).expect("read second object");
    assert_eq!(a, b);
}
