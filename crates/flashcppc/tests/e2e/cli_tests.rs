//! CLI surface tests (§6.1): help/version, compiling a file, custom output
//! paths, per-target object formats, and the closed flag set's rejections.

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
fn help_lists_the_closed_flag_set() {
    flashcppc_bin()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--target-linux"))
        .stdout(predicate::str::contains("--target-windows"));
}

#[test]
fn version_succeeds() {
    flashcppc_bin().arg("--version").assert().success();
}

#[test]
fn compiles_a_minimal_translation_unit_to_an_object_file() {
    let dir = TempDir::new().expect("temp dir");
    let input = write_source(&dir, "empty_main.cpp", "int main() { }");
    let output = dir.path().join("empty_main.o");

    flashcppc_bin()
        .args(["--target-linux", "-o"])
        .arg(&output)
        .arg(&input)
        .assert()
        .success();

    assert!(output.exists(), "object file should have been written");
    let bytes = std::fs::read(&output).expect("read object file");
    assert_eq!(&bytes[0..4], &[0x7f, b'E', b'L', b'F']);
}

#[test]
fn defaults_output_path_to_input_basename_with_object_suffix() {
    let dir = TempDir::new().expect("temp dir");
    let input = write_source(&dir, "returns_zero.cpp", "int main() { return 0; }");

    flashcppc_bin()
        .arg("--target-linux")
        .arg(&input)
        .current_dir(dir.path())
        .assert()
        .success();

    assert!(dir.path().join("returns_zero.o").exists());
}

#[test]
fn windows_target_defaults_to_the_obj_suffix() {
    let dir = TempDir::new().expect("temp dir");
    let input = write_source(&dir, "returns_zero.cpp", "int main() { return 0; }");

    flashcppc_bin()
        .arg("--target-windows")
        .arg(&input)
        .current_dir(dir.path())
        .assert()
        .success();

    let bytes = std::fs::read(dir.path().join("returns_zero.obj")).expect("read object file");
    assert_eq!(&bytes[0..2], &0x8664u16.to_le_bytes());
}

#[test]
fn rejects_a_std_value_other_than_cpp20() {
    let dir = TempDir::new().expect("temp dir");
    let input = write_source(&dir, "empty_main.cpp", "int main() { }");

    flashcppc_bin()
        .arg("--std=c++17")
        .arg(&input)
        .assert()
        .failure()
        .code(3);
}

#[test]
fn rejects_custom_output_path_with_multiple_inputs() {
    let dir = TempDir::new().expect("temp dir");
    let a = write_source(&dir, "a.cpp", "int main() { }");
    let b = write_source(&dir, "b.cpp", "int f() { return 0; }");

    flashcppc_bin()
        .arg("-o")
        .arg(dir.path().join("out.o"))
        .arg(&a)
        .arg(&b)
        .assert()
        .failure()
        .code(3);
}

#[test]
fn missing_input_file_is_an_io_error() {
    let dir = TempDir::new().expect("temp dir");

    flashcppc_bin()
        .arg(dir.path().join("does_not_exist.cpp"))
        .assert()
        .failure()
        .code(2);
}
