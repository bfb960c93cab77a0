mod common;

use common::{BASE_MTIME, assemble, flatsnap_cmd, set_mtime, write_file};
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

#[test]
fn assemble_writes_blocks_and_metadata() {
    let temp = TempDir::new().unwrap();
    write_file(temp.path(), "src/main.rs", "fn main() {}\n");
    write_file(temp.path(), "src/lib/util.rs", "pub fn util() {}\n");
    write_file(temp.path(), "src/notes.txt", "not selected\n");

    assemble(temp.path(), &["src", "-e", "rs", "-o", "out.md"]);

    let document = fs::read_to_string(temp.path().join("out.md")).unwrap();
    assert!(document.contains("## `main.rs`"));
    assert!(document.contains("## `lib/util.rs`"));
    assert!(document.contains("```rust\npub fn util() {}\n\n```"));
    assert!(!document.contains("notes.txt"));
    assert!(document.contains("<!-- SNAPSHOT_METADATA\n"));
    assert!(document.trim_end().ends_with("-->"));
}

#[test]
fn assemble_defaults_to_codebase_md_in_current_directory() {
    let temp = TempDir::new().unwrap();
    write_file(temp.path(), "app.py", "print('hi')\n");

    flatsnap_cmd(temp.path())
        .args(["assemble", "-e", "py"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    let document = fs::read_to_string(temp.path().join("codebase.md")).unwrap();
    assert!(document.contains("## `app.py`"));
}

#[test]
fn assemble_without_extensions_fails() {
    let temp = TempDir::new().unwrap();

    flatsnap_cmd(temp.path())
        .arg("assemble")
        .assert()
        .code(255)
        .stderr(predicate::str::contains("No extensions specified"));

    assert!(!temp.path().join("codebase.md").exists());
}

#[test]
fn assemble_with_unknown_config_key_fails() {
    let temp = TempDir::new().unwrap();
    fs::write(
        temp.path().join("flatsnap.toml"),
        "paths = [\".\"]\nextensions = [\"rs\"]\nverbose = true\n",
    )
    .unwrap();

    flatsnap_cmd(temp.path())
        .args(["assemble", "--config", "flatsnap.toml"])
        .assert()
        .code(255)
        .stderr(predicate::str::contains("unknown field"));
}

#[test]
fn saved_config_reproduces_the_run() {
    let temp = TempDir::new().unwrap();
    write_file(temp.path(), "src/main.rs", "fn main() {}\n");
    write_file(temp.path(), "src/fixtures/sample.rs", "// fixture\n");

    assemble(
        temp.path(),
        &["src", "-e", "rs", "-x", "fixtures", "--save-config", "flatsnap.toml"],
    );

    let saved = fs::read_to_string(temp.path().join("flatsnap.toml")).unwrap();
    assert!(saved.contains("fixtures"));

    assemble(temp.path(), &["--config", "flatsnap.toml", "-o", "again.md"]);
    let document = fs::read_to_string(temp.path().join("again.md")).unwrap();
    assert!(document.contains("## `main.rs`"));
    assert!(!document.contains("sample.rs"));
}

#[test]
fn default_excludes_can_be_turned_off() {
    let temp = TempDir::new().unwrap();
    write_file(temp.path(), "app.py", "a = 1\n");
    write_file(temp.path(), "build/generated.py", "b = 2\n");

    assemble(temp.path(), &["-e", "py", "-o", "default.md"]);
    let document = fs::read_to_string(temp.path().join("default.md")).unwrap();
    assert!(!document.contains("generated.py"));

    assemble(
        temp.path(),
        &["-e", "py", "--no-default-excludes", "-o", "all.md"],
    );
    let document = fs::read_to_string(temp.path().join("all.md")).unwrap();
    assert!(document.contains("## `build/generated.py`"));
}

#[test]
fn since_snapshot_contains_only_changed_files() {
    let temp = TempDir::new().unwrap();
    write_file(temp.path(), "a/config.py", "X");
    let b = write_file(temp.path(), "b/config.py", "Y");

    assemble(temp.path(), &["-e", "py", "-o", "base.md"]);

    fs::write(&b, "Y2").unwrap();
    set_mtime(&b, BASE_MTIME + 120);

    assemble(
        temp.path(),
        &["-e", "py", "--since", "base.md", "-o", "changes.md"],
    );

    let document = fs::read_to_string(temp.path().join("changes.md")).unwrap();
    assert!(document.contains("## Changes Since Last Snapshot"));
    assert!(document.contains("## `b/config.py`"));
    assert!(!document.contains("## `a/config.py`"));
}

#[test]
fn large_files_are_truncated_with_marker() {
    let temp = TempDir::new().unwrap();
    let body: String = (0..2000).map(|i| format!("row {i}\n")).collect();
    write_file(temp.path(), "data.csv", &body);

    assemble(
        temp.path(),
        &["-e", "csv", "--max-size", "0.001", "-o", "out.md"],
    );

    let document = fs::read_to_string(temp.path().join("out.md")).unwrap();
    assert!(document.contains("[TRUNCATED]"));
    assert!(document.contains("row 499\n"));
    assert!(!document.contains("row 500\n"));
}

#[test]
fn excludes_lists_default_patterns() {
    let temp = TempDir::new().unwrap();

    flatsnap_cmd(temp.path())
        .arg("excludes")
        .assert()
        .success()
        .stdout(predicate::str::contains("node_modules\n"))
        .stdout(predicate::str::contains("__pycache__\n"))
        .stdout(predicate::str::contains("target\n"));
}

#[test]
fn assemble_adds_readmes_as_context() {
    let temp = TempDir::new().unwrap();
    write_file(temp.path(), "README.md", "# Demo project\n");
    write_file(temp.path(), "src/main.rs", "fn main() {}\n");

    assemble(temp.path(), &["-e", "rs", "-o", "out.md"]);
    let document = fs::read_to_string(temp.path().join("out.md")).unwrap();
    assert!(document.contains("## Project Context\n\n### From README.md\n"));
    assert!(document.contains("| Max depth | 0 |"));
    assert!(document.contains("| Largest file | `main.rs` (13 B) |"));

    assemble(temp.path(), &["-e", "rs", "-o", "out.md", "--no-readmes"]);
    let document = fs::read_to_string(temp.path().join("out.md")).unwrap();
    assert!(!document.contains("Demo project"));
}
