//! CLI integration tests for tugblock commands

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

fn tugblock_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_tugblock"))
}

fn run(dir: &Path, args: &[&str]) -> Output {
    Command::new(tugblock_binary())
        .args(args)
        .current_dir(dir)
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run tugblock")
}

fn stdout_json(output: &Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).expect("stdout is not JSON")
}

const BUILD_SCRIPT: &str = r#"[
    {"command": "add_block", "block": {"kind": "if", "params": {"conditions": [{"left": "x", "op": ">", "right": "0"}]}}},
    {"command": "add_block", "block": {"kind": "code", "params": {"text": "print(x)"}}},
    {"command": "add_block", "block": {"kind": "code", "params": {"text": "print('done')"}}},
    {"command": "attach", "parent": 1, "edge": "indent", "child": 3},
    {"command": "attach", "parent": 1, "edge": "down", "child": 4}
]"#;

/// Create a temp directory holding `doc.json` built from [`BUILD_SCRIPT`].
fn setup_document() -> tempfile::TempDir {
    let temp = tempfile::tempdir().expect("failed to create temp dir");
    fs::write(temp.path().join("build.json"), BUILD_SCRIPT).expect("failed to write script");

    let output = run(
        temp.path(),
        &["apply", "doc.json", "--commands", "build.json"],
    );
    assert!(
        output.status.success(),
        "apply failed: {}",
        String::from_utf8_lossy(&output.stdout)
    );
    temp
}

#[test]
fn test_apply_reports_outcomes() {
    let temp = tempfile::tempdir().unwrap();
    fs::write(temp.path().join("build.json"), BUILD_SCRIPT).unwrap();
    let output = run(
        temp.path(),
        &["apply", "doc.json", "--commands", "build.json"],
    );
    assert!(output.status.success());

    let json = stdout_json(&output);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["outcomes"][0]["outcome"], "created");
    assert_eq!(json["outcomes"][0]["id"], 1);
    assert_eq!(json["outcomes"][3]["outcome"], "linked");
    assert!(temp.path().join("doc.json").exists());
}

#[test]
fn test_emit_to_stdout() {
    let temp = setup_document();
    let output = run(temp.path(), &["emit", "doc.json"]);
    assert!(output.status.success());
    assert_eq!(
        String::from_utf8_lossy(&output.stdout),
        "# Auto-Generated by tugblock\nif (x > 0) :\n    print(x)\nprint('done')\n"
    );
}

#[test]
fn test_emit_respects_config_file() {
    let temp = setup_document();
    fs::write(
        temp.path().join("tugblock.toml"),
        "[emit]\nindent = \"\\t\"\nheader = \"\"\n",
    )
    .unwrap();
    let output = run(temp.path(), &["emit", "doc.json", "--output", "out.py"]);
    assert!(output.status.success());
    let text = fs::read_to_string(temp.path().join("out.py")).unwrap();
    assert_eq!(text, "if (x > 0) :\n\tprint(x)\nprint('done')\n");
}

#[test]
fn test_check_reports_diagnostics() {
    let temp = setup_document();
    fs::write(
        temp.path().join("edit.json"),
        r#"[{"command": "edit", "block": 3, "kind": {"kind": "code", "params": {"text": ""}}}]"#,
    )
    .unwrap();
    assert!(run(temp.path(), &["apply", "doc.json", "--commands", "edit.json"])
        .status
        .success());

    let output = run(temp.path(), &["check", "doc.json"]);
    assert!(output.status.success());
    let json = stdout_json(&output);
    assert_eq!(json["block_count"], 3);
    assert_eq!(json["diagnostics"][0]["kind"], "incomplete");
    assert_eq!(json["diagnostics"][0]["block"], 3);
}

#[test]
fn test_renumber_in_emission_order() {
    let temp = setup_document();
    let output = run(temp.path(), &["renumber", "doc.json"]);
    assert!(output.status.success());
    let json = stdout_json(&output);
    assert_eq!(json["mode"], "sequential");
    let ids: Vec<u64> = json["numbers"]
        .as_array()
        .unwrap()
        .iter()
        .map(|n| n["id"].as_u64().unwrap())
        .collect();
    assert_eq!(ids, vec![1, 3, 4]);
    assert_eq!(json["numbers"][1]["depth"], 1);
}

#[test]
fn test_missing_document_exit_code() {
    let temp = tempfile::tempdir().unwrap();
    let output = run(temp.path(), &["emit", "absent.json"]);
    assert_eq!(output.status.code(), Some(2));
    let json = stdout_json(&output);
    assert_eq!(json["status"], "error");
    assert_eq!(json["error"]["code"], 2);
}

#[test]
fn test_structural_error_exit_code() {
    let temp = setup_document();
    fs::write(
        temp.path().join("bad.json"),
        r#"[{"command": "attach", "parent": 3, "edge": "indent", "child": 4}]"#,
    )
    .unwrap();
    let before = fs::read_to_string(temp.path().join("doc.json")).unwrap();

    let output = run(temp.path(), &["apply", "doc.json", "--commands", "bad.json"]);
    assert_eq!(output.status.code(), Some(3));
    assert_eq!(stdout_json(&output)["error"]["code"], 3);
    assert_eq!(fs::read_to_string(temp.path().join("doc.json")).unwrap(), before);
}

#[test]
fn test_malformed_document_exit_code() {
    let temp = tempfile::tempdir().unwrap();
    fs::write(temp.path().join("doc.json"), "{\"schemaVersion\": 99, \"roots\": []}").unwrap();
    let output = run(temp.path(), &["check", "doc.json"]);
    assert_eq!(output.status.code(), Some(4));
}
