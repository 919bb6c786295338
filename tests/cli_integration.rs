// CLI integration tests for `repr canon` and `repr check`.
use std::io::Write;
use std::process::{Command, Output, Stdio};

use serde_json::Value;

fn cmd() -> Command {
    let exe = env!("CARGO_BIN_EXE_repr");
    Command::new(exe)
}

fn parse_json_line(output: &[u8]) -> Value {
    let text = String::from_utf8_lossy(output);
    let line = text.lines().next().expect("json line");
    serde_json::from_str(line).expect("valid json")
}

fn run_with_stdin(args: &[&str], stdin: &str) -> Output {
    let mut child = cmd()
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn");
    child
        .stdin
        .take()
        .expect("stdin")
        .write_all(stdin.as_bytes())
        .expect("write stdin");
    child.wait_with_output().expect("output")
}

#[test]
fn canon_reads_file_and_prints_compact_encoding() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = temp.path().join("doc.json");
    std::fs::write(&path, "[ [ 1, 2 ] ,\n [ ] ]\n").expect("write");

    let output = cmd()
        .args([
            "canon",
            "--type",
            "List<List<Long>>",
            "--input",
            path.to_str().expect("utf8 path"),
        ])
        .output()
        .expect("canon");
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "[[1,2],[]]");
}

#[test]
fn canon_reads_stdin() {
    let output = run_with_stdin(&["canon", "--type", "List<String>"], r#"[ "a" , "bA" ]"#);
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), r#"["a","bA"]"#);
}

#[test]
fn check_reports_canonical_type() {
    let output = cmd()
        .args(["check", "--type", "Map<String,List<Date>>"])
        .output()
        .expect("check");
    assert!(output.status.success());
    let json = parse_json_line(&output.stdout);
    assert_eq!(json["type"], "Map<String, List<Date>>");
    assert_eq!(json["status"], "ok");
}

#[test]
fn malformed_input_is_protocol_error_on_stderr() {
    let output = run_with_stdin(&["canon", "--type", "List<Long>"], "[1 2]");
    assert_eq!(output.status.code(), Some(3));
    let json = parse_json_line(&output.stderr);
    assert_eq!(json["error"]["kind"], "Protocol");
    assert!(json["error"]["offset"].as_u64().is_some());
}

#[test]
fn arity_error_is_configuration_exit_code() {
    let output = cmd()
        .args(["check", "--type", "List<String, Long>"])
        .output()
        .expect("check");
    assert_eq!(output.status.code(), Some(4));
    let json = parse_json_line(&output.stderr);
    assert_eq!(json["error"]["kind"], "Configuration");
}

#[test]
fn fractional_long_is_semantic_error() {
    let output = run_with_stdin(&["canon", "--type", "Long"], "1.5");
    assert_eq!(output.status.code(), Some(6));
    let json = parse_json_line(&output.stderr);
    assert_eq!(json["error"]["kind"], "Semantic");
}

#[test]
fn depth_limit_is_configurable() {
    let doc = "[[[1]]]";
    let ok = run_with_stdin(&["canon", "--type", "List<List<List<Long>>>"], doc);
    assert!(ok.status.success());
    let limited = run_with_stdin(
        &["canon", "--type", "List<List<List<Long>>>", "--max-depth", "2"],
        doc,
    );
    assert_eq!(limited.status.code(), Some(3));
}

#[test]
fn missing_input_file_is_io_error() {
    let temp = tempfile::tempdir().expect("tempdir");
    let missing = temp.path().join("missing.json");
    let output = cmd()
        .args([
            "canon",
            "--type",
            "Long",
            "--input",
            missing.to_str().expect("utf8 path"),
        ])
        .output()
        .expect("canon");
    assert_eq!(output.status.code(), Some(7));
    let json = parse_json_line(&output.stderr);
    assert_eq!(json["error"]["kind"], "Io");
    assert!(json["error"]["causes"].as_array().is_some());
}

#[test]
fn usage_exit_code() {
    let output = cmd().args(["canon"]).output().expect("canon");
    assert_eq!(output.status.code(), Some(2));
    let json = parse_json_line(&output.stderr);
    assert_eq!(json["error"]["kind"], "Usage");
}

#[test]
fn help_states_class_types_are_unavailable() {
    let output = cmd().args(["--help"]).output().expect("help");
    assert!(output.status.success());
    let text = String::from_utf8_lossy(&output.stdout);
    assert!(text.contains("primitive and container types only"), "{text}");

    let output = cmd().args(["canon", "--help"]).output().expect("canon help");
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("Primitive or container"));
}

#[test]
fn class_types_are_configuration_errors() {
    let output = cmd()
        .args(["check", "--type", "Person"])
        .output()
        .expect("check");
    assert_eq!(output.status.code(), Some(4));
    let json = parse_json_line(&output.stderr);
    assert_eq!(json["error"]["kind"], "Configuration");
}
