//! Integration tests for the `causeway` command line.

use std::io::{Cursor, Write};

use causeway::Outcome;
use causeway::config::{Command, Config};
use causeway::error::CliError;
use clap::Parser;
use serde_json::Value;
use tempfile::NamedTempFile;

const VALID: &str = concat!(
    r#"{"exception_id":"paymentDeclined","description":"The card was declined.","#,
    r#""data":{"reason":"expired"}}"#
);
const MISSING_DATA: &str =
    r#"{"exception_id":"paymentDeclined","description":"The card was declined."}"#;

fn body_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

fn command(args: &[&str]) -> Command {
    let config = Config::try_parse_from(std::iter::once("causeway").chain(args.iter().copied()))
        .unwrap();
    config.command
}

fn run(command: &Command, stdin: &str) -> (Result<Outcome, CliError>, String) {
    let mut out = Vec::new();
    let result = causeway::run(command, &mut Cursor::new(stdin.as_bytes()), &mut out);
    (result, String::from_utf8(out).unwrap())
}

// ---------------------------------------------------------------------------
// schema
// ---------------------------------------------------------------------------

#[test]
fn schema_prints_the_document() {
    let (result, out) = run(&command(&["schema"]), "");
    assert_eq!(result.unwrap(), Outcome::Success);

    let schema: Value = serde_json::from_str(&out).unwrap();
    assert_eq!(schema["title"], "HttpExceptionBody");
    assert_eq!(schema["additionalProperties"], false);
}

// ---------------------------------------------------------------------------
// validate
// ---------------------------------------------------------------------------

#[test]
fn valid_files_succeed() {
    let file = body_file(VALID);
    let path = file.path().to_str().unwrap();
    let (result, out) = run(&command(&["validate", path, "--status", "402"]), "");
    assert_eq!(result.unwrap(), Outcome::Success);
    assert_eq!(out, format!("{path}: ok (paymentDeclined, status 402)\n"));

    let (_, out) = run(&command(&["validate", "--json", "--status", "402"]), VALID);
    let report: Value = serde_json::from_str(&out).unwrap();
    assert_eq!(report[0]["status"], 402);
}

#[test]
fn any_invalid_file_fails() {
    let good = body_file(VALID);
    let bad = body_file(MISSING_DATA);
    let (result, out) = run(
        &command(&[
            "validate",
            good.path().to_str().unwrap(),
            bad.path().to_str().unwrap(),
        ]),
        "",
    );
    assert_eq!(result.unwrap(), Outcome::Invalid);
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[1].contains("invalid: "));
    assert!(lines[1].contains("`data`"));
}

#[test]
fn reads_stdin_without_files() {
    let (result, out) = run(&command(&["validate"]), VALID);
    assert_eq!(result.unwrap(), Outcome::Success);
    assert!(out.starts_with("<stdin>: ok"));

    let (result, _) = run(&command(&["validate", "-"]), "not json");
    assert_eq!(result.unwrap(), Outcome::Invalid);
}

#[test]
fn json_report() {
    let bad = body_file(r#"{"exception_id":"Bad","description":"x","data":{}}"#);
    let (result, out) = run(
        &command(&["validate", "--json", bad.path().to_str().unwrap()]),
        "",
    );
    assert_eq!(result.unwrap(), Outcome::Invalid);

    let report: Value = serde_json::from_str(&out).unwrap();
    let entry = &report.as_array().unwrap()[0];
    assert_eq!(entry["valid"], false);
    assert!(entry.get("exception_id").is_none());
    assert!(entry["error"].as_str().unwrap().contains("Bad"));
}

#[test]
fn non_error_status_is_rejected_before_reading() {
    let (result, out) = run(&command(&["validate", "--status", "200"]), VALID);
    assert!(matches!(result, Err(CliError::NotAnErrorStatus(200))));
    assert!(out.is_empty());
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("absent.json");
    let (result, _) = run(&command(&["validate", missing.to_str().unwrap()]), "");
    assert!(matches!(result, Err(CliError::Io { .. })));
}
