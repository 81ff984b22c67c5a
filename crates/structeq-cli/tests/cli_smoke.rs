use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

fn fixture(kind: &str, name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../structeq-core/tests/fixtures")
        .join(kind)
        .join(name)
}

fn write_tempfile(contents: &str, suffix: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().expect("create tempfile");
    write!(file, "{contents}").expect("write tempfile");
    file
}

fn structeq() -> Command {
    let mut cmd = Command::cargo_bin("structeq").expect("binary structeq should be built");
    cmd.env_remove("STRUCTEQ_LOG");
    cmd
}

#[test]
fn help_succeeds() {
    structeq()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage: structeq [OPTIONS] FILE1 [FILE2]"))
        .stdout(predicate::str::contains("Exit status"));
}

#[test]
fn version_is_printed() {
    structeq()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("structeq "));
}

#[test]
fn reordered_documents_are_equal() {
    structeq()
        .arg(fixture("json", "stations.json"))
        .arg(fixture("json", "stations_reordered.json"))
        .assert()
        .code(0)
        .stdout("equal\n")
        .stderr(predicate::str::is_empty());
}

#[test]
fn edited_document_is_not_equal() {
    structeq()
        .arg(fixture("xml", "countries.xml"))
        .arg(fixture("xml", "countries_direction_changed.xml"))
        .assert()
        .code(1)
        .stdout("not equal\n");
}

#[test]
fn second_input_defaults_to_stdin() {
    let full = fs::read_to_string(fixture("xml", "countries.xml")).unwrap();
    structeq()
        .args(["--query", "country"])
        .arg(fixture("xml", "countries_subset.xml"))
        .write_stdin(full)
        .assert()
        .code(0)
        .stdout("equal\n");
}

#[test]
fn report_lists_missing_fingerprints() {
    let output = structeq()
        .args(["--report", "--query", "$..stations"])
        .arg(fixture("json", "two_stations_regular_virtual.json"))
        .arg(fixture("json", "two_stations_scanning_virtual.json"))
        .assert()
        .code(1)
        .get_output()
        .stdout
        .clone();
    let report: Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(report["left"].as_array().unwrap().len(), 2);
    assert_eq!(report["missing"].as_array().unwrap().len(), 1);
    assert_eq!(report["missing"][0], report["left"][0]);
}

#[test]
fn select_prints_each_subtree() {
    let doc = write_tempfile(r#"<data><c n="1"><r>1</r></c><c n="2"/></data>"#, ".xml");
    structeq()
        .args(["--select", "--query", "c", "--pretty"])
        .arg(doc.path())
        .assert()
        .success()
        .stdout("<c n=\"1\">\n  <r>1</r>\n</c>\n<c n=\"2\" />\n");
}

#[test]
fn render_pretty_prints_json() {
    let doc = write_tempfile(r#"{"a":[1,2]}"#, ".json");
    structeq()
        .args(["--render", "--pretty"])
        .arg(doc.path())
        .assert()
        .success()
        .stdout("{\n  \"a\": [\n    1,\n    2\n  ]\n}\n");
}

#[test]
fn fingerprint_matches_pinned_digest() {
    let doc = write_tempfile(r#"{"b": [2, 1], "a": null}"#, ".json");
    structeq()
        .arg("--fingerprint")
        .arg(doc.path())
        .assert()
        .success()
        .stdout("defe53c9ce929c863a2f8b130b364568bd2e227dcea17ac5026d156346251123\n");
}

#[test]
fn explicit_format_overrides_detection() {
    let a = write_tempfile("items:\n  - 1\n  - 2\n", ".txt");
    let b = write_tempfile("items: [2, 1]\n", ".txt");
    structeq()
        .args(["--format", "yaml"])
        .arg(a.path())
        .arg(b.path())
        .assert()
        .code(0)
        .stdout("equal\n");
}

#[test]
fn malformed_input_exits_with_error() {
    let bad = write_tempfile("<a><b></a>", ".xml");
    let good = write_tempfile("<a/>", ".xml");
    structeq()
        .arg(bad.path())
        .arg(good.path())
        .assert()
        .code(2)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::starts_with("error: failed to compare"));
}

#[test]
fn malformed_query_exits_with_error() {
    structeq()
        .args(["--query", "/data"])
        .arg(fixture("xml", "countries.xml"))
        .arg(fixture("xml", "countries.xml"))
        .assert()
        .code(2)
        .stderr(predicate::str::contains("error:"));
}

#[test]
fn config_depth_limit_is_enforced() {
    let config = write_tempfile("max_depth: 1\n", ".yaml");
    let doc = write_tempfile(r#"{"a": {"b": 1}}"#, ".json");
    structeq()
        .arg("--config")
        .arg(config.path())
        .arg(doc.path())
        .arg(doc.path())
        .assert()
        .code(2)
        .stderr(predicate::str::contains("nesting exceeds"));
}

#[test]
fn inspection_modes_take_one_input() {
    structeq()
        .arg("--fingerprint")
        .arg(fixture("json", "stations.json"))
        .arg(fixture("json", "stations.json"))
        .assert()
        .code(2)
        .stderr(predicate::str::contains("single input"));
}

#[test]
fn json_logs_go_to_stderr() {
    structeq()
        .args(["-vv", "--log-format", "json"])
        .arg(fixture("json", "stations.json"))
        .arg(fixture("json", "stations_reordered.json"))
        .assert()
        .code(0)
        .stdout("equal\n")
        .stderr(predicate::str::contains("\"level\":\"DEBUG\""));
}
