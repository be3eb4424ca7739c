use assert_cmd::Command;
use std::fs;

fn assert_json_error(assert: &assert_cmd::assert::Assert, code: &str) {
    let out = assert.get_output();
    assert_eq!(out.status.success(), false);
    let stdout = String::from_utf8_lossy(&out.stdout);
    let v: serde_json::Value = serde_json::from_str(&stdout).expect("valid json error");
    assert_eq!(v.get("code").and_then(|c| c.as_str()), Some(code), "stdout: {}", stdout);
    assert!(v.get("message").is_some());
}

fn piecewise(temp: &tempfile::TempDir) -> Command {
    let mut cmd = Command::cargo_bin("piecewise").unwrap();
    cmd.env("XDG_CONFIG_HOME", temp.path())
        .env_remove("LLM_MODEL")
        .env_remove("OPENAI_API_KEY")
        .env_remove("OPENAI_API_BASE");
    cmd
}

#[test]
fn slice_missing_file_json_error() {
    let temp = tempfile::tempdir().unwrap();
    let assert = piecewise(&temp)
        .args(["slice", "--provider", "mock", "--file", "missing.txt", "--json"])
        .assert();
    assert_json_error(&assert, "file_not_found");
}

#[test]
fn slice_whitespace_document_json_error() {
    let temp = tempfile::tempdir().unwrap();
    let file = temp.path().join("blank.txt");
    fs::write(&file, "  \n\t \n").unwrap();
    let assert = piecewise(&temp)
        .args(["slice", "--provider", "mock", "--file", file.to_str().unwrap(), "--json"])
        .assert();
    assert_json_error(&assert, "missing_input");
}

#[test]
fn unknown_model_json_error() {
    let temp = tempfile::tempdir().unwrap();
    let assert = piecewise(&temp)
        .args(["slice", "--provider", "mock", "--model", "mystery-model", "--json"])
        .write_stdin("some text")
        .assert();
    assert_json_error(&assert, "model_not_found");
}

#[test]
fn model_below_minimum_tier_json_error() {
    let temp = tempfile::tempdir().unwrap();
    let assert = piecewise(&temp)
        .args(["slice", "--provider", "openai", "--model", "gpt-3.5-turbo", "--json"])
        .write_stdin("some text")
        .assert();
    assert_json_error(&assert, "model_unsupported");
}

#[test]
fn openai_without_key_json_error() {
    let temp = tempfile::tempdir().unwrap();
    let assert = piecewise(&temp)
        .args(["slice", "--provider", "openai", "--model", "gpt-4", "--json"])
        .write_stdin("some text")
        .assert();
    assert_json_error(&assert, "missing_api_key");
}

#[test]
fn prompt_overhead_exhausts_budget_json_error() {
    let temp = tempfile::tempdir().unwrap();
    let assert = piecewise(&temp)
        .args(["slice", "--provider", "mock", "--window", "2049", "--divisor", "64", "--json"])
        .write_stdin("some text")
        .assert();
    assert_json_error(&assert, "budget_exhausted");
}

#[test]
fn divisor_below_two_json_error() {
    let temp = tempfile::tempdir().unwrap();
    let assert = piecewise(&temp)
        .args(["plan", "--provider", "mock", "--divisor", "1", "--json"])
        .write_stdin("some text")
        .assert();
    assert_json_error(&assert, "invalid_config");
}

#[test]
fn unsupported_provider_json_error() {
    let temp = tempfile::tempdir().unwrap();
    let assert = piecewise(&temp)
        .args(["slice", "--provider", "carrier-pigeon", "--json"])
        .write_stdin("some text")
        .assert();
    assert_json_error(&assert, "invalid_config");
}
