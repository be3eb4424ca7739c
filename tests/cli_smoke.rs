use assert_cmd::Command;
use predicates::prelude::PredicateBooleanExt;
use predicates::str::contains;

#[test]
fn prints_help() {
    let mut cmd = Command::cargo_bin("piecewise").unwrap();
    cmd.arg("--help");
    cmd.assert().success().stdout(contains("token-budgeted chunks"));
}

#[test]
fn unknown_subcommand_fails() {
    let mut cmd = Command::cargo_bin("piecewise").unwrap();
    cmd.arg("shred");
    cmd.assert().failure().stderr(contains("Usage:"));
}

#[test]
fn slice_short_stdin_with_mock_prints_one_chunk() {
    let temp = tempfile::tempdir().unwrap();
    let mut cmd = Command::cargo_bin("piecewise").unwrap();
    cmd.env("XDG_CONFIG_HOME", temp.path())
        .env_remove("LLM_MODEL")
        .args(["slice", "--provider", "mock"])
        .write_stdin("  A short note that fits easily.  \n");
    cmd.assert()
        .success()
        .stdout(contains("--- chunk 1 ---"))
        .stdout(contains("A short note that fits easily."))
        .stdout(contains("--- chunk 2 ---").not());
}
