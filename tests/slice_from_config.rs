use assert_cmd::Command;
use std::fs;

#[test]
fn slice_uses_provider_and_slicing_from_config_profile() {
    let temp = tempfile::tempdir().unwrap();
    let xdg_config_home = temp.path().join(".config");
    std::fs::create_dir_all(xdg_config_home.join("piecewise")).unwrap();
    let cfg_path = xdg_config_home.join("piecewise").join("config.toml");
    fs::write(
        &cfg_path,
        r#"
default_profile = "default"

[profiles.default]
provider = "mock"
model = "gpt-4-32k"

[slicing]
divisor = 16
padding_tokens = 64
"#,
    )
    .unwrap();

    let mut cmd = Command::cargo_bin("piecewise").unwrap();
    cmd.env("XDG_CONFIG_HOME", &xdg_config_home)
        .env_remove("LLM_MODEL")
        .args(["slice", "--json"])
        .write_stdin("Hello there. This is short.");
    let out = cmd.assert().success().get_output().stdout.clone();
    let v: serde_json::Value = serde_json::from_str(&String::from_utf8_lossy(&out)).unwrap();
    assert_eq!(v["model"], "gpt-4-32k");
    assert_eq!(v["window"], 32768);
}

#[test]
fn config_override_admits_custom_model() {
    let temp = tempfile::tempdir().unwrap();
    let xdg_config_home = temp.path().join(".config");
    std::fs::create_dir_all(xdg_config_home.join("piecewise")).unwrap();
    fs::write(
        xdg_config_home.join("piecewise").join("config.toml"),
        r#"
[profiles.default]
provider = "mock"
model = "house-model"

[model_overrides]
"house-model" = { context_window = 6000 }
"#,
    )
    .unwrap();

    let mut cmd = Command::cargo_bin("piecewise").unwrap();
    cmd.env("XDG_CONFIG_HOME", &xdg_config_home)
        .env_remove("LLM_MODEL")
        .args(["plan", "--json"])
        .write_stdin("Some text to plan for.");
    let out = cmd.assert().success().get_output().stdout.clone();
    let v: serde_json::Value = serde_json::from_str(&String::from_utf8_lossy(&out)).unwrap();
    assert_eq!(v["window"], 6000);
    assert_eq!(v["window_source"], "config_override");
}
