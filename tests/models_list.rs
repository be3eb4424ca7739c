use assert_cmd::prelude::*;
use std::fs;
use std::process::Command;

#[test]
fn models_list_includes_catalog_and_overrides() {
    let temp = tempfile::tempdir().unwrap();
    let xdg_config_home = temp.path().join(".config");
    std::fs::create_dir_all(xdg_config_home.join("piecewise")).unwrap();
    let cfg = r#"
[model_overrides]
"house-model" = { context_window = 12000 }
"gpt-4" = { context_window = 9000 }
"#;
    fs::write(xdg_config_home.join("piecewise").join("config.toml"), cfg).unwrap();

    let mut cmd = Command::cargo_bin("piecewise").unwrap();
    cmd.env("XDG_CONFIG_HOME", &xdg_config_home)
        .args(["models", "--json"]);
    let out = cmd.assert().success().get_output().stdout.clone();
    let stdout = String::from_utf8_lossy(&out);

    let v: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    let arr = v.as_array().unwrap();
    let find = |name: &str| arr.iter().find(|m| m.get("name").and_then(|x| x.as_str()) == Some(name)).cloned();

    let big = find("gpt-4-32k").unwrap();
    assert_eq!(big["context_window"], 32768);
    assert_eq!(big["source"], "catalog");

    let house = find("house-model").unwrap();
    assert_eq!(house["context_window"], 12000);
    assert_eq!(house["source"], "config");

    let gpt4: Vec<_> = arr.iter().filter(|m| m["name"] == "gpt-4").collect();
    assert_eq!(gpt4.len(), 1);
    assert_eq!(gpt4[0]["context_window"], 9000);
}
