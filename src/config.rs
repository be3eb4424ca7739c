use crate::budget::{DEFAULT_DIVISOR, DEFAULT_PADDING_TOKENS};
use crate::catalog::DEFAULT_MODEL;
use anyhow::{Context, Result};
use dirs::config_dir;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::{env, fs, path::{Path, PathBuf}};

pub const APP_DIR_NAME: &str = "piecewise";
pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const DEFAULT_PROVIDER: &str = "openai";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Boundary-finding instructions shipped with the binary.
pub const BUNDLED_PROMPT: &str = include_str!("../prompts/last_semantic_boundary.txt");

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    pub default_profile: Option<String>,
    #[serde(default)]
    pub profiles: BTreeMap<String, Profile>,
    #[serde(default)]
    pub slicing: SlicingSettings,
    /// Context windows for models outside the built-in catalog, keyed by model id.
    #[serde(default)]
    pub model_overrides: BTreeMap<String, ModelOverride>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Profile {
    pub provider: Option<String>,
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub api_base: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SlicingSettings {
    pub divisor: Option<u32>,
    pub padding_tokens: Option<u32>,
    pub max_retries: Option<u64>,
    pub prompt_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ModelOverride {
    pub context_window: Option<u32>,
}

impl AppConfig {
    pub fn find_model_override(&self, model: &str) -> Option<&ModelOverride> {
        self.model_overrides.get(model)
    }
}

pub fn default_config_path() -> Result<PathBuf> {
    let base = config_dir().context("unable to resolve OS config directory")?;
    Ok(base.join(APP_DIR_NAME).join(CONFIG_FILE_NAME))
}

pub fn load_config_if_exists(path: &Path) -> Result<Option<AppConfig>> {
    if path.exists() {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config file: {}", path.display()))?;
        let cfg: AppConfig = toml::from_str(&text).context("parsing config TOML")?;
        Ok(Some(cfg))
    } else {
        Ok(None)
    }
}

pub fn write_config(path: &Path, cfg: &AppConfig) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("creating config dir: {}", parent.display()))?;
    }
    let text = toml::to_string_pretty(cfg).context("serializing config to TOML")?;
    fs::write(path, text).with_context(|| format!("writing config file: {}", path.display()))?;
    Ok(())
}

/// Values given on the command line; `None` defers to env, config, default.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub profile: Option<String>,
    pub provider: Option<String>,
    pub model: Option<String>,
    pub divisor: Option<u32>,
    pub padding_tokens: Option<u32>,
    pub max_retries: Option<u64>,
    pub prompt_path: Option<PathBuf>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct EffectiveSettings {
    pub provider: String,
    pub model: String,
    pub api_key: Option<String>,
    pub api_base: Option<String>,
    pub divisor: u32,
    pub padding_tokens: u32,
    pub max_retries: Option<u64>,
    pub prompt_path: Option<PathBuf>,
    pub timeout_secs: u64,
    pub config: AppConfig,
}

impl EffectiveSettings {
    pub fn is_mock(&self) -> bool {
        self.provider.eq_ignore_ascii_case("mock")
    }
}

/// Defaults, then the config file profile, then env (`LLM_MODEL`,
/// `OPENAI_API_KEY`, `OPENAI_API_BASE`), then CLI flags.
pub fn resolve_effective_settings(cli: &CliOverrides) -> Result<EffectiveSettings> {
    let path = default_config_path()?;
    let cfg = load_config_if_exists(&path)?.unwrap_or_default();
    Ok(resolve_with_config(cfg, cli))
}

pub fn resolve_with_config(cfg: AppConfig, cli: &CliOverrides) -> EffectiveSettings {
    let profile_name = cli
        .profile
        .clone()
        .or_else(|| cfg.default_profile.clone())
        .unwrap_or_else(|| "default".to_string());
    let profile = cfg.profiles.get(&profile_name).cloned().unwrap_or_default();

    let env_nonempty = |k: &str| env::var(k).ok().filter(|v| !v.trim().is_empty());

    let provider = cli
        .provider
        .clone()
        .or(profile.provider)
        .unwrap_or_else(|| DEFAULT_PROVIDER.to_string());
    let model = cli
        .model
        .clone()
        .or_else(|| env_nonempty("LLM_MODEL"))
        .or(profile.model)
        .unwrap_or_else(|| DEFAULT_MODEL.to_string());
    let api_key = env_nonempty("OPENAI_API_KEY").or(profile.api_key);
    let api_base = env_nonempty("OPENAI_API_BASE").or(profile.api_base);

    let slicing = &cfg.slicing;
    EffectiveSettings {
        provider,
        model,
        api_key,
        api_base,
        divisor: cli.divisor.or(slicing.divisor).unwrap_or(DEFAULT_DIVISOR),
        padding_tokens: cli.padding_tokens.or(slicing.padding_tokens).unwrap_or(DEFAULT_PADDING_TOKENS),
        max_retries: cli.max_retries.or(slicing.max_retries),
        prompt_path: cli.prompt_path.clone().or_else(|| slicing.prompt_path.clone()),
        timeout_secs: cli.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
        config: cfg,
    }
}

/// Instruction prompt text, loaded once before slicing.
pub fn load_prompt(path: Option<&Path>) -> Result<String> {
    match path {
        Some(p) => fs::read_to_string(p).with_context(|| format!("reading prompt file: {}", p.display())),
        None => Ok(BUNDLED_PROMPT.to_string()),
    }
}
