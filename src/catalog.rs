use crate::config::AppConfig;
use crate::error::{Result, SliceError};
use serde::Serialize;

/// Model family every boundary-finding request must belong to.
pub const MIN_MODEL_FAMILY: &str = "gpt-4";
pub const DEFAULT_MODEL: &str = "gpt-4";

/// Known context windows, in tokens.
pub const MODEL_WINDOWS: &[(&str, u32)] = &[
    ("gpt-4", 8192),
    ("gpt-4-0613", 8192),
    ("gpt-4-32k", 32768),
    ("gpt-4-32k-0613", 32768),
    ("gpt-4-0314", 8192),
    ("gpt-4-32k-0314", 32768),
    ("gpt-3.5-turbo", 4097),
    ("gpt-3.5-turbo-16k", 16385),
    ("gpt-3.5-turbo-instruct", 4097),
    ("gpt-3.5-turbo-0613", 4097),
    ("gpt-3.5-turbo-16k-0613", 16385),
    ("gpt-3.5-turbo-0301", 4097),
    ("text-davinci-003", 4097),
    ("text-davinci-002", 4097),
    ("code-davinci-002", 8001),
    ("babbage-002", 16384),
    ("davinci-002", 16384),
    ("text-curie-001", 2049),
    ("text-babbage-001", 2049),
    ("text-ada-001", 2049),
    ("davinci", 2049),
    ("curie", 2049),
    ("babbage", 2049),
    ("ada", 2049),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelProfile {
    pub model: String,
    pub window: u32,
    pub source: WindowSource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowSource {
    ConfigOverride,
    Explicit,
    Table,
    Family,
}

/// Exact lookup in the static table.
pub fn max_tokens(model: &str) -> Result<u32> {
    MODEL_WINDOWS
        .iter()
        .find(|(name, _)| *name == model)
        .map(|(_, w)| *w)
        .ok_or_else(|| SliceError::ModelNotFound(model.to_string()))
}

/// Family rules for ids missing from the table (dated or renamed variants).
/// A larger-context variant of a family supersedes the family default.
fn family_window(model: &str) -> Option<u32> {
    let name = model.to_lowercase();
    if name.contains("gpt-4") {
        return Some(if name.contains("32k") { 32768 } else { 8192 });
    }
    if name.contains("gpt-3.5-turbo") {
        return Some(if name.contains("16k") { 16385 } else { 4097 });
    }
    None
}

/// Resolve the context window for `model`.
///
/// Order: config `[model_overrides]`, explicit window override, static table,
/// family rule. Anything else is `ModelNotFound`.
pub fn resolve_profile(
    model: &str,
    explicit_window: Option<u32>,
    cfg: Option<&AppConfig>,
) -> Result<ModelProfile> {
    let model_s = model.to_string();
    if let Some(w) = cfg
        .and_then(|c| c.find_model_override(model))
        .and_then(|o| o.context_window)
    {
        return Ok(ModelProfile { model: model_s, window: w, source: WindowSource::ConfigOverride });
    }
    if let Some(w) = explicit_window {
        return Ok(ModelProfile { model: model_s, window: w, source: WindowSource::Explicit });
    }
    if let Ok(w) = max_tokens(model) {
        return Ok(ModelProfile { model: model_s, window: w, source: WindowSource::Table });
    }
    if let Some(w) = family_window(model) {
        return Ok(ModelProfile { model: model_s, window: w, source: WindowSource::Family });
    }
    Err(SliceError::ModelNotFound(model_s))
}

/// Reject models below the minimum tier unless the user vouched for them
/// with a config override.
pub fn check_min_tier(model: &str, cfg: Option<&AppConfig>) -> Result<()> {
    if cfg.and_then(|c| c.find_model_override(model)).is_some() {
        return Ok(());
    }
    if model.starts_with(MIN_MODEL_FAMILY) {
        Ok(())
    } else {
        Err(SliceError::ModelBelowMinimum {
            model: model.to_string(),
            minimum: MIN_MODEL_FAMILY.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModelOverride;

    #[test]
    fn table_lookup() {
        assert_eq!(max_tokens("gpt-4").unwrap(), 8192);
        assert_eq!(max_tokens("gpt-3.5-turbo-16k").unwrap(), 16385);
        assert!(matches!(max_tokens("llama"), Err(SliceError::ModelNotFound(_))));
    }

    #[test]
    fn family_variant_supersedes_default() {
        let p = resolve_profile("gpt-4-32k-1106", None, None).unwrap();
        assert_eq!(p.window, 32768);
        assert_eq!(p.source, WindowSource::Family);
        let p = resolve_profile("gpt-4-1106-preview", None, None).unwrap();
        assert_eq!(p.window, 8192);
    }

    #[test]
    fn unknown_model_fails() {
        assert!(matches!(
            resolve_profile("mistral-7b", None, None),
            Err(SliceError::ModelNotFound(m)) if m == "mistral-7b"
        ));
    }

    #[test]
    fn config_override_wins() {
        let mut cfg = AppConfig::default();
        cfg.model_overrides
            .insert("mistral-7b".into(), ModelOverride { context_window: Some(16000) });
        let p = resolve_profile("mistral-7b", Some(4000), Some(&cfg)).unwrap();
        assert_eq!(p.window, 16000);
        assert_eq!(p.source, WindowSource::ConfigOverride);
        assert!(check_min_tier("mistral-7b", Some(&cfg)).is_ok());
    }

    #[test]
    fn min_tier() {
        assert!(check_min_tier("gpt-4-32k", None).is_ok());
        assert!(matches!(
            check_min_tier("gpt-3.5-turbo", None),
            Err(SliceError::ModelBelowMinimum { .. })
        ));
    }
}
