use crate::budget::{self, DEFAULT_DIVISOR, DEFAULT_PADDING_TOKENS};
use crate::catalog::{self, ModelProfile, DEFAULT_MODEL};
use crate::config::{AppConfig, BUNDLED_PROMPT};
use crate::error::{Result, SliceError};
use crate::estimate::{estimate_ratio, SamplePolicy};
use crate::extract::extract_chunk;
use crate::oracle::{boundary_request, BoundaryOracle};
use crate::tokenizer::TokenCounter;
use serde::Serialize;
use tracing::{debug, info, warn};

/// Everything the engine needs to know, fixed before construction.
#[derive(Debug, Clone)]
pub struct SlicerConfig {
    pub model: String,
    /// Used when the catalog has no config override for the model.
    pub window_override: Option<u32>,
    pub divisor: u32,
    pub padding_tokens: u32,
    pub prompt: String,
    /// Consecutive unusable oracle answers tolerated at one cursor position.
    /// `None` retries forever.
    pub max_retries: Option<u64>,
}

impl Default for SlicerConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            window_override: None,
            divisor: DEFAULT_DIVISOR,
            padding_tokens: DEFAULT_PADDING_TOKENS,
            prompt: BUNDLED_PROMPT.to_string(),
            max_retries: None,
        }
    }
}

/// Frozen numbers computed once before the loop starts.
#[derive(Debug, Clone, Serialize)]
pub struct SlicePlan {
    pub model: String,
    pub window: u32,
    pub ratio: f64,
    pub prompt_tokens: usize,
    pub available_tokens: u32,
    pub char_budget: usize,
    pub max_output_tokens: u32,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SliceOutcome {
    chunks: Vec<String>,
    attempts: u64,
    oracle_calls: u64,
    unconsumed: String,
}

impl SliceOutcome {
    pub fn chunks(&self) -> &[String] {
        &self.chunks
    }

    /// Loop iterations, retries included.
    pub fn attempts(&self) -> u64 {
        self.attempts
    }

    pub fn oracle_calls(&self) -> u64 {
        self.oracle_calls
    }

    /// Text left behind when the oracle signalled a whitespace-only boundary.
    pub fn unconsumed(&self) -> &str {
        &self.unconsumed
    }
}

pub struct Slicer {
    content: String,
    profile: ModelProfile,
    cfg: SlicerConfig,
}

impl Slicer {
    /// Trims `content` and resolves the model profile. Whitespace-only
    /// content is an error, never an empty result.
    pub fn new(content: &str, cfg: SlicerConfig, app_cfg: Option<&AppConfig>) -> Result<Self> {
        let content = content.trim();
        if content.is_empty() {
            return Err(SliceError::EmptyContent);
        }
        let profile = catalog::resolve_profile(&cfg.model, cfg.window_override, app_cfg)?;
        Ok(Self { content: content.to_string(), profile, cfg })
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn profile(&self) -> &ModelProfile {
        &self.profile
    }

    pub fn plan(&self, counter: &dyn TokenCounter, policy: &mut dyn SamplePolicy) -> Result<SlicePlan> {
        let ratio = estimate_ratio(&self.content, counter, policy)?;
        let prompt_tokens = counter.count_tokens(&self.cfg.prompt)?;
        let budget = budget::plan(
            self.profile.window,
            self.cfg.divisor,
            prompt_tokens,
            self.cfg.padding_tokens,
            ratio,
        )?;
        let plan = SlicePlan {
            model: self.profile.model.clone(),
            window: self.profile.window,
            ratio,
            prompt_tokens,
            available_tokens: budget.available_tokens,
            char_budget: budget.char_budget,
            max_output_tokens: self.profile.window / 2,
        };
        info!(
            model = %plan.model,
            window = plan.window,
            ratio = plan.ratio,
            prompt_tokens = plan.prompt_tokens,
            char_budget = plan.char_budget,
            "planned slicing budget"
        );
        Ok(plan)
    }

    pub async fn run(
        &self,
        counter: &dyn TokenCounter,
        policy: &mut dyn SamplePolicy,
        oracle: &dyn BoundaryOracle,
    ) -> Result<(SlicePlan, SliceOutcome)> {
        let plan = self.plan(counter, policy)?;
        let outcome = self.slice(&plan, oracle).await?;
        Ok((plan, outcome))
    }

    /// The slicing loop. Holds `content == chunks.concat() + remainder` on
    /// every iteration.
    pub async fn slice(&self, plan: &SlicePlan, oracle: &dyn BoundaryOracle) -> Result<SliceOutcome> {
        let content = self.content.as_str();
        let mut out = SliceOutcome::default();
        let mut cursor = 0usize;
        let mut retries = 0u64;

        while cursor < content.len() {
            out.attempts += 1;
            let remainder = &content[cursor..];

            let Some(window_end) = byte_offset_after(remainder, plan.char_budget) else {
                debug!(attempt = out.attempts, cursor, "remainder fits the budget");
                out.chunks.push(remainder.to_string());
                break;
            };
            let window = &remainder[..window_end];
            debug!(attempt = out.attempts, cursor, window_bytes = window.len(), "requesting boundary");

            let request = boundary_request(&self.cfg.prompt, window)?;
            out.oracle_calls += 1;
            let raw = oracle.complete(&request, plan.max_output_tokens, &plan.model).await?;

            let Some(answer) = extract_chunk(&raw) else {
                retries += 1;
                warn!(attempt = out.attempts, retries, "oracle gave no usable chunk; retrying");
                if let Some(max) = self.cfg.max_retries {
                    if retries > max {
                        return Err(SliceError::BoundaryExhausted { retries });
                    }
                }
                continue;
            };
            retries = 0;

            if answer.chars().all(char::is_whitespace) {
                warn!(attempt = out.attempts, cursor, "oracle returned a whitespace-only chunk; stopping");
                out.unconsumed = remainder.to_string();
                break;
            }

            // Take the real prefix of the same length so coverage holds even
            // when the oracle alters the text.
            let take = byte_offset_after(window, answer.chars().count()).unwrap_or(window.len());
            let piece = &window[..take];
            if piece != answer {
                warn!(attempt = out.attempts, cursor, "oracle chunk differs from the source prefix; using the source text");
            }
            out.chunks.push(piece.to_string());
            cursor += take;
        }

        info!(chunks = out.chunks.len(), attempts = out.attempts, oracle_calls = out.oracle_calls, "slicing finished");
        Ok(out)
    }
}

/// Byte offset just past the first `n` chars, or `None` when `s` has no
/// more than `n` chars.
fn byte_offset_after(s: &str, n: usize) -> Option<usize> {
    s.char_indices().nth(n).map(|(i, _)| i)
}
