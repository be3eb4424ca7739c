use crate::error::{Result, SliceError};
use crate::tokenizer::TokenCounter;
use rand::thread_rng;
use tracing::debug;

/// Documents shorter than this (in chars) are tokenized whole.
pub const WHOLE_DOCUMENT_THRESHOLD: usize = 1000;
pub const SAMPLE_COUNT: usize = 4;
pub const SAMPLE_LEN: usize = 250;

/// Chooses where the ratio samples start.
pub trait SamplePolicy {
    /// Up to `count` distinct start positions in `0..upper`.
    fn positions(&mut self, upper: usize, count: usize) -> Vec<usize>;
}

/// Uniform random positions, drawn without replacement.
#[derive(Debug, Default)]
pub struct RandomSampler;

impl SamplePolicy for RandomSampler {
    fn positions(&mut self, upper: usize, count: usize) -> Vec<usize> {
        let amount = count.min(upper);
        rand::seq::index::sample(&mut thread_rng(), upper, amount).into_vec()
    }
}

/// Predetermined positions; out-of-range entries are dropped.
#[derive(Debug, Clone)]
pub struct FixedPositions(pub Vec<usize>);

impl SamplePolicy for FixedPositions {
    fn positions(&mut self, upper: usize, count: usize) -> Vec<usize> {
        self.0.iter().copied().filter(|p| *p < upper).take(count).collect()
    }
}

/// Characters per token for `content` under the counter's model.
pub fn estimate_ratio(
    content: &str,
    counter: &dyn TokenCounter,
    policy: &mut dyn SamplePolicy,
) -> Result<f64> {
    let n = content.chars().count();
    let sections: Vec<&str> = if n < WHOLE_DOCUMENT_THRESHOLD {
        vec![content]
    } else {
        sample_sections(content, policy)?
    };

    let mut total_chars = 0usize;
    let mut total_tokens = 0usize;
    for s in &sections {
        total_chars += s.chars().count();
        total_tokens += counter.count_tokens(s)?;
    }
    if total_tokens == 0 {
        return Err(SliceError::Estimation(format!(
            "tokenizer produced no tokens for {} sampled characters",
            total_chars
        )));
    }
    let ratio = total_chars as f64 / total_tokens as f64;
    if ratio.is_nan() || ratio <= 0.0 {
        return Err(SliceError::Estimation(format!("non-positive ratio {}", ratio)));
    }
    debug!(sections = sections.len(), total_chars, total_tokens, ratio, "estimated token ratio");
    Ok(ratio)
}

/// Fixed-length windows of `content` at positions chosen by `policy`.
pub fn sample_sections<'a>(content: &'a str, policy: &mut dyn SamplePolicy) -> Result<Vec<&'a str>> {
    let offsets: Vec<usize> = content
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(content.len()))
        .collect();
    let n = offsets.len() - 1;
    if n < SAMPLE_LEN + SAMPLE_COUNT {
        return Err(SliceError::InvalidInput(format!(
            "{} chars is shorter than the {} needed for sampling; tokenize the whole document",
            n,
            SAMPLE_LEN + SAMPLE_COUNT
        )));
    }
    let positions = policy.positions(n - SAMPLE_LEN, SAMPLE_COUNT);
    if positions.is_empty() {
        return Err(SliceError::InvalidInput("sample policy produced no positions".into()));
    }
    Ok(positions
        .into_iter()
        .map(|p| &content[offsets[p]..offsets[p + SAMPLE_LEN]])
        .collect())
}
