use crate::error::TokenizerError;
use tiktoken_rs::{get_bpe_from_model, CoreBPE};

/// Counts tokens for a text under the model the counter was built for.
/// Only the count is ever needed, never the token ids.
pub trait TokenCounter: Send + Sync {
    fn count_tokens(&self, text: &str) -> Result<usize, TokenizerError>;
}

/// BPE tokenizer matching the OpenAI model's encoding.
pub struct TiktokenCounter {
    bpe: CoreBPE,
}

impl TiktokenCounter {
    pub fn for_model(model: &str) -> Result<Self, TokenizerError> {
        let bpe = get_bpe_from_model(model).map_err(|e| TokenizerError::UnsupportedModel {
            model: model.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self { bpe })
    }
}

impl TokenCounter for TiktokenCounter {
    fn count_tokens(&self, text: &str) -> Result<usize, TokenizerError> {
        Ok(self.bpe.encode_ordinary(text).len())
    }
}

/// Fixed characters-per-token approximation, rounded up.
/// Used for models tiktoken has no encoding for.
#[derive(Debug, Clone, Copy)]
pub struct HeuristicCounter {
    pub chars_per_token: usize,
}

impl Default for HeuristicCounter {
    fn default() -> Self { Self { chars_per_token: 4 } }
}

impl TokenCounter for HeuristicCounter {
    fn count_tokens(&self, text: &str) -> Result<usize, TokenizerError> {
        let per = self.chars_per_token.max(1);
        let chars = text.chars().count();
        Ok(chars.div_ceil(per))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heuristic_rounds_up() {
        let c = HeuristicCounter::default();
        assert_eq!(c.count_tokens("").unwrap(), 0);
        assert_eq!(c.count_tokens("abcde").unwrap(), 2);
        assert_eq!(c.count_tokens("äöüß").unwrap(), 1);
    }

    #[test]
    fn tiktoken_counts_gpt4() {
        let c = TiktokenCounter::for_model("gpt-4").unwrap();
        let n = c.count_tokens("hello world").unwrap();
        assert!(n >= 1 && n <= 3);
    }

    #[test]
    fn tiktoken_rejects_unknown_model() {
        assert!(TiktokenCounter::for_model("no-such-model-xyz").is_err());
    }
}
