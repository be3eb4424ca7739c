use thiserror::Error;

pub type Result<T> = std::result::Result<T, SliceError>;

/// Everything that can abort a slicing run. Oracle answers that carry no
/// usable chunk are not errors; the engine retries those itself.
#[derive(Debug, Error)]
pub enum SliceError {
    #[error("empty content: nothing to slice after trimming whitespace")]
    EmptyContent,

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("missing API key for provider '{0}'")]
    MissingApiKey(String),

    #[error("model '{0}' not found in catalog")]
    ModelNotFound(String),

    #[error("model '{model}' is below the minimum supported tier '{minimum}'")]
    ModelBelowMinimum { model: String, minimum: String },

    #[error("budget exhausted: {available} tokens available after prompt and padding")]
    BudgetExhausted { available: i64 },

    #[error("token ratio estimation failed: {0}")]
    Estimation(String),

    #[error(transparent)]
    Tokenizer(#[from] TokenizerError),

    #[error(transparent)]
    Oracle(#[from] OracleError),

    #[error("boundary detection exhausted after {retries} unusable oracle answers")]
    BoundaryExhausted { retries: u64 },
}

#[derive(Debug, Error)]
pub enum TokenizerError {
    #[error("no tokenizer available for model '{model}': {reason}")]
    UnsupportedModel { model: String, reason: String },
}

#[derive(Debug, Error)]
pub enum OracleError {
    #[error("OPENAI_API_KEY is not set")]
    MissingApiKey,

    #[error("oracle request timed out")]
    Timeout,

    #[error("oracle http error: {0}")]
    Http(#[source] reqwest::Error),

    #[error("oracle api error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("oracle decode error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("oracle prompt error: {0}")]
    Prompt(String),
}

impl OracleError {
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() { OracleError::Timeout } else { OracleError::Http(err) }
    }
}

impl SliceError {
    /// Stable machine-readable code used by `--json` error output.
    pub fn code(&self) -> &'static str {
        match self {
            SliceError::EmptyContent | SliceError::InvalidInput(_) => "missing_input",
            SliceError::InvalidConfig(_) => "invalid_config",
            SliceError::MissingApiKey(_) => "missing_api_key",
            SliceError::ModelNotFound(_) => "model_not_found",
            SliceError::ModelBelowMinimum { .. } => "model_unsupported",
            SliceError::BudgetExhausted { .. } => "budget_exhausted",
            SliceError::Estimation(_) | SliceError::Tokenizer(_) => "tokenizer_error",
            SliceError::Oracle(OracleError::Timeout) => "timeout",
            SliceError::Oracle(OracleError::MissingApiKey) => "missing_api_key",
            SliceError::Oracle(_) => "oracle_error",
            SliceError::BoundaryExhausted { .. } => "boundary_exhausted",
        }
    }

    pub fn hint(&self) -> Option<&'static str> {
        match self {
            SliceError::MissingApiKey(_) | SliceError::Oracle(OracleError::MissingApiKey) => {
                Some("set OPENAI_API_KEY in env or .env")
            }
            SliceError::BudgetExhausted { .. } => {
                Some("lower --divisor or --padding, or use a model with a larger context window")
            }
            SliceError::ModelBelowMinimum { .. } => Some("use a gpt-4 family model"),
            SliceError::Oracle(OracleError::Timeout) => Some("try increasing --timeout"),
            SliceError::BoundaryExhausted { .. } => Some("raise --max-retries or check the prompt"),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_follow_taxonomy() {
        assert_eq!(SliceError::EmptyContent.code(), "missing_input");
        assert_eq!(SliceError::BudgetExhausted { available: -3 }.code(), "budget_exhausted");
        assert_eq!(SliceError::Oracle(OracleError::Timeout).code(), "timeout");
        assert!(SliceError::MissingApiKey("openai".into()).hint().is_some());
    }
}
