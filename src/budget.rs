use crate::error::{Result, SliceError};
use serde::Serialize;

pub const DEFAULT_DIVISOR: u32 = 8;
pub const DEFAULT_PADDING_TOKENS: u32 = 128;
pub const MIN_DIVISOR: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Budget {
    pub available_tokens: u32,
    pub char_budget: usize,
}

/// Character budget for one oracle request.
///
/// Only `window / divisor` tokens are offered to a single request; the fixed
/// prompt and the padding margin come out of that share.
pub fn plan(window: u32, divisor: u32, prompt_tokens: usize, padding_tokens: u32, ratio: f64) -> Result<Budget> {
    if divisor < MIN_DIVISOR {
        return Err(SliceError::InvalidConfig(format!(
            "divisor must be >= {}, got {}",
            MIN_DIVISOR, divisor
        )));
    }
    if ratio.is_nan() || ratio <= 0.0 {
        return Err(SliceError::Estimation(format!("non-positive ratio {}", ratio)));
    }
    let available = i64::from(window / divisor) - prompt_tokens as i64 - i64::from(padding_tokens);
    if available <= 0 {
        return Err(SliceError::BudgetExhausted { available });
    }
    let char_budget = (available as f64 * ratio).floor() as usize;
    if char_budget == 0 {
        return Err(SliceError::BudgetExhausted { available });
    }
    Ok(Budget { available_tokens: available as u32, char_budget })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gpt4_defaults() {
        let b = plan(8192, 8, 200, 128, 1.33).unwrap();
        assert_eq!(b.available_tokens, 696);
        assert_eq!(b.char_budget, 925);
    }

    #[test]
    fn prompt_overhead_exhausts_budget() {
        let err = plan(8192, 8, 900, 128, 4.0).unwrap_err();
        assert!(matches!(err, SliceError::BudgetExhausted { available: -4 }));
        let err = plan(2049, 8, 128, 128, 4.0).unwrap_err();
        assert!(matches!(err, SliceError::BudgetExhausted { available: 0 }));
    }

    #[test]
    fn divisor_below_two_rejected() {
        assert!(matches!(plan(8192, 1, 0, 0, 4.0), Err(SliceError::InvalidConfig(_))));
    }

    #[test]
    fn tiny_ratio_gives_no_chars() {
        assert!(matches!(plan(8192, 8, 0, 0, 0.0001), Err(SliceError::BudgetExhausted { .. })));
    }
}
