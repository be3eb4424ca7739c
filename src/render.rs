use crate::slicer::{SliceOutcome, SlicePlan};
use serde::Serialize;

pub fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string(value) {
        Ok(s) => println!("{}", s),
        Err(e) => eprintln!("failed to serialize json: {}", e),
    }
}

#[derive(Serialize, Debug, Clone)]
pub struct ErrorOut<'a> {
    pub code: &'a str,
    pub message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<&'a str>,
}

pub fn print_json_error(code: &str, message: &str, hint: Option<&str>) {
    let err = ErrorOut { code, message, hint };
    print_json(&err);
}

#[derive(Serialize, Debug)]
pub struct SliceReport<'a> {
    pub model: &'a str,
    pub window: u32,
    pub ratio: f64,
    pub char_budget: usize,
    pub attempts: u64,
    pub oracle_calls: u64,
    pub chunks: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unconsumed: Option<&'a str>,
}

impl<'a> SliceReport<'a> {
    pub fn new(plan: &'a SlicePlan, outcome: &'a SliceOutcome) -> Self {
        Self {
            model: &plan.model,
            window: plan.window,
            ratio: plan.ratio,
            char_budget: plan.char_budget,
            attempts: outcome.attempts(),
            oracle_calls: outcome.oracle_calls(),
            chunks: outcome.chunks(),
            unconsumed: Some(outcome.unconsumed()).filter(|s| !s.is_empty()),
        }
    }
}

#[derive(Serialize, Debug)]
struct ChunkLine<'a> {
    index: usize,
    chars: usize,
    text: &'a str,
}

/// One JSON object per chunk, one per line.
pub fn print_jsonl(chunks: &[String]) {
    for (index, text) in chunks.iter().enumerate() {
        print_json(&ChunkLine { index, chars: text.chars().count(), text });
    }
}

pub fn render_chunks_text(chunks: &[String]) {
    for (i, chunk) in chunks.iter().enumerate() {
        println!("--- chunk {} ---", i + 1);
        println!("{}", chunk);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_envelope_omits_missing_hint() {
        let v = serde_json::to_value(ErrorOut { code: "x", message: "m", hint: None }).unwrap();
        assert!(v.get("hint").is_none());
        assert_eq!(v["code"], "x");
    }
}
