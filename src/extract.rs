use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

/// Single-level `{...}` candidates. Nested objects are not matched whole.
static OBJECT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{[^}]+\}").expect("static object pattern"));

/// Pull the `"chunk"` answer out of free-form oracle output.
///
/// Every brace-delimited candidate is parsed as JSON; those that fail, or
/// lack a non-empty string `"chunk"`, are skipped. The last valid candidate
/// wins since models tend to restate or correct themselves further down.
/// `None` means the oracle gave no usable answer.
pub fn extract_chunk(text: &str) -> Option<String> {
    OBJECT_RE
        .find_iter(text)
        .filter_map(|m| serde_json::from_str::<Value>(m.as_str()).ok())
        .filter_map(|v| match v.get("chunk") {
            Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
            _ => None,
        })
        .last()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_valid_candidate_wins() {
        let text = r#"First try: {"chunk": "A"} then, on reflection, {"chunk": "B"}."#;
        assert_eq!(extract_chunk(text).as_deref(), Some("B"));
    }

    #[test]
    fn skips_invalid_and_empty_candidates() {
        let text = r#"{"chunk": "keep"} {not json} {"chunk": ""} {"other": 1} {"chunk": 5}"#;
        assert_eq!(extract_chunk(text).as_deref(), Some("keep"));
    }

    #[test]
    fn no_json_is_none() {
        assert_eq!(extract_chunk("I could not find a boundary, sorry."), None);
        assert_eq!(extract_chunk(""), None);
        assert_eq!(extract_chunk("{{{{ }"), None);
    }

    #[test]
    fn escaped_newlines_survive() {
        let text = "```json\n{\"chunk\": \"Para one.\\n\\nPara two.\"}\n```";
        assert_eq!(extract_chunk(text).as_deref(), Some("Para one.\n\nPara two."));
    }

    #[test]
    fn closing_brace_inside_chunk_breaks_candidate() {
        let text = r#"{"chunk": "fn main() {}"}"#;
        assert_eq!(extract_chunk(text), None);
    }

    #[test]
    fn whitespace_chunk_is_returned() {
        assert_eq!(extract_chunk(r#"{"chunk": "   "}"#).as_deref(), Some("   "));
    }
}
