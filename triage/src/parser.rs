//! Tolerant extraction of the JSON payload from free-form model text.

use serde_json::{Map, Value};
use thiserror::Error;

/// Marker stored on a run whose reply was not usable JSON.
pub const PARSE_FAILED_MARKER: &str = "JSON parse failed";

/// Reply arrived but its content was not a usable JSON object.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{PARSE_FAILED_MARKER}: {reason}")]
pub struct ParseFailure {
    pub reason: String,
}

impl ParseFailure {
    fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Removes one enclosing ```` ``` ```` / ```` ```json ```` fence, if present.
///
/// Text that is not fully wrapped is returned trimmed and otherwise untouched.
pub fn strip_code_fence(raw: &str) -> &str {
    let t = raw.trim();
    if t.len() < 6 || !t.starts_with("```") || !t.ends_with("```") {
        return t;
    }
    let inner = &t[3..t.len() - 3];
    let inner = match inner.get(..4) {
        Some(tag) if tag.eq_ignore_ascii_case("json") => {
            let rest = &inner[4..];
            // `json` is a language tag only when the payload starts right after it.
            if rest.trim_start().starts_with(['{', '[']) || rest.trim().is_empty() {
                rest
            } else {
                inner
            }
        }
        _ => inner,
    };
    inner.trim()
}

/// Decodes the model reply into a JSON object.
///
/// A reply that decodes to something other than a non-empty object is a
/// failure too: nothing downstream can be mapped from it.
///
/// # Errors
/// [`ParseFailure`] when decoding fails or the payload is not a non-empty object.
pub fn parse_model_json(raw: &str) -> Result<Map<String, Value>, ParseFailure> {
    let body = strip_code_fence(raw);
    if body.is_empty() {
        return Err(ParseFailure::new("empty response"));
    }
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(map)) if !map.is_empty() => Ok(map),
        Ok(Value::Object(_)) => Err(ParseFailure::new("empty JSON object")),
        Ok(other) => Err(ParseFailure::new(format!(
            "expected a JSON object, got {}",
            kind_of(&other)
        ))),
        Err(e) => Err(ParseFailure::new(e.to_string())),
    }
}

fn kind_of(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    const BARE: &str = r#"{"extracted_tasks":[{"title":"Pay rent","micro_steps":["open bank app"]}],"top_3_indices":[0],"blockers":[],"action_plan":"Start small."}"#;

    #[test]
    fn fenced_json_equals_bare_json() {
        let fenced = format!("```json\n{BARE}\n```");
        let plain_fence = format!("  ```\n{BARE}\n```  \n");
        let bare = parse_model_json(BARE).unwrap();
        assert_eq!(parse_model_json(&fenced).unwrap(), bare);
        assert_eq!(parse_model_json(&plain_fence).unwrap(), bare);
        assert_eq!(bare["top_3_indices"], json!([0]));
    }

    #[test]
    fn fence_strip_leaves_unwrapped_text_alone() {
        assert_eq!(strip_code_fence("  {\"a\":1}  "), "{\"a\":1}");
        assert_eq!(strip_code_fence("```json{\"a\":1}```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("``` jsonish ```"), "jsonish");
        assert_eq!(strip_code_fence("```"), "```");
    }

    #[test]
    fn non_json_is_a_parse_failure() {
        let err = parse_model_json("not json at all").unwrap_err();
        assert!(err.to_string().starts_with(PARSE_FAILED_MARKER));
    }

    #[test]
    fn non_object_and_empty_object_fail() {
        assert!(parse_model_json("[1,2,3]").is_err());
        assert!(parse_model_json("{}").is_err());
        assert!(parse_model_json("\"text\"").is_err());
        assert!(parse_model_json("   ").is_err());
    }
}
