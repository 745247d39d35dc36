//! JSON extraction from raw model output.
//!
//! Models are told to answer with bare JSON but routinely wrap it in prose
//! or a fenced code block. Extraction tries, in order:
//!
//! 1. A fenced block explicitly labeled `json` — parse its interior.
//! 2. The span from the first `{` to the last `}` inclusive.
//!
//! There is no partial recovery or repair: a failure here aborts the whole
//! generation attempt, carrying a bounded preview of the raw text for
//! diagnostics.

use apoyo_core::error::PipelineError;
use regex_lite::Regex;

/// How much raw text to keep in error previews.
const PREVIEW_CHARS: usize = 600;

/// Extract exactly one JSON object from raw model output.
pub fn extract_json_object(raw: &str) -> Result<serde_json::Value, PipelineError> {
    if raw.trim().is_empty() {
        return Err(PipelineError::NoJsonFound {
            preview: String::new(),
        });
    }

    if let Some(candidate) = fenced_json_block(raw) {
        return parse_object(&candidate, raw);
    }

    if let Some(candidate) = brace_span(raw) {
        return parse_object(candidate, raw);
    }

    Err(PipelineError::NoJsonFound {
        preview: preview(raw),
    })
}

/// The interior of a ```json ... ``` fence, if present.
fn fenced_json_block(raw: &str) -> Option<String> {
    // Lazy match keeps the capture to the first fenced object.
    let re = Regex::new(r"(?s)```json\s*(\{.*?\})\s*```").ok()?;
    re.captures(raw)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// The widest `{...}` span in the text.
fn brace_span(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    (start < end).then(|| &raw[start..=end])
}

fn parse_object(candidate: &str, raw: &str) -> Result<serde_json::Value, PipelineError> {
    match serde_json::from_str::<serde_json::Value>(candidate) {
        Ok(value) if value.is_object() => Ok(value),
        Ok(value) => Err(PipelineError::MalformedJson {
            detail: format!("expected a JSON object, got {}", json_kind(&value)),
            preview: preview(raw),
        }),
        Err(e) => Err(PipelineError::MalformedJson {
            detail: e.to_string(),
            preview: preview(raw),
        }),
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

fn preview(raw: &str) -> String {
    raw.chars().take(PREVIEW_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn bare_object_parses() {
        let value = extract_json_object(r#"{"a": 1}"#).unwrap();
        assert_eq!(value, json!({"a": 1}));
    }

    #[test]
    fn fenced_block_with_surrounding_prose_roundtrips() {
        let original = json!({"teacher_version": {"summary": "todo bien"}, "n": 3});
        let raw = format!(
            "Claro, aquí tienes el resultado:\n```json\n{}\n```\nEspero que sirva.",
            serde_json::to_string_pretty(&original).unwrap()
        );
        let value = extract_json_object(&raw).unwrap();
        assert_eq!(value, original);
    }

    #[test]
    fn unfenced_object_inside_prose_parses() {
        let raw = r#"El resultado es {"a": {"b": 2}} y nada más."#;
        let value = extract_json_object(raw).unwrap();
        assert_eq!(value, json!({"a": {"b": 2}}));
    }

    #[test]
    fn empty_input_is_no_json() {
        let err = extract_json_object("   \n ").unwrap_err();
        assert!(matches!(err, PipelineError::NoJsonFound { .. }));
    }

    #[test]
    fn prose_without_object_is_no_json() {
        let err = extract_json_object("Lo siento, no puedo generar eso.").unwrap_err();
        match err {
            PipelineError::NoJsonFound { preview } => {
                assert!(preview.contains("no puedo generar"));
            }
            other => panic!("expected NoJsonFound, got {other:?}"),
        }
    }

    #[test]
    fn broken_json_is_malformed_with_preview() {
        let err = extract_json_object(r#"{"a": 1,}"#).unwrap_err();
        match err {
            PipelineError::MalformedJson { preview, .. } => {
                assert!(preview.starts_with(r#"{"a": 1,}"#));
            }
            other => panic!("expected MalformedJson, got {other:?}"),
        }
    }

    #[test]
    fn preview_is_bounded_to_600_chars() {
        let raw = format!("{}{}", "{", "y".repeat(2000));
        let err = extract_json_object(&raw).unwrap_err();
        match err {
            PipelineError::NoJsonFound { preview } => {
                assert_eq!(preview.chars().count(), 600);
            }
            other => panic!("expected NoJsonFound, got {other:?}"),
        }
    }

    #[test]
    fn fenced_block_wins_over_outer_braces() {
        let raw = "antes {ruido} ```json\n{\"ok\": true}\n``` después {más ruido}";
        let value = extract_json_object(raw).unwrap();
        assert_eq!(value, json!({"ok": true}));
    }
}
