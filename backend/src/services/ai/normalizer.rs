//! Response Normalizer
//!
//! Coerces free-text completions into typed results. The model is asked for
//! bare JSON but routinely wraps it in code fences or prose, so the pipeline
//! is: strip fences → slice `{..}` → strict parse → required-field check →
//! typed parse. Any failure yields the caller-supplied fallback; nothing here
//! returns an error.

use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use super::models::Normalized;

pub const FALLBACK_NOTE: &str = "This is a fallback response due to AI parsing issues. \
The full AI response is available in raw_response.";

/// Why a candidate was rejected. Never leaves this module's callers.
#[derive(Debug, Error)]
pub(crate) enum ParseError {
    #[error("invalid JSON: {0}")]
    Syntax(#[from] serde_json::Error),

    #[error("expected a JSON object")]
    NotAnObject,

    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    #[error("schema mismatch: {0}")]
    Shape(String),
}

/// Remove leading/trailing code-fence markers and an optional language tag.
pub fn strip_code_fences(text: &str) -> &str {
    let mut s = text.trim();

    if let Some(rest) = s.strip_prefix("```") {
        // Drop the language tag, if any, up to the first newline.
        s = match rest.find('\n') {
            Some(nl) if rest[..nl].trim().chars().all(|c| c.is_ascii_alphanumeric()) => &rest[nl + 1..],
            Some(_) => rest,
            None => rest.trim_start_matches(|c: char| c.is_ascii_alphabetic()),
        };
    }

    s = s.trim_end();
    if let Some(rest) = s.strip_suffix("```") {
        s = rest;
    }

    s.trim()
}

/// Slice from the first `{` to the last `}` when both exist in order,
/// otherwise return the fence-stripped text unchanged.
pub fn extract_json_candidate(text: &str) -> &str {
    let s = strip_code_fences(text);
    match (s.find('{'), s.rfind('}')) {
        (Some(start), Some(end)) if start < end => &s[start..=end],
        _ => s,
    }
}

/// Strict parse plus minimal schema check.
pub(crate) fn parse_candidate(candidate: &str, required: &[&'static str]) -> Result<Value, ParseError> {
    let value: Value = serde_json::from_str(candidate)?;
    let object = value.as_object().ok_or(ParseError::NotAnObject)?;

    for field in required {
        match object.get(*field) {
            None | Some(Value::Null) => return Err(ParseError::MissingField(field)),
            Some(_) => {},
        }
    }

    Ok(value)
}

/// Run the full pipeline, falling back to `fallback(raw)` on any failure.
pub fn normalize<T, F>(raw: &str, required: &[&'static str], fallback: F) -> Normalized<T>
where
    T: DeserializeOwned,
    F: FnOnce(&str) -> T,
{
    let candidate = extract_json_candidate(raw);

    let parsed = parse_candidate(candidate, required).and_then(|value| {
        serde_json::from_value::<T>(value).map_err(|e| ParseError::Shape(e.to_string()))
    });

    match parsed {
        Ok(data) => Normalized::Parsed { data },
        Err(e) => {
            tracing::warn!("Completion could not be normalized ({}), using fallback", e);
            tracing::debug!(
                "Rejected completion preview: {}",
                raw.chars().take(300).collect::<String>()
            );
            Normalized::Fallback {
                data: fallback(raw),
                raw_response: candidate.to_string(),
                note: FALLBACK_NOTE.to_string(),
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Deserialize)]
    struct Probe {
        name: String,
        #[serde(default)]
        tags: Vec<String>,
    }

    fn fallback(raw: &str) -> Probe {
        Probe { name: "fallback".into(), tags: vec![raw.len().to_string()] }
    }

    #[test]
    fn test_strip_fences_with_language_tag() {
        assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("  {\"a\":1}  "), "{\"a\":1}");
    }

    #[test]
    fn test_extract_candidate_slices_prose() {
        let text = "Sure! Here you go: {\"name\":\"x\"} Hope it helps.";
        assert_eq!(extract_json_candidate(text), "{\"name\":\"x\"}");
    }

    #[test]
    fn test_extract_candidate_without_braces_keeps_text() {
        assert_eq!(extract_json_candidate("  no json here "), "no json here");
        assert_eq!(extract_json_candidate("} backwards {"), "} backwards {");
    }

    #[test]
    fn test_parsed_path() {
        let out = normalize::<Probe, _>(r#"{"name":"paris","tags":["a"]}"#, &["name"], fallback);
        assert_eq!(out, Normalized::Parsed { data: Probe { name: "paris".into(), tags: vec!["a".into()] } });
    }

    #[test]
    fn test_missing_required_field_falls_back() {
        let out = normalize::<Probe, _>(r#"{"tags":[]}"#, &["name"], fallback);
        assert!(out.is_fallback());
        assert_eq!(out.data().name, "fallback");
    }

    #[test]
    fn test_null_required_field_falls_back() {
        let out = normalize::<Probe, _>(r#"{"name":null}"#, &["name"], fallback);
        assert!(out.is_fallback());
    }

    #[test]
    fn test_wrong_type_falls_back() {
        let out = normalize::<Probe, _>(r#"{"name":42}"#, &["name"], fallback);
        assert!(out.is_fallback());
    }

    #[test]
    fn test_array_top_level_falls_back() {
        let out = normalize::<Probe, _>("[1,2,3]", &[], fallback);
        assert!(out.is_fallback());
    }

    #[test]
    fn test_fenced_and_plain_are_equal() {
        let plain = r#"{"name":"rome"}"#;
        let fenced = format!("```json\n{}\n```", plain);
        assert_eq!(
            normalize::<Probe, _>(plain, &["name"], fallback),
            normalize::<Probe, _>(&fenced, &["name"], fallback)
        );
    }

    #[test]
    fn test_idempotent() {
        let raw = "garbage {not json";
        let a = normalize::<Probe, _>(raw, &["name"], fallback);
        let b = normalize::<Probe, _>(raw, &["name"], fallback);
        assert_eq!(a, b);
        assert_eq!(a.raw_response(), Some("garbage {not json"));
    }
}
