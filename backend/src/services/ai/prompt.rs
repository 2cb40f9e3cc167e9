//! Shared prompt fragments
//!
//! Every structured feature prompt ends with the same hard constraint: reply
//! with the given JSON shape and nothing else. Keeping the wording here means
//! the normalizer sees the same kind of output from every feature.

/// Closing block: the expected JSON shape plus the no-prose constraint.
pub fn schema_section(schema: &str) -> String {
    format!(
        "\n\nIMPORTANT: Return ONLY valid JSON with no markdown formatting, explanations, or additional text.\n\n\
Required JSON structure:\n{}\n",
        schema.trim()
    )
}

/// Plain-text variant for features that return prose (translation).
pub fn text_only_instruction() -> &'static str {
    "Provide only the requested text, no additional explanation."
}

/// Comma-joined values with a placeholder when empty.
pub fn join_or<S: AsRef<str>>(items: &[S], empty: &str) -> String {
    if items.is_empty() {
        empty.to_string()
    } else {
        items.iter().map(AsRef::as_ref).collect::<Vec<_>>().join(", ")
    }
}

/// Labeled line, omitted entirely when the value is absent.
pub fn optional_line(label: &str, value: Option<impl std::fmt::Display>) -> Option<String> {
    value.map(|v| format!("{}: {}", label, v))
}

/// Whole dollars for derived amounts (shares, daily cost). `1500.0` renders as `1500`.
pub fn dollars(amount: f64) -> String {
    format!("{}", amount.round() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_section_mentions_json_only() {
        let s = schema_section("  {\"a\": 1}  ");
        assert!(s.contains("Return ONLY valid JSON"));
        assert!(s.ends_with("{\"a\": 1}\n"));
    }

    #[test]
    fn test_lists() {
        assert_eq!(join_or(&["culture", "food"], "anything"), "culture, food");
        assert_eq!(join_or::<String>(&[], "anything"), "anything");
    }

    #[test]
    fn test_optional_line_and_dollars() {
        assert_eq!(optional_line("Travelers", Some(2)), Some("Travelers: 2".to_string()));
        assert_eq!(optional_line("Travelers", None::<u32>), None);
        assert_eq!(dollars(1500.0), "1500");
        assert_eq!(dollars(499.6), "500");
    }
}
