//! Maps provider failures onto [`ErrorCategory`].
//!
//! Structured signals from the error envelope win: the `details[].reason`
//! code, then the `status` string, then the HTTP status. Substring
//! heuristics over the message are the last resort.

use once_cell::sync::Lazy;
use regex::Regex;

use super::models::ErrorCategory;

const REASON_TABLE: &[(&str, ErrorCategory)] = &[
    ("API_KEY_INVALID", ErrorCategory::AuthError),
    ("API_KEY_SERVICE_BLOCKED", ErrorCategory::AuthError),
    ("RATE_LIMIT_EXCEEDED", ErrorCategory::QuotaError),
    ("RESOURCE_EXHAUSTED", ErrorCategory::QuotaError),
    ("SAFETY", ErrorCategory::SafetyFilterError),
    ("PROHIBITED_CONTENT", ErrorCategory::SafetyFilterError),
    ("BLOCKLIST", ErrorCategory::SafetyFilterError),
];

const STATUS_TABLE: &[(&str, ErrorCategory)] = &[
    ("UNAUTHENTICATED", ErrorCategory::AuthError),
    ("PERMISSION_DENIED", ErrorCategory::AuthError),
    ("RESOURCE_EXHAUSTED", ErrorCategory::QuotaError),
    ("UNAVAILABLE", ErrorCategory::NetworkError),
    ("DEADLINE_EXCEEDED", ErrorCategory::NetworkError),
];

// Order matters: a key error mentioning quota is still a key error.
static HEURISTICS: Lazy<Vec<(Regex, ErrorCategory)>> = Lazy::new(|| {
    [
        (r"(?i)api[_ ]?key", ErrorCategory::AuthError),
        (r"(?i)quota", ErrorCategory::QuotaError),
        (r"(?i)safety", ErrorCategory::SafetyFilterError),
    ]
    .into_iter()
    .filter_map(|(pattern, category)| Regex::new(pattern).ok().map(|re| (re, category)))
    .collect()
});

/// Structured parts of a failed call. All fields are optional since
/// transport failures carry only a message.
#[derive(Debug, Default, Clone)]
pub struct FailureSignal<'a> {
    pub http_status: Option<u16>,
    pub status: Option<&'a str>,
    pub reasons: Vec<&'a str>,
    pub message: &'a str,
}

pub fn classify(signal: &FailureSignal<'_>) -> ErrorCategory {
    for reason in &signal.reasons {
        if let Some((_, category)) = REASON_TABLE.iter().find(|(code, _)| code == reason) {
            return *category;
        }
    }

    if let Some(status) = signal.status {
        if let Some((_, category)) = STATUS_TABLE.iter().find(|(code, _)| *code == status) {
            return *category;
        }
    }

    match signal.http_status {
        Some(401) | Some(403) => return ErrorCategory::AuthError,
        Some(429) => return ErrorCategory::QuotaError,
        Some(503) | Some(504) => return ErrorCategory::NetworkError,
        _ => {},
    }

    classify_message(signal.message)
}

/// Message-only classification.
pub fn classify_message(message: &str) -> ErrorCategory {
    HEURISTICS
        .iter()
        .find(|(re, _)| re.is_match(message))
        .map(|(_, category)| *category)
        .unwrap_or(ErrorCategory::UnknownError)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_beats_status() {
        let signal = FailureSignal {
            http_status: Some(400),
            status: Some("INVALID_ARGUMENT"),
            reasons: vec!["API_KEY_INVALID"],
            message: "API key not valid. Please pass a valid API key.",
        };
        assert_eq!(classify(&signal), ErrorCategory::AuthError);
    }

    #[test]
    fn test_status_table() {
        let signal = FailureSignal {
            http_status: Some(429),
            status: Some("RESOURCE_EXHAUSTED"),
            message: "Resource has been exhausted",
            ..Default::default()
        };
        assert_eq!(classify(&signal), ErrorCategory::QuotaError);
    }

    #[test]
    fn test_http_status_only() {
        let signal = FailureSignal { http_status: Some(503), message: "overloaded", ..Default::default() };
        assert_eq!(classify(&signal), ErrorCategory::NetworkError);
    }

    #[test]
    fn test_message_heuristics_order() {
        assert_eq!(classify_message("API_KEY exceeded QUOTA"), ErrorCategory::AuthError);
        assert_eq!(classify_message("daily quota reached"), ErrorCategory::QuotaError);
        assert_eq!(classify_message("blocked by SAFETY settings"), ErrorCategory::SafetyFilterError);
        assert_eq!(classify_message("socket closed"), ErrorCategory::UnknownError);
    }
}
