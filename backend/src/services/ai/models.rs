//! Shared types for the AI feature services.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;
use utoipa::ToSchema;

// ============================================================================
// Features
// ============================================================================

/// Every capability that goes through the prompt → completion → normalize
/// pipeline, plus the raw diagnostic prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AiFeature {
    Itinerary,
    MoodRecommendations,
    Translation,
    CulturalContext,
    PricePrediction,
    Budget,
    Concierge,
    Safety,
    RawPrompt,
}

impl AiFeature {
    /// Features exercised by the self-test harness, in execution order.
    pub const SELF_TEST_ORDER: [AiFeature; 5] = [
        AiFeature::Itinerary,
        AiFeature::Concierge,
        AiFeature::PricePrediction,
        AiFeature::Budget,
        AiFeature::Translation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AiFeature::Itinerary => "itinerary",
            AiFeature::MoodRecommendations => "mood_recommendations",
            AiFeature::Translation => "translation",
            AiFeature::CulturalContext => "cultural_context",
            AiFeature::PricePrediction => "price_prediction",
            AiFeature::Budget => "budget",
            AiFeature::Concierge => "concierge",
            AiFeature::Safety => "safety",
            AiFeature::RawPrompt => "raw_prompt",
        }
    }
}

impl fmt::Display for AiFeature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Category attached to a failed generative call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    AuthError,
    QuotaError,
    SafetyFilterError,
    NetworkError,
    UnknownError,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::AuthError => "auth_error",
            ErrorCategory::QuotaError => "quota_error",
            ErrorCategory::SafetyFilterError => "safety_filter_error",
            ErrorCategory::NetworkError => "network_error",
            ErrorCategory::UnknownError => "unknown_error",
        }
    }

    /// Wrap a provider message into the matching error variant.
    pub fn into_error(self, message: impl Into<String>) -> AiError {
        let message = message.into();
        match self {
            ErrorCategory::AuthError => AiError::Auth(message),
            ErrorCategory::QuotaError => AiError::Quota(message),
            ErrorCategory::SafetyFilterError => AiError::SafetyFilter(message),
            ErrorCategory::NetworkError => AiError::Network(message),
            ErrorCategory::UnknownError => AiError::Unknown(message),
        }
    }
}

#[derive(Debug, Error)]
pub enum AiError {
    #[error("Invalid or missing API key: {0}")]
    Auth(String),

    #[error("API quota exceeded: {0}")]
    Quota(String),

    #[error("Content was filtered for safety: {0}")]
    SafetyFilter(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Generation failed: {0}")]
    Unknown(String),

    #[error("A {0} request is already in progress")]
    Busy(AiFeature),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl AiError {
    /// Category of a generation failure. Local failures (busy, invalid
    /// request) never reached the provider and have none.
    pub fn category(&self) -> Option<ErrorCategory> {
        match self {
            AiError::Auth(_) => Some(ErrorCategory::AuthError),
            AiError::Quota(_) => Some(ErrorCategory::QuotaError),
            AiError::SafetyFilter(_) => Some(ErrorCategory::SafetyFilterError),
            AiError::Network(_) => Some(ErrorCategory::NetworkError),
            AiError::Unknown(_) => Some(ErrorCategory::UnknownError),
            AiError::Busy(_) | AiError::InvalidRequest(_) => None,
        }
    }
}

impl From<validator::ValidationErrors> for AiError {
    fn from(err: validator::ValidationErrors) -> Self {
        AiError::InvalidRequest(err.to_string())
    }
}

// ============================================================================
// Completions
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Unstructured text returned by the generative endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub text: String,
    pub finish_reason: Option<String>,
    pub usage: Option<Usage>,
}

impl Completion {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into(), finish_reason: None, usage: None }
    }
}

// ============================================================================
// Normalized results
// ============================================================================

/// Result of normalizing a completion: either the model's own JSON, or a
/// fallback derived from the request that carries the raw text along.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum Normalized<T> {
    Parsed {
        data: T,
    },
    Fallback {
        data: T,
        raw_response: String,
        note: String,
    },
}

impl<T> Normalized<T> {
    pub fn data(&self) -> &T {
        match self {
            Normalized::Parsed { data } | Normalized::Fallback { data, .. } => data,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Normalized::Fallback { .. })
    }

    pub fn raw_response(&self) -> Option<&str> {
        match self {
            Normalized::Parsed { .. } => None,
            Normalized::Fallback { raw_response, .. } => Some(raw_response),
        }
    }
}

// ============================================================================
// Fallback defaults
// ============================================================================

/// Values used to derive fallback results and the numeric hints embedded in
/// prompts. Loaded from the `[ai.fallback]` config section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct FallbackDefaults {
    pub accommodation_share: f64,
    pub food_share: f64,
    pub activities_share: f64,
    pub transportation_share: f64,
    /// Per traveler per day, in USD. Used when the request carries no budget.
    pub daily_rate_per_traveler: f64,
}

impl Default for FallbackDefaults {
    fn default() -> Self {
        Self {
            accommodation_share: 0.4,
            food_share: 0.3,
            activities_share: 0.2,
            transportation_share: 0.1,
            daily_rate_per_traveler: 150.0,
        }
    }
}

impl FallbackDefaults {
    pub fn shares(&self) -> [(&'static str, f64); 4] {
        [
            ("accommodation", self.accommodation_share),
            ("food", self.food_share),
            ("activities", self.activities_share),
            ("transportation", self.transportation_share),
        ]
    }

    /// Split `total` into whole-dollar category amounts.
    pub fn split(&self, total: f64) -> BTreeMap<String, f64> {
        self.shares()
            .into_iter()
            .map(|(name, share)| (name.to_string(), (total * share).round()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_as_str() {
        assert_eq!(AiFeature::Itinerary.as_str(), "itinerary");
        assert_eq!(AiFeature::PricePrediction.to_string(), "price_prediction");
    }

    #[test]
    fn test_category_round_trip() {
        let err = ErrorCategory::QuotaError.into_error("QUOTA exceeded");
        assert_eq!(err.category(), Some(ErrorCategory::QuotaError));
        assert_eq!(AiError::Busy(AiFeature::Budget).category(), None);
    }

    #[test]
    fn test_default_split() {
        let split = FallbackDefaults::default().split(1500.0);
        assert_eq!(split["accommodation"], 600.0);
        assert_eq!(split["food"], 450.0);
        assert_eq!(split["activities"], 300.0);
        assert_eq!(split["transportation"], 150.0);
    }

    #[test]
    fn test_normalized_serializes_discriminant() {
        let parsed: Normalized<u32> = Normalized::Parsed { data: 3 };
        let json = serde_json::to_value(&parsed).unwrap();
        assert_eq!(json["source"], "parsed");
        assert_eq!(json["data"], 3);

        let fallback: Normalized<u32> = Normalized::Fallback {
            data: 1,
            raw_response: "oops".into(),
            note: "n".into(),
        };
        let json = serde_json::to_value(&fallback).unwrap();
        assert_eq!(json["source"], "fallback");
        assert_eq!(json["raw_response"], "oops");
        assert_eq!(fallback.raw_response(), Some("oops"));
    }
}
