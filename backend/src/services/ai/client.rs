//! Generative Language API client
//!
//! `GenerativeClient` is the seam the feature services depend on; tests swap
//! in a stub. `GeminiClient` talks to the `generateContent` REST endpoint.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, instrument, warn};

use super::classify::{FailureSignal, classify, classify_message};
use super::models::{AiError, Completion, ErrorCategory, Usage};
use crate::config::AiConfig;

#[async_trait]
pub trait GenerativeClient: Send + Sync {
    /// Model used by [`GenerativeClient::generate`].
    fn model(&self) -> &str;

    /// Whether credentials are configured. Calls are still attempted without.
    fn has_credentials(&self) -> bool;

    async fn generate_with_model(&self, model: &str, prompt: &str) -> Result<Completion, AiError>;

    async fn generate(&self, prompt: &str) -> Result<Completion, AiError> {
        let model = self.model().to_string();
        self.generate_with_model(&model, prompt).await
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
    #[serde(default)]
    total_token_count: u32,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    status: Option<String>,
    #[serde(default)]
    details: Vec<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    reason: Option<String>,
}

// ============================================================================
// Gemini client
// ============================================================================

pub struct GeminiClient {
    http: reqwest::Client,
    api_key: Option<String>,
    model: String,
    base_url: String,
    temperature: f32,
    max_output_tokens: u32,
}

impl GeminiClient {
    pub fn new(config: &AiConfig) -> Result<Self, AiError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AiError::Network(e.to_string()))?;

        Ok(Self {
            http,
            api_key: config.api_key.clone().filter(|k| !k.trim().is_empty()),
            model: strip_model_prefix(&config.model).to_string(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            temperature: config.temperature,
            max_output_tokens: config.max_output_tokens,
        })
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, strip_model_prefix(model))
    }
}

#[async_trait]
impl GenerativeClient for GeminiClient {
    fn model(&self) -> &str {
        &self.model
    }

    fn has_credentials(&self) -> bool {
        self.api_key.is_some()
    }

    #[instrument(level = "debug", skip(self, prompt), fields(prompt_len = prompt.len()))]
    async fn generate_with_model(&self, model: &str, prompt: &str) -> Result<Completion, AiError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(AiError::Auth("API_KEY is not configured".to_string()));
        };

        let body = GenerateContentRequest {
            contents: vec![Content { role: "user", parts: vec![RequestPart { text: prompt }] }],
            generation_config: GenerationConfig {
                temperature: self.temperature,
                max_output_tokens: self.max_output_tokens,
            },
        };

        let url = self.endpoint(model);
        debug!(url = %url, "sending generateContent request");

        let resp = self
            .http
            .post(&url)
            .query(&[("key", api_key)])
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!("Transport error calling {}: {}", model, e);
                AiError::Network(e.to_string())
            })?;

        let status = resp.status();
        let raw = resp.text().await.map_err(|e| AiError::Network(e.to_string()))?;

        if !status.is_success() {
            let err = error_from_body(status.as_u16(), &raw);
            warn!(%status, category = ?err.category(), "Gemini API error: {}", err);
            return Err(err);
        }

        let parsed: GenerateContentResponse = serde_json::from_str(&raw)
            .map_err(|e| AiError::Unknown(format!("unreadable response: {}", e)))?;

        completion_from_response(parsed)
    }
}

/// Model names are accepted with or without the `models/` prefix.
pub fn strip_model_prefix(model: &str) -> &str {
    model.strip_prefix("models/").unwrap_or(model)
}

fn error_from_body(http_status: u16, raw: &str) -> AiError {
    match serde_json::from_str::<ErrorEnvelope>(raw) {
        Ok(envelope) => {
            let body = envelope.error;
            let signal = FailureSignal {
                http_status: Some(http_status),
                status: body.status.as_deref(),
                reasons: body.details.iter().filter_map(|d| d.reason.as_deref()).collect(),
                message: &body.message,
            };
            classify(&signal).into_error(body.message.clone())
        },
        Err(_) => {
            let signal = FailureSignal { http_status: Some(http_status), message: raw, ..Default::default() };
            let message = if raw.trim().is_empty() { format!("HTTP {}", http_status) } else { raw.to_string() };
            classify(&signal).into_error(message)
        },
    }
}

fn completion_from_response(resp: GenerateContentResponse) -> Result<Completion, AiError> {
    if let Some(reason) = resp.prompt_feedback.and_then(|f| f.block_reason) {
        return Err(AiError::SafetyFilter(format!("prompt blocked: {}", reason)));
    }

    let usage = resp.usage_metadata.map(|u| Usage {
        prompt_tokens: u.prompt_token_count,
        completion_tokens: u.candidates_token_count,
        total_tokens: u.total_token_count,
    });

    let Some(candidate) = resp.candidates.into_iter().next() else {
        return Err(AiError::Unknown("response contained no candidates".to_string()));
    };

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        let reason = candidate.finish_reason.unwrap_or_else(|| "UNKNOWN".to_string());
        let category = match reason.as_str() {
            "SAFETY" | "PROHIBITED_CONTENT" | "BLOCKLIST" | "SPII" => ErrorCategory::SafetyFilterError,
            other => classify_message(other),
        };
        return Err(category.into_error(format!("empty completion (finish reason {})", reason)));
    }

    Ok(Completion { text, finish_reason: candidate.finish_reason, usage })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_model_prefix() {
        assert_eq!(strip_model_prefix("models/gemini-pro"), "gemini-pro");
        assert_eq!(strip_model_prefix("gemini-pro"), "gemini-pro");
    }

    #[test]
    fn test_error_envelope_reason() {
        let raw = r#"{"error":{"code":400,"message":"API key not valid.","status":"INVALID_ARGUMENT",
            "details":[{"@type":"type.googleapis.com/google.rpc.ErrorInfo","reason":"API_KEY_INVALID"}]}}"#;
        assert!(matches!(error_from_body(400, raw), AiError::Auth(_)));
    }

    #[test]
    fn test_error_plain_body() {
        assert!(matches!(error_from_body(429, "slow down"), AiError::Quota(_)));
        assert!(matches!(error_from_body(500, ""), AiError::Unknown(m) if m == "HTTP 500"));
    }

    #[test]
    fn test_completion_joins_parts() {
        let resp: GenerateContentResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"Hello "},{"text":"World"}]},"finishReason":"STOP"}],
                "usageMetadata":{"promptTokenCount":3,"candidatesTokenCount":2,"totalTokenCount":5}}"#,
        )
        .unwrap();
        let completion = completion_from_response(resp).unwrap();
        assert_eq!(completion.text, "Hello World");
        assert_eq!(completion.finish_reason.as_deref(), Some("STOP"));
        assert_eq!(completion.usage.unwrap().total_tokens, 5);
    }

    #[test]
    fn test_blocked_prompt_is_safety() {
        let resp: GenerateContentResponse =
            serde_json::from_str(r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#).unwrap();
        assert!(matches!(completion_from_response(resp), Err(AiError::SafetyFilter(_))));
    }

    #[test]
    fn test_safety_finish_without_text() {
        let resp: GenerateContentResponse =
            serde_json::from_str(r#"{"candidates":[{"finishReason":"SAFETY"}]}"#).unwrap();
        assert!(matches!(completion_from_response(resp), Err(AiError::SafetyFilter(_))));
    }

    #[test]
    fn test_no_candidates_is_unknown() {
        let resp: GenerateContentResponse = serde_json::from_str("{}").unwrap();
        assert!(matches!(completion_from_response(resp), Err(AiError::Unknown(_))));
    }

    #[tokio::test]
    async fn test_missing_key_is_auth_error() {
        let client = GeminiClient::new(&AiConfig::default()).unwrap();
        assert!(!client.has_credentials());
        let err = client.generate("hi").await.unwrap_err();
        assert!(matches!(err, AiError::Auth(_)));
    }
}
