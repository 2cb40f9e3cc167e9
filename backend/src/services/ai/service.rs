//! AI Service
//!
//! Sequences prompt → completion → normalization for every feature. The
//! service holds no per-request state: re-entrancy is the request tracker's
//! job and nothing is cached or retried.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use utoipa::ToSchema;
use validator::Validate;

use super::client::{GenerativeClient, strip_model_prefix};
use super::models::{AiError, AiFeature, ErrorCategory, FallbackDefaults, Normalized};
use super::normalizer::normalize;
use super::scenarios::*;

/// Fixed prompt for model probing.
pub const PROBE_PROMPT: &str = r#"Say "Hello World" in JSON format"#;

// ============================================================================
// Feature request trait
// ============================================================================

/// Implemented by every structured feature request.
pub trait FeatureRequest: Validate + Send + Sync {
    type Response: DeserializeOwned + Serialize + Send;

    fn feature(&self) -> AiFeature;

    /// Full instruction string, embedding every request parameter.
    fn build_prompt(&self, defaults: &FallbackDefaults) -> String;

    /// Top-level fields that must be present and non-null in the completion.
    fn required_fields(&self) -> &'static [&'static str];

    /// Deterministic result used when the completion cannot be parsed.
    fn fallback(&self, raw: &str, defaults: &FallbackDefaults) -> Self::Response;
}

// ============================================================================
// Probe report
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProbeAttempt {
    pub model: String,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<ErrorCategory>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProbeReport {
    /// First candidate that answered, if any.
    pub working_model: Option<String>,
    pub attempts: Vec<ProbeAttempt>,
}

// ============================================================================
// Service trait
// ============================================================================

#[async_trait]
pub trait AiService: Send + Sync {
    /// Whether an API key is configured. Not enforced: calls without one
    /// fail with an auth error.
    fn is_available(&self) -> bool;

    fn model(&self) -> &str;

    async fn generate_itinerary(&self, req: &ItineraryRequest) -> Result<Normalized<ItineraryPlan>, AiError>;

    async fn mood_recommendations(&self, req: &MoodRequest) -> Result<Normalized<MoodRecommendations>, AiError>;

    /// Trimmed translated text.
    async fn translate(&self, req: &TranslationRequest) -> Result<String, AiError>;

    async fn cultural_context(&self, req: &CulturalContextRequest) -> Result<Normalized<CulturalContext>, AiError>;

    async fn predict_prices(&self, req: &PricePredictionRequest) -> Result<Normalized<PriceForecast>, AiError>;

    async fn calculate_budget(&self, req: &BudgetRequest) -> Result<Normalized<BudgetPlan>, AiError>;

    async fn handle_concierge_query(&self, req: &ConciergeRequest) -> Result<Normalized<ConciergeReply>, AiError>;

    async fn analyze_safety(&self, req: &SafetyRequest) -> Result<Normalized<SafetyReport>, AiError>;

    /// Send an arbitrary prompt and return the trimmed completion text.
    async fn generate_raw(&self, prompt: &str) -> Result<String, AiError>;

    /// Try each candidate model in order, stopping at the first success.
    async fn probe_models(&self, candidates: &[String], prompt: &str) -> ProbeReport;
}

// ============================================================================
// Implementation
// ============================================================================

pub struct AiServiceImpl {
    client: Arc<dyn GenerativeClient>,
    defaults: FallbackDefaults,
}

impl AiServiceImpl {
    pub fn new(client: Arc<dyn GenerativeClient>, defaults: FallbackDefaults) -> Self {
        Self { client, defaults }
    }

    /// Validate → prompt → generate → normalize.
    pub async fn run<R: FeatureRequest>(&self, req: &R) -> Result<Normalized<R::Response>, AiError> {
        req.validate()?;

        let feature = req.feature();
        let prompt = req.build_prompt(&self.defaults);
        tracing::info!("Running AI feature {} with model {}", feature, self.client.model());
        tracing::debug!("Prompt for {}: {} chars", feature, prompt.len());

        let start = Instant::now();
        let completion = self.client.generate(&prompt).await.inspect_err(|e| {
            tracing::warn!("AI feature {} failed ({:?}): {}", feature, e.category(), e);
        })?;

        tracing::debug!(
            "Completion for {} in {}ms: {} chars, finish={:?}",
            feature,
            start.elapsed().as_millis(),
            completion.text.len(),
            completion.finish_reason
        );

        let result = normalize(&completion.text, req.required_fields(), |raw| {
            req.fallback(raw, &self.defaults)
        });

        if result.is_fallback() {
            tracing::warn!("AI feature {} returned a fallback result", feature);
        }

        Ok(result)
    }
}

#[async_trait]
impl AiService for AiServiceImpl {
    fn is_available(&self) -> bool {
        self.client.has_credentials()
    }

    fn model(&self) -> &str {
        self.client.model()
    }

    async fn generate_itinerary(&self, req: &ItineraryRequest) -> Result<Normalized<ItineraryPlan>, AiError> {
        self.run(req).await
    }

    async fn mood_recommendations(&self, req: &MoodRequest) -> Result<Normalized<MoodRecommendations>, AiError> {
        self.run(req).await
    }

    async fn translate(&self, req: &TranslationRequest) -> Result<String, AiError> {
        req.validate()?;
        tracing::info!("Translating {} chars to {}", req.text.len(), req.target_language);

        let completion = self.client.generate(&req.build_prompt()).await.inspect_err(|e| {
            tracing::warn!("Translation failed ({:?}): {}", e.category(), e);
        })?;

        Ok(completion.text.trim().to_string())
    }

    async fn cultural_context(&self, req: &CulturalContextRequest) -> Result<Normalized<CulturalContext>, AiError> {
        self.run(req).await
    }

    async fn predict_prices(&self, req: &PricePredictionRequest) -> Result<Normalized<PriceForecast>, AiError> {
        self.run(req).await
    }

    async fn calculate_budget(&self, req: &BudgetRequest) -> Result<Normalized<BudgetPlan>, AiError> {
        self.run(req).await
    }

    async fn handle_concierge_query(&self, req: &ConciergeRequest) -> Result<Normalized<ConciergeReply>, AiError> {
        self.run(req).await
    }

    async fn analyze_safety(&self, req: &SafetyRequest) -> Result<Normalized<SafetyReport>, AiError> {
        self.run(req).await
    }

    async fn generate_raw(&self, prompt: &str) -> Result<String, AiError> {
        if prompt.trim().is_empty() {
            return Err(AiError::InvalidRequest("prompt is required".to_string()));
        }
        let completion = self.client.generate(prompt).await?;
        Ok(completion.text.trim().to_string())
    }

    async fn probe_models(&self, candidates: &[String], prompt: &str) -> ProbeReport {
        let mut attempts = Vec::with_capacity(candidates.len());

        for candidate in candidates {
            let model = strip_model_prefix(candidate).to_string();
            tracing::info!("Probing model {}", model);

            match self.client.generate_with_model(&model, prompt).await {
                Ok(completion) => {
                    attempts.push(ProbeAttempt {
                        model: model.clone(),
                        ok: true,
                        response: Some(completion.text.trim().to_string()),
                        error: None,
                        category: None,
                    });
                    return ProbeReport { working_model: Some(model), attempts };
                },
                Err(e) => {
                    tracing::warn!("Model {} failed: {}", model, e);
                    attempts.push(ProbeAttempt {
                        model,
                        ok: false,
                        response: None,
                        error: Some(e.to_string()),
                        category: e.category(),
                    });
                },
            }
        }

        ProbeReport { working_model: None, attempts }
    }
}
