//! Self-test harness: invokes each feature once with a canned request,
//! pausing a configured delay between calls.

use serde::Serialize;
use std::time::{Duration, Instant};
use utoipa::ToSchema;

use super::models::{AiError, AiFeature};
use super::scenarios::*;
use super::service::AiService;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct FeatureCheck {
    pub feature: AiFeature,
    pub ok: bool,
    /// The call succeeded but the completion was replaced by the fallback.
    pub fallback: bool,
    pub elapsed_ms: u64,
    pub detail: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SelfTestReport {
    pub passed: usize,
    pub failed: usize,
    pub checks: Vec<FeatureCheck>,
}

impl From<Vec<FeatureCheck>> for SelfTestReport {
    fn from(checks: Vec<FeatureCheck>) -> Self {
        let passed = checks.iter().filter(|c| c.ok).count();
        Self { passed, failed: checks.len() - passed, checks }
    }
}

/// Run every feature in [`AiFeature::SELF_TEST_ORDER`], sequentially.
pub async fn run_all_features(service: &dyn AiService, delay: Duration) -> SelfTestReport {
    let mut checks = Vec::with_capacity(AiFeature::SELF_TEST_ORDER.len());

    for (i, feature) in AiFeature::SELF_TEST_ORDER.iter().copied().enumerate() {
        if i > 0 && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let start = Instant::now();
        let outcome = run_one(service, feature).await;
        let elapsed_ms = start.elapsed().as_millis() as u64;

        let check = match outcome {
            Ok((fallback, detail)) => FeatureCheck { feature, ok: true, fallback, elapsed_ms, detail },
            Err(e) => FeatureCheck { feature, ok: false, fallback: false, elapsed_ms, detail: e.to_string() },
        };
        tracing::info!("Self-test {}: ok={} fallback={} ({}ms)", feature, check.ok, check.fallback, elapsed_ms);
        checks.push(check);
    }

    checks.into()
}

async fn run_one(service: &dyn AiService, feature: AiFeature) -> Result<(bool, String), AiError> {
    match feature {
        AiFeature::Itinerary => {
            let out = service.generate_itinerary(&sample_itinerary()).await?;
            Ok((out.is_fallback(), format!("{} day(s) planned", out.data().daily_itinerary.len())))
        },
        AiFeature::Concierge => {
            let out = service.handle_concierge_query(&sample_concierge()).await?;
            Ok((out.is_fallback(), preview(&out.data().response)))
        },
        AiFeature::PricePrediction => {
            let out = service.predict_prices(&sample_price()).await?;
            Ok((out.is_fallback(), format!("trend: {}", out.data().current_price_trend)))
        },
        AiFeature::Budget => {
            let out = service.calculate_budget(&sample_budget()).await?;
            Ok((out.is_fallback(), format!("total: {:.0}", out.data().total_estimated_cost)))
        },
        AiFeature::Translation => {
            let out = service.translate(&sample_translation()).await?;
            Ok((false, preview(&out)))
        },
        other => Err(AiError::InvalidRequest(format!("{} is not part of the self-test", other))),
    }
}

fn preview(text: &str) -> String {
    let mut s: String = text.chars().take(80).collect();
    if text.chars().count() > 80 {
        s.push('…');
    }
    s
}

fn sample_itinerary() -> ItineraryRequest {
    ItineraryRequest {
        destination: "Paris, France".to_string(),
        duration: 3,
        budget: 1500.0,
        interests: vec!["culture".to_string(), "food".to_string()],
        travel_style: "moderate".to_string(),
        group_size: 2,
    }
}

fn sample_concierge() -> ConciergeRequest {
    ConciergeRequest {
        query: "What are the best restaurants near the Eiffel Tower?".to_string(),
        context: ConciergeContext {
            destination: Some("Paris".to_string()),
            travelers: Some(2),
            ..Default::default()
        },
    }
}

fn sample_price() -> PricePredictionRequest {
    PricePredictionRequest {
        destination: "Tokyo".to_string(),
        dates: vec!["2025-04-01".to_string(), "2025-04-07".to_string()],
        property_type: "hotel".to_string(),
    }
}

fn sample_budget() -> BudgetRequest {
    BudgetRequest {
        destination: "Bali".to_string(),
        duration: 7,
        travelers: 2,
        accommodation_type: "resort".to_string(),
        travel_style: "moderate".to_string(),
        activities: vec!["surfing".to_string(), "temple visits".to_string()],
    }
}

fn sample_translation() -> TranslationRequest {
    TranslationRequest {
        text: "Hello, how are you?".to_string(),
        target_language: "Spanish".to_string(),
        source_language: "auto".to_string(),
    }
}
