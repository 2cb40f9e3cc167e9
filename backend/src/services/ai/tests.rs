//! AI Service Unit Tests
//!
//! Orchestration tests against a scripted client.

use super::*;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Replays scripted outcomes in order and records every prompt it sees.
struct StubClient {
    replies: Mutex<VecDeque<Result<Completion, AiError>>>,
    prompts: Mutex<Vec<(String, String)>>,
}

impl StubClient {
    fn new(replies: Vec<Result<Completion, AiError>>) -> Arc<Self> {
        Arc::new(Self { replies: Mutex::new(replies.into()), prompts: Mutex::new(Vec::new()) })
    }

    fn text(text: &str) -> Arc<Self> {
        Self::new(vec![Ok(Completion::new(text))])
    }

    fn prompts(&self) -> Vec<(String, String)> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenerativeClient for StubClient {
    fn model(&self) -> &str {
        "stub-model"
    }

    fn has_credentials(&self) -> bool {
        true
    }

    async fn generate_with_model(&self, model: &str, prompt: &str) -> Result<Completion, AiError> {
        self.prompts.lock().unwrap().push((model.to_string(), prompt.to_string()));
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(AiError::Unknown("no scripted reply".into())))
    }
}

fn service(client: Arc<StubClient>) -> AiServiceImpl {
    AiServiceImpl::new(client, FallbackDefaults::default())
}

fn paris() -> ItineraryRequest {
    ItineraryRequest {
        destination: "Paris".into(),
        duration: 3,
        budget: 1500.0,
        interests: vec!["culture".into(), "food".into()],
        travel_style: "moderate".into(),
        group_size: 2,
    }
}

// ============================================================================
// Scenarios
// ============================================================================

#[tokio::test]
async fn test_malformed_itinerary_falls_back() {
    let client = StubClient::text("Here is your trip! Day 1: Louvre. Day 2: ...");
    let out = service(client.clone()).generate_itinerary(&paris()).await.unwrap();

    assert!(out.is_fallback());
    let plan = out.data();
    assert!(!plan.daily_itinerary.is_empty());
    assert_eq!(plan.total_estimated_cost, Some(1500.0));
    assert_eq!(out.raw_response(), Some("Here is your trip! Day 1: Louvre. Day 2: ..."));

    let prompts = client.prompts();
    assert_eq!(prompts.len(), 1);
    assert_eq!(prompts[0].0, "stub-model");
    assert!(prompts[0].1.contains("Destination: Paris"));
}

#[tokio::test]
async fn test_translation_returns_trimmed_text() {
    let client = StubClient::text("  Bonjour, comment allez-vous?\n");
    let req = TranslationRequest {
        text: "Hello, how are you?".into(),
        target_language: "French".into(),
        source_language: "auto".into(),
    };
    let out = service(client).translate(&req).await.unwrap();
    assert_eq!(out, "Bonjour, comment allez-vous?");
}

#[tokio::test]
async fn test_budget_without_breakdown_falls_back() {
    let client = StubClient::text(r#"{"totalEstimatedCost": 3000, "dailyAverage": 428}"#);
    let req = BudgetRequest {
        destination: "Bali".into(),
        duration: 7,
        travelers: 2,
        accommodation_type: "resort".into(),
        travel_style: "moderate".into(),
        activities: vec![],
    };
    let out = service(client).calculate_budget(&req).await.unwrap();

    assert!(out.is_fallback());
    for key in ["accommodation", "food", "activities", "transportation"] {
        assert!(out.data().breakdown.contains_key(key), "missing {key}");
    }
}

#[tokio::test]
async fn test_client_error_propagates_unchanged() {
    let client = StubClient::new(vec![Err(AiError::Quota("QUOTA exceeded".into()))]);
    let err = service(client).generate_itinerary(&paris()).await.unwrap_err();
    assert!(matches!(err, AiError::Quota(ref message) if message == "QUOTA exceeded"));
    assert_eq!(err.category(), Some(ErrorCategory::QuotaError));
}

// ============================================================================
// Normalization through the service
// ============================================================================

#[tokio::test]
async fn test_valid_itinerary_round_trips() {
    let json = r#"{
        "summary": "Three days in Paris",
        "totalEstimatedCost": 1450,
        "dailyItinerary": [
            {"day": 1, "title": "Louvre", "activities": ["Museum"], "estimatedDailyCost": 480},
            {"day": 2, "title": "Montmartre", "activities": ["Walk"], "tips": ["Wear flats"]}
        ],
        "budgetBreakdown": {"accommodation": 600, "food": 400}
    }"#;
    let expected: ItineraryPlan = serde_json::from_str(json).unwrap();

    let out = service(StubClient::text(json)).generate_itinerary(&paris()).await.unwrap();
    assert_eq!(out, Normalized::Parsed { data: expected });
}

#[tokio::test]
async fn test_fenced_completion_matches_plain() {
    let json = r#"{"response": "Try Le Jules Verne.", "suggestions": ["Book ahead"], "actionable": true}"#;
    let req = ConciergeRequest { query: "Dinner?".into(), context: ConciergeContext::default() };

    let plain = service(StubClient::text(json)).handle_concierge_query(&req).await.unwrap();
    let fenced = service(StubClient::text(&format!("```json\n{json}\n```")))
        .handle_concierge_query(&req)
        .await
        .unwrap();

    assert!(!plain.is_fallback());
    assert_eq!(plain, fenced);
}

#[tokio::test]
async fn test_dailyitinerary_must_be_array() {
    let client = StubClient::text(r#"{"summary": "x", "dailyItinerary": "day one"}"#);
    let out = service(client).generate_itinerary(&paris()).await.unwrap();
    assert!(out.is_fallback());
}

#[tokio::test]
async fn test_every_feature_falls_back_without_braces() {
    let text = "Sorry, I cannot answer in JSON right now.";
    let client = StubClient::new((0..6).map(|_| Ok(Completion::new(text))).collect());
    let svc = service(client);

    let mood = svc
        .mood_recommendations(&MoodRequest { mood: "calm".into(), destination: "Kyoto".into(), preferences: vec![] })
        .await
        .unwrap();
    assert_eq!(mood.data().mood_analysis.as_deref(), Some(text));

    let cultural = svc
        .cultural_context(&CulturalContextRequest { text: "Hi".into(), target_country: "Japan".into() })
        .await
        .unwrap();
    assert!(cultural.data().is_appropriate);

    let price = svc
        .predict_prices(&PricePredictionRequest {
            destination: "Rome".into(),
            dates: vec!["2026-05-01".into()],
            property_type: "hotel".into(),
        })
        .await
        .unwrap();
    assert_eq!(price.data().current_price_trend, "stable");
    assert!(price.data().recommendations.should_book_now);

    let safety = svc
        .analyze_safety(&SafetyRequest { location: "Lima".into(), time_of_travel: "June".into() })
        .await
        .unwrap();
    assert_eq!(safety.data().safety_level, "safe");

    for out in [mood.is_fallback(), cultural.is_fallback(), price.is_fallback(), safety.is_fallback()] {
        assert!(out);
    }
}

// ============================================================================
// Validation, raw prompts and probing
// ============================================================================

#[tokio::test]
async fn test_invalid_request_never_calls_client() {
    let client = StubClient::text("{}");
    let mut req = paris();
    req.duration = 0;

    let err = service(client.clone()).generate_itinerary(&req).await.unwrap_err();
    assert!(matches!(err, AiError::InvalidRequest(_)));
    assert!(client.prompts().is_empty());
}

#[tokio::test]
async fn test_generate_raw() {
    let svc = service(StubClient::text("  {\"hello\": \"world\"}  "));
    assert_eq!(svc.generate_raw("Hello").await.unwrap(), "{\"hello\": \"world\"}");
    assert!(matches!(svc.generate_raw("   ").await, Err(AiError::InvalidRequest(_))));
}

#[tokio::test]
async fn test_probe_stops_at_first_success() {
    let client = StubClient::new(vec![
        Err(AiError::Unknown("models/gemini-x is not found".into())),
        Ok(Completion::new("{\"message\": \"Hello World\"}")),
        Ok(Completion::new("never used")),
    ]);
    let candidates: Vec<String> =
        ["models/gemini-x", "gemini-y", "gemini-z"].into_iter().map(String::from).collect();

    let report = service(client.clone()).probe_models(&candidates, PROBE_PROMPT).await;

    assert_eq!(report.working_model.as_deref(), Some("gemini-y"));
    assert_eq!(report.attempts.len(), 2);
    assert!(!report.attempts[0].ok);
    assert_eq!(report.attempts[0].model, "gemini-x");
    assert_eq!(report.attempts[0].category, Some(ErrorCategory::UnknownError));

    let prompts = client.prompts();
    assert_eq!(prompts.len(), 2);
    assert!(prompts.iter().all(|(_, p)| p == PROBE_PROMPT));
}

#[tokio::test]
async fn test_probe_reports_all_failures() {
    let client = StubClient::new(vec![Err(AiError::Auth("API_KEY invalid".into()))]);
    let report = service(client).probe_models(&["gemini-pro".to_string()], "Hello").await;
    assert_eq!(report.working_model, None);
    assert_eq!(report.attempts[0].category, Some(ErrorCategory::AuthError));
}

// ============================================================================
// Harness
// ============================================================================

#[tokio::test]
async fn test_harness_runs_in_order() {
    let client = StubClient::new(vec![
        Ok(Completion::new("not json")),
        Ok(Completion::new(r#"{"response": "Bonne idée"}"#)),
        Err(AiError::Quota("QUOTA".into())),
        Ok(Completion::new(r#"{"totalEstimatedCost": 2000, "breakdown": {"food": {"amount": 500}}}"#)),
        Ok(Completion::new("Hola, ¿cómo estás?")),
    ]);
    let svc = service(client.clone());

    let report = run_all_features(&svc, Duration::ZERO).await;

    let features: Vec<AiFeature> = report.checks.iter().map(|c| c.feature).collect();
    assert_eq!(features, AiFeature::SELF_TEST_ORDER.to_vec());
    assert_eq!(report.passed, 4);
    assert_eq!(report.failed, 1);
    assert!(report.checks[0].fallback);
    assert!(!report.checks[1].fallback);
    assert!(!report.checks[2].ok);
    assert_eq!(report.checks[4].detail, "Hola, ¿cómo estás?");
    assert_eq!(client.prompts().len(), 5);
}
