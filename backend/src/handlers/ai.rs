//! AI API Handlers
//!
//! REST endpoints for the travel AI features plus the diagnostic routes
//! (status, model probe, raw prompt, self-test).
//!
//! Feature routes are guarded by the request tracker: one in-flight call per
//! (client, feature), where the client is the `X-Client-Id` header.

use axum::{
    Json,
    extract::{Query, State},
    http::HeaderMap,
};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::AppState;
use crate::services::ai::{
    AiError, AiFeature, AiService, BudgetPlan, BudgetRequest, ConciergeReply, ConciergeRequest, CulturalContext,
    CulturalContextRequest, FeatureState, ItineraryPlan, ItineraryRequest, MoodRecommendations, MoodRequest,
    Normalized, PriceForecast, PricePredictionRequest, ProbeReport, SafetyReport, SafetyRequest, SelfTestReport,
    TranslationRequest, run_all_features,
};
use crate::utils::ApiResult;

pub const CLIENT_ID_HEADER: &str = "x-client-id";
const ANONYMOUS_CLIENT: &str = "anonymous";

fn client_id(headers: &HeaderMap) -> String {
    headers
        .get(CLIENT_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(ANONYMOUS_CLIENT)
        .to_string()
}

/// Run `call` under the tracker's `Pending` state for this client/feature.
async fn tracked<T, Fut>(
    state: &AppState,
    headers: &HeaderMap,
    feature: AiFeature,
    call: Fut,
    is_fallback: impl FnOnce(&T) -> bool,
) -> ApiResult<T>
where
    Fut: Future<Output = Result<T, AiError>>,
{
    let client = client_id(headers);
    let guard = state.request_tracker.begin(&client, feature)?;
    Ok(guard.complete(call.await, is_fallback)?)
}

async fn tracked_normalized<T, Fut>(
    state: &AppState,
    headers: &HeaderMap,
    feature: AiFeature,
    call: Fut,
) -> ApiResult<Json<Normalized<T>>>
where
    Fut: Future<Output = Result<Normalized<T>, AiError>>,
{
    tracked(state, headers, feature, call, Normalized::is_fallback).await.map(Json)
}

// ============================================================================
// Status
// ============================================================================

#[derive(Debug, Serialize, ToSchema)]
pub struct AiStatusResponse {
    /// Whether a Gemini API key is configured
    pub key_present: bool,
    pub model: String,
    pub features: Vec<AiFeature>,
}

/// AI configuration status
#[utoipa::path(
    get,
    path = "/api/ai/status",
    responses((status = 200, description = "AI status", body = AiStatusResponse)),
    tag = "AI"
)]
pub async fn get_status(State(state): State<Arc<AppState>>) -> Json<AiStatusResponse> {
    Json(AiStatusResponse {
        key_present: state.ai_service.is_available(),
        model: state.ai_service.model().to_string(),
        features: vec![
            AiFeature::Itinerary,
            AiFeature::MoodRecommendations,
            AiFeature::Translation,
            AiFeature::CulturalContext,
            AiFeature::PricePrediction,
            AiFeature::Budget,
            AiFeature::Concierge,
            AiFeature::Safety,
        ],
    })
}

/// Request states for the calling client
#[utoipa::path(
    get,
    path = "/api/ai/requests",
    params(("X-Client-Id" = Option<String>, Header, description = "Client scope for request tracking")),
    responses((status = 200, description = "Per-feature request state", body = Vec<FeatureState>)),
    tag = "AI"
)]
pub async fn list_requests(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Json<Vec<FeatureState>> {
    Json(state.request_tracker.snapshot(&client_id(&headers)))
}

// ============================================================================
// Features
// ============================================================================

/// Generate a trip itinerary
#[utoipa::path(
    post,
    path = "/api/ai/itinerary",
    request_body = ItineraryRequest,
    responses(
        (status = 200, description = "Normalized result (`source`: parsed | fallback) wrapping an itinerary", body = ItineraryPlan),
        (status = 400, description = "Validation error"),
        (status = 409, description = "Request already in progress"),
        (status = 429, description = "AI quota exceeded"),
    ),
    tag = "AI"
)]
pub async fn generate_itinerary(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<ItineraryRequest>,
) -> ApiResult<Json<Normalized<ItineraryPlan>>> {
    tracing::info!("Itinerary request: {} for {} day(s)", req.destination, req.duration);
    tracked_normalized(&state, &headers, AiFeature::Itinerary, state.ai_service.generate_itinerary(&req)).await
}

/// Mood-based accommodation recommendations
#[utoipa::path(
    post,
    path = "/api/ai/recommendations/mood",
    request_body = MoodRequest,
    responses((status = 200, description = "Normalized mood recommendations", body = MoodRecommendations)),
    tag = "AI"
)]
pub async fn mood_recommendations(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<MoodRequest>,
) -> ApiResult<Json<Normalized<MoodRecommendations>>> {
    tracked_normalized(&state, &headers, AiFeature::MoodRecommendations, state.ai_service.mood_recommendations(&req))
        .await
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TranslationResponse {
    pub translation: String,
    pub target_language: String,
}

/// Translate text
#[utoipa::path(
    post,
    path = "/api/ai/translate",
    request_body = TranslationRequest,
    responses((status = 200, description = "Translated text", body = TranslationResponse)),
    tag = "AI"
)]
pub async fn translate(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<TranslationRequest>,
) -> ApiResult<Json<TranslationResponse>> {
    let translation =
        tracked(&state, &headers, AiFeature::Translation, state.ai_service.translate(&req), |_| false).await?;
    Ok(Json(TranslationResponse { translation, target_language: req.target_language }))
}

/// Cultural appropriateness of a message
#[utoipa::path(
    post,
    path = "/api/ai/cultural-context",
    request_body = CulturalContextRequest,
    responses((status = 200, description = "Normalized cultural context", body = CulturalContext)),
    tag = "AI"
)]
pub async fn cultural_context(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<CulturalContextRequest>,
) -> ApiResult<Json<Normalized<CulturalContext>>> {
    tracked_normalized(&state, &headers, AiFeature::CulturalContext, state.ai_service.cultural_context(&req)).await
}

/// Price trend prediction
#[utoipa::path(
    post,
    path = "/api/ai/price-prediction",
    request_body = PricePredictionRequest,
    responses((status = 200, description = "Normalized price forecast", body = PriceForecast)),
    tag = "AI"
)]
pub async fn predict_prices(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<PricePredictionRequest>,
) -> ApiResult<Json<Normalized<PriceForecast>>> {
    tracked_normalized(&state, &headers, AiFeature::PricePrediction, state.ai_service.predict_prices(&req)).await
}

/// Trip budget estimate
#[utoipa::path(
    post,
    path = "/api/ai/budget",
    request_body = BudgetRequest,
    responses((status = 200, description = "Normalized budget plan", body = BudgetPlan)),
    tag = "AI"
)]
pub async fn calculate_budget(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<BudgetRequest>,
) -> ApiResult<Json<Normalized<BudgetPlan>>> {
    tracked_normalized(&state, &headers, AiFeature::Budget, state.ai_service.calculate_budget(&req)).await
}

/// Concierge query
#[utoipa::path(
    post,
    path = "/api/ai/concierge",
    request_body = ConciergeRequest,
    responses((status = 200, description = "Normalized concierge reply", body = ConciergeReply)),
    tag = "AI"
)]
pub async fn concierge(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<ConciergeRequest>,
) -> ApiResult<Json<Normalized<ConciergeReply>>> {
    tracked_normalized(&state, &headers, AiFeature::Concierge, state.ai_service.handle_concierge_query(&req)).await
}

/// Destination safety analysis
#[utoipa::path(
    post,
    path = "/api/ai/safety",
    request_body = SafetyRequest,
    responses((status = 200, description = "Normalized safety report", body = SafetyReport)),
    tag = "AI"
)]
pub async fn analyze_safety(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<SafetyRequest>,
) -> ApiResult<Json<Normalized<SafetyReport>>> {
    tracked_normalized(&state, &headers, AiFeature::Safety, state.ai_service.analyze_safety(&req)).await
}

// ============================================================================
// Diagnostics
// ============================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RawPromptRequest {
    #[validate(length(min = 1, max = 20000, message = "prompt must be 1-20000 characters"))]
    pub prompt: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RawPromptResponse {
    pub text: String,
    pub model: String,
}

/// Send a raw prompt to the configured model
#[utoipa::path(
    post,
    path = "/api/ai/generate",
    request_body = RawPromptRequest,
    responses((status = 200, description = "Trimmed completion text", body = RawPromptResponse)),
    tag = "AI Diagnostics"
)]
pub async fn generate_raw(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<RawPromptRequest>,
) -> ApiResult<Json<RawPromptResponse>> {
    req.validate()?;
    let text = tracked(&state, &headers, AiFeature::RawPrompt, state.ai_service.generate_raw(&req.prompt), |_| false)
        .await?;
    Ok(Json(RawPromptResponse { text, model: state.ai_service.model().to_string() }))
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ProbeQuery {
    /// Prompt sent to each candidate (defaults to a fixed hello-world prompt)
    pub prompt: Option<String>,
}

/// Find the first configured model that answers
#[utoipa::path(
    get,
    path = "/api/ai/models/probe",
    params(ProbeQuery),
    responses((status = 200, description = "Per-model probe report", body = ProbeReport)),
    tag = "AI Diagnostics"
)]
pub async fn probe_models(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ProbeQuery>,
) -> Json<ProbeReport> {
    let prompt = query
        .prompt
        .filter(|p| !p.trim().is_empty())
        .unwrap_or_else(|| crate::services::ai::PROBE_PROMPT.to_string());
    let report = state.ai_service.probe_models(&state.probe_models, &prompt).await;
    tracing::info!("Model probe finished: working model = {:?}", report.working_model);
    Json(report)
}

/// Exercise every feature once with sample requests
#[utoipa::path(
    post,
    path = "/api/ai/self-test",
    responses((status = 200, description = "Per-feature self-test results", body = SelfTestReport)),
    tag = "AI Diagnostics"
)]
pub async fn self_test(State(state): State<Arc<AppState>>) -> Json<SelfTestReport> {
    let service: &dyn AiService = state.ai_service.as_ref();
    let report = run_all_features(service, state.self_test_delay).await;
    tracing::info!("Self-test finished: {} passed, {} failed", report.passed, report.failed);
    Json(report)
}
