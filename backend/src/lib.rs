//! WayStay backend: AI travel features behind a normalization layer, plus an
//! identity pass-through that turns provider credentials into bearer sessions.

rust_i18n::i18n!("locales", fallback = "en");

pub mod config;
pub mod handlers;
pub mod middleware;
pub mod services;
pub mod utils;

#[cfg(test)]
mod tests;

use axum::{
    Router,
    middleware as axum_middleware,
    routing::{get, post},
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::{
    Modify, OpenApi,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};
use utoipa_swagger_ui::SwaggerUi;

use crate::config::Config;
use crate::services::ai::{AiService, AiServiceImpl, GeminiClient, GenerativeClient, RequestTracker};
use crate::services::identity::{FirebaseIdentity, IdentityProvider, SessionStore};

/// Shared state handed to every handler.
pub struct AppState {
    pub config: Config,
    pub ai_service: Arc<dyn AiService>,
    pub request_tracker: Arc<RequestTracker>,
    pub session_store: Arc<SessionStore>,
    pub probe_models: Vec<String>,
    pub self_test_delay: Duration,
}

impl AppState {
    /// Wire the real Gemini and Identity Toolkit clients from configuration.
    pub fn from_config(config: Config) -> anyhow::Result<Self> {
        let client: Arc<dyn GenerativeClient> = Arc::new(GeminiClient::new(&config.ai)?);
        let provider: Arc<dyn IdentityProvider> = Arc::new(FirebaseIdentity::new(&config.identity)?);
        Ok(Self::with_components(config, client, provider))
    }

    pub fn with_components(
        config: Config,
        client: Arc<dyn GenerativeClient>,
        provider: Arc<dyn IdentityProvider>,
    ) -> Self {
        let ai_service = Arc::new(AiServiceImpl::new(client, config.ai.fallback.clone()));
        let session_store =
            Arc::new(SessionStore::new(provider, Duration::from_secs(config.identity.session_ttl_secs)));

        Self {
            probe_models: config.ai.probe_models.clone(),
            self_test_delay: Duration::from_secs(config.ai.self_test_delay_secs),
            ai_service,
            request_tracker: Arc::new(RequestTracker::new()),
            session_store,
            config,
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health,
        handlers::auth::sign_in,
        handlers::auth::sign_up,
        handlers::auth::sign_in_with_google,
        handlers::auth::start_phone_sign_in,
        handlers::auth::confirm_phone_sign_in,
        handlers::auth::logout,
        handlers::auth::get_me,
        handlers::ai::get_status,
        handlers::ai::list_requests,
        handlers::ai::generate_itinerary,
        handlers::ai::mood_recommendations,
        handlers::ai::translate,
        handlers::ai::cultural_context,
        handlers::ai::predict_prices,
        handlers::ai::calculate_budget,
        handlers::ai::concierge,
        handlers::ai::analyze_safety,
        handlers::ai::generate_raw,
        handlers::ai::probe_models,
        handlers::ai::self_test,
    ),
    components(schemas(
        handlers::HealthResponse,
        handlers::auth::SignInRequest,
        handlers::auth::SignUpRequest,
        handlers::auth::GoogleSignInRequest,
        handlers::auth::PhoneStartRequest,
        handlers::auth::PhoneStartResponse,
        handlers::auth::PhoneConfirmRequest,
        handlers::auth::LogoutResponse,
        handlers::ai::AiStatusResponse,
        handlers::ai::TranslationResponse,
        handlers::ai::RawPromptRequest,
        handlers::ai::RawPromptResponse,
        services::identity::AuthUser,
        services::identity::SessionInfo,
        services::ai::AiFeature,
        services::ai::ErrorCategory,
        services::ai::FeatureState,
        services::ai::RequestState,
        services::ai::ProbeAttempt,
        services::ai::ProbeReport,
        services::ai::FeatureCheck,
        services::ai::SelfTestReport,
        services::ai::ItineraryRequest,
        services::ai::ItineraryPlan,
        services::ai::DayPlan,
        services::ai::AccommodationSuggestion,
        services::ai::MoodRequest,
        services::ai::MoodRecommendations,
        services::ai::MoodMatch,
        services::ai::TranslationRequest,
        services::ai::CulturalContextRequest,
        services::ai::CulturalContext,
        services::ai::PricePredictionRequest,
        services::ai::PriceForecast,
        services::ai::ForecastPoint,
        services::ai::BookingAdvice,
        services::ai::BudgetRequest,
        services::ai::BudgetPlan,
        services::ai::CostItem,
        services::ai::BudgetOptimization,
        services::ai::ConciergeRequest,
        services::ai::ConciergeContext,
        services::ai::ConciergeReply,
        services::ai::SafetyRequest,
        services::ai::SafetyReport,
        services::ai::CrimeAnalysis,
        utils::ApiErrorResponse,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "System", description = "Service health"),
        (name = "Authentication", description = "Sign-in flows and sessions"),
        (name = "AI", description = "Travel AI features"),
        (name = "AI Diagnostics", description = "Model probe, raw prompt and self-test"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
            );
        }
    }
}

/// Build the full application router.
pub fn build_router(state: Arc<AppState>) -> Router {
    let auth_state = middleware::AuthState { session_store: Arc::clone(&state.session_store) };

    let protected = Router::new()
        .route("/api/auth/me", get(handlers::auth::get_me))
        .route("/api/auth/logout", post(handlers::auth::logout))
        .layer(axum_middleware::from_fn_with_state(auth_state, middleware::auth_middleware));

    let public = Router::new()
        .route("/health", get(handlers::health))
        .route("/api/auth/sign-in", post(handlers::auth::sign_in))
        .route("/api/auth/sign-up", post(handlers::auth::sign_up))
        .route("/api/auth/google", post(handlers::auth::sign_in_with_google))
        .route("/api/auth/phone/start", post(handlers::auth::start_phone_sign_in))
        .route("/api/auth/phone/confirm", post(handlers::auth::confirm_phone_sign_in))
        .route("/api/ai/status", get(handlers::ai::get_status))
        .route("/api/ai/requests", get(handlers::ai::list_requests))
        .route("/api/ai/itinerary", post(handlers::ai::generate_itinerary))
        .route("/api/ai/recommendations/mood", post(handlers::ai::mood_recommendations))
        .route("/api/ai/translate", post(handlers::ai::translate))
        .route("/api/ai/cultural-context", post(handlers::ai::cultural_context))
        .route("/api/ai/price-prediction", post(handlers::ai::predict_prices))
        .route("/api/ai/budget", post(handlers::ai::calculate_budget))
        .route("/api/ai/concierge", post(handlers::ai::concierge))
        .route("/api/ai/safety", post(handlers::ai::analyze_safety))
        .route("/api/ai/generate", post(handlers::ai::generate_raw))
        .route("/api/ai/models/probe", get(handlers::ai::probe_models))
        .route("/api/ai/self-test", post(handlers::ai::self_test));

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public)
        .merge(protected)
        .with_state(state)
        .layer(axum_middleware::from_fn(middleware::locale_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
}
