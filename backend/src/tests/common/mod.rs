// Common test utilities and helpers

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::config::Config;
use crate::{AppState, build_router};

pub const GEMINI_KEY: &str = "test-gemini-key";
pub const IDENTITY_KEY: &str = "test-identity-key";
pub const MODEL: &str = "gemini-2.5-flash";

/// Config pointing both upstreams at mock servers.
pub fn test_config(gemini: &MockServer, identity: &MockServer) -> Config {
    let mut config = Config::default();
    config.ai.api_key = Some(GEMINI_KEY.to_string());
    config.ai.base_url = gemini.uri();
    config.ai.model = MODEL.to_string();
    config.ai.timeout_secs = 5;
    config.ai.self_test_delay_secs = 0;
    config.identity.api_key = Some(IDENTITY_KEY.to_string());
    config.identity.base_url = identity.uri();
    config
}

pub fn create_test_app(config: Config) -> (Router, Arc<AppState>) {
    let state = Arc::new(AppState::from_config(config).expect("Failed to build app state"));
    (build_router(Arc::clone(&state)), state)
}

/// Start both mock servers and build the app against them.
pub async fn setup() -> (MockServer, MockServer, Router) {
    let gemini = MockServer::start().await;
    let identity = MockServer::start().await;
    let (app, _) = create_test_app(test_config(&gemini, &identity));
    (gemini, identity, app)
}

// ============================================================================
// Gemini mocks
// ============================================================================

pub fn gemini_text(text: &str) -> Value {
    json!({
        "candidates": [{
            "content": {"role": "model", "parts": [{"text": text}]},
            "finishReason": "STOP"
        }],
        "usageMetadata": {"promptTokenCount": 10, "candidatesTokenCount": 20, "totalTokenCount": 30}
    })
}

pub fn gemini_error(code: u16, status: &str, message: &str, reason: Option<&str>) -> Value {
    let details = match reason {
        Some(reason) => json!([{"@type": "type.googleapis.com/google.rpc.ErrorInfo", "reason": reason}]),
        None => json!([]),
    };
    json!({"error": {"code": code, "message": message, "status": status, "details": details}})
}

pub async fn mount_gemini(server: &MockServer, model: &str, response: ResponseTemplate) {
    Mock::given(method("POST"))
        .and(path(format!("/v1beta/models/{}:generateContent", model)))
        .and(query_param("key", GEMINI_KEY))
        .respond_with(response)
        .mount(server)
        .await;
}

// ============================================================================
// Identity Toolkit mocks
// ============================================================================

pub fn identity_token(uid: &str, email: &str) -> Value {
    json!({
        "localId": uid,
        "email": email,
        "idToken": format!("id-token-{}", uid),
        "refreshToken": "refresh",
        "expiresIn": "3600"
    })
}

pub fn identity_error(message: &str) -> Value {
    json!({"error": {"code": 400, "message": message, "errors": []}})
}

pub async fn mount_identity(server: &MockServer, rpc: &str, response: ResponseTemplate) {
    Mock::given(method("POST"))
        .and(path(format!("/accounts:{}", rpc)))
        .and(query_param("key", IDENTITY_KEY))
        .respond_with(response)
        .mount(server)
        .await;
}

// ============================================================================
// Requests
// ============================================================================

pub fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("Failed to build request")
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).expect("Failed to build request")
}

pub fn with_header(mut req: Request<Body>, name: &'static str, value: &str) -> Request<Body> {
    req.headers_mut().insert(name, value.parse().expect("Invalid header value"));
    req
}

/// Send a request through the router and decode the JSON body.
pub async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(req).await.expect("Router call failed");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("Failed to read body");
    let body = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap_or(Value::Null) };
    (status, body)
}
