use axum::{Extension, Json, extract::State};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use validator::Validate;

use crate::AppState;
use crate::middleware::SessionId;
use crate::services::identity::{AuthUser, SessionInfo};
use crate::utils::ApiResult;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SignInRequest {
    #[validate(email(message = "invalid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "password is required"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SignUpRequest {
    #[validate(email(message = "invalid email address"))]
    pub email: String,
    #[validate(length(min = 6, message = "password must be at least 6 characters"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GoogleSignInRequest {
    /// Google ID token obtained by the client
    #[validate(length(min = 1, message = "idToken is required"))]
    pub id_token: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PhoneStartRequest {
    /// E.164 phone number, e.g. +15555550100
    #[validate(length(min = 8, max = 16, message = "phoneNumber must be E.164"))]
    pub phone_number: String,
    #[validate(length(min = 1, message = "recaptchaToken is required"))]
    pub recaptcha_token: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PhoneStartResponse {
    pub verification_id: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PhoneConfirmRequest {
    #[validate(length(min = 1, message = "verificationId is required"))]
    pub verification_id: String,
    #[validate(length(min = 4, max = 8, message = "code must be 4-8 digits"))]
    pub code: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LogoutResponse {
    pub success: bool,
}

// Sign in with email and password
#[utoipa::path(
    post,
    path = "/api/auth/sign-in",
    request_body = SignInRequest,
    responses(
        (status = 200, description = "Signed in", body = SessionInfo),
        (status = 401, description = "Invalid credentials")
    ),
    tag = "Authentication"
)]
pub async fn sign_in(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SignInRequest>,
) -> ApiResult<Json<SessionInfo>> {
    req.validate()?;
    tracing::info!("Sign-in attempt for {}", req.email);
    let info = state.session_store.sign_in(&req.email, &req.password).await?;
    Ok(Json(info))
}

// Create an email/password account and sign in
#[utoipa::path(
    post,
    path = "/api/auth/sign-up",
    request_body = SignUpRequest,
    responses(
        (status = 200, description = "Account created", body = SessionInfo),
        (status = 400, description = "Validation error"),
        (status = 409, description = "Email already in use")
    ),
    tag = "Authentication"
)]
pub async fn sign_up(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SignUpRequest>,
) -> ApiResult<Json<SessionInfo>> {
    req.validate()?;
    tracing::info!("Sign-up attempt for {}", req.email);
    let info = state.session_store.sign_up(&req.email, &req.password).await?;
    Ok(Json(info))
}

// Sign in with a Google ID token
#[utoipa::path(
    post,
    path = "/api/auth/google",
    request_body = GoogleSignInRequest,
    responses((status = 200, description = "Signed in", body = SessionInfo)),
    tag = "Authentication"
)]
pub async fn sign_in_with_google(
    State(state): State<Arc<AppState>>,
    Json(req): Json<GoogleSignInRequest>,
) -> ApiResult<Json<SessionInfo>> {
    req.validate()?;
    let info = state.session_store.sign_in_with_google(&req.id_token).await?;
    Ok(Json(info))
}

// Send an OTP to a phone number
#[utoipa::path(
    post,
    path = "/api/auth/phone/start",
    request_body = PhoneStartRequest,
    responses((status = 200, description = "Code sent", body = PhoneStartResponse)),
    tag = "Authentication"
)]
pub async fn start_phone_sign_in(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PhoneStartRequest>,
) -> ApiResult<Json<PhoneStartResponse>> {
    req.validate()?;
    let verification_id = state
        .session_store
        .sign_in_with_phone(&req.phone_number, &req.recaptcha_token)
        .await?;
    Ok(Json(PhoneStartResponse { verification_id }))
}

// Confirm the OTP and open a session
#[utoipa::path(
    post,
    path = "/api/auth/phone/confirm",
    request_body = PhoneConfirmRequest,
    responses(
        (status = 200, description = "Signed in", body = SessionInfo),
        (status = 400, description = "Invalid or expired code")
    ),
    tag = "Authentication"
)]
pub async fn confirm_phone_sign_in(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PhoneConfirmRequest>,
) -> ApiResult<Json<SessionInfo>> {
    req.validate()?;
    let info = state.session_store.confirm_phone_sign_in(&req.verification_id, &req.code).await?;
    Ok(Json(info))
}

// End the current session
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses((status = 200, description = "Signed out", body = LogoutResponse)),
    security(("bearer_auth" = [])),
    tag = "Authentication"
)]
pub async fn logout(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<SessionId>,
) -> Json<LogoutResponse> {
    state.session_store.logout(&session.0);
    Json(LogoutResponse { success: true })
}

// Get the signed-in user
#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses(
        (status = 200, description = "Current user", body = AuthUser),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Authentication"
)]
pub async fn get_me(Extension(user): Extension<AuthUser>) -> Json<AuthUser> {
    tracing::debug!("Current user lookup: {}", user.uid);
    Json(user)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_up_validation() {
        let weak = SignUpRequest { email: "a@example.com".into(), password: "123".into() };
        assert!(weak.validate().is_err());

        let bad_email = SignUpRequest { email: "not-an-email".into(), password: "123456".into() };
        assert!(bad_email.validate().is_err());

        let ok = SignUpRequest { email: "a@example.com".into(), password: "123456".into() };
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn test_phone_requests_use_camel_case() {
        let req: PhoneConfirmRequest =
            serde_json::from_str(r#"{"verificationId":"v-1","code":"123456"}"#).unwrap();
        assert_eq!(req.verification_id, "v-1");
        assert!(req.validate().is_ok());
    }
}
