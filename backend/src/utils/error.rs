use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rust_i18n::t;
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use super::i18n::get_locale;
use crate::services::ai::{AiError, AiFeature, ErrorCategory};
use crate::services::identity::IdentityError;

/// API Error with rich context and automatic error trait implementations
///
/// Each variant carries a numeric code (`error_code`), an HTTP status and a
/// localized message.
#[derive(Error, Debug)]
pub enum ApiError {
    // Authentication errors 1xxx
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Session not found or expired")]
    SessionNotFound,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Email already in use")]
    EmailExists,

    #[error("Invalid verification code")]
    InvalidVerificationCode,

    #[error("Verification expired")]
    VerificationExpired,

    #[error("Identity provider error: {0}")]
    IdentityProvider(String),

    // AI feature errors 2xxx
    #[error("AI auth error: {0}")]
    AiAuth(String),

    #[error("AI quota exceeded: {0}")]
    AiQuota(String),

    #[error("AI content filtered: {0}")]
    AiSafetyFilter(String),

    #[error("AI network error: {0}")]
    AiNetwork(String),

    #[error("AI generation failed: {0}")]
    AiUnknown(String),

    #[error("A {0} request is already in progress")]
    RequestInProgress(AiFeature),

    // Validation errors 4xxx
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Too many attempts")]
    TooManyAttempts,

    // System errors 5xxx
    #[error("Service not configured: {0}")]
    NotConfigured(String),
}

impl ApiError {
    /// Helper to create unauthorized error
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized(message.into())
    }

    /// Helper to create validation error
    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::ValidationError(message.into())
    }

    pub fn error_code(&self) -> i32 {
        match self {
            // Authentication errors 1xxx
            Self::Unauthorized(_) => 1001,
            Self::SessionNotFound => 1002,
            Self::InvalidCredentials => 1003,
            Self::EmailExists => 1004,
            Self::InvalidVerificationCode => 1005,
            Self::VerificationExpired => 1006,
            Self::IdentityProvider(_) => 1007,

            // AI feature errors 2xxx
            Self::AiAuth(_) => 2001,
            Self::AiQuota(_) => 2002,
            Self::AiSafetyFilter(_) => 2003,
            Self::AiNetwork(_) => 2004,
            Self::AiUnknown(_) => 2005,
            Self::RequestInProgress(_) => 2006,

            // Validation errors 4xxx
            Self::ValidationError(_) => 4001,
            Self::TooManyAttempts => 4003,

            // System errors 5xxx
            Self::NotConfigured(_) => 5002,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized(_) | Self::SessionNotFound | Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::EmailExists | Self::RequestInProgress(_) => StatusCode::CONFLICT,
            Self::InvalidVerificationCode | Self::VerificationExpired => StatusCode::BAD_REQUEST,
            Self::IdentityProvider(_) | Self::AiAuth(_) | Self::AiNetwork(_) | Self::AiUnknown(_) => {
                StatusCode::BAD_GATEWAY
            },
            Self::AiQuota(_) | Self::TooManyAttempts => StatusCode::TOO_MANY_REQUESTS,
            Self::AiSafetyFilter(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::ValidationError(_) => StatusCode::BAD_REQUEST,
            Self::NotConfigured(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Category of an upstream AI failure, echoed in the response details.
    pub fn ai_category(&self) -> Option<ErrorCategory> {
        match self {
            Self::AiAuth(_) => Some(ErrorCategory::AuthError),
            Self::AiQuota(_) => Some(ErrorCategory::QuotaError),
            Self::AiSafetyFilter(_) => Some(ErrorCategory::SafetyFilterError),
            Self::AiNetwork(_) => Some(ErrorCategory::NetworkError),
            Self::AiUnknown(_) => Some(ErrorCategory::UnknownError),
            _ => None,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ApiErrorResponse {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Get localized error message based on current locale
    pub fn localized_message(&self) -> String {
        let locale = get_locale();
        match self {
            Self::Unauthorized(msg) => {
                if msg.contains("Missing authorization header") {
                    t!("auth.missing_header", locale = &locale).to_string()
                } else if msg.contains("Invalid authorization header") {
                    t!("auth.invalid_header", locale = &locale).to_string()
                } else {
                    msg.clone()
                }
            },
            Self::SessionNotFound => t!("auth.session_not_found", locale = &locale).to_string(),
            Self::InvalidCredentials => t!("auth.invalid_credentials", locale = &locale).to_string(),
            Self::EmailExists => t!("auth.email_exists", locale = &locale).to_string(),
            Self::InvalidVerificationCode => t!("auth.invalid_code", locale = &locale).to_string(),
            Self::VerificationExpired => t!("auth.verification_expired", locale = &locale).to_string(),
            Self::IdentityProvider(msg) => {
                t!("auth.provider_error", locale = &locale, message = msg).to_string()
            },
            Self::AiAuth(_) => t!("ai.auth_error", locale = &locale).to_string(),
            Self::AiQuota(_) => t!("ai.quota_error", locale = &locale).to_string(),
            Self::AiSafetyFilter(_) => t!("ai.safety_filter_error", locale = &locale).to_string(),
            Self::AiNetwork(msg) => t!("ai.network_error", locale = &locale, message = msg).to_string(),
            Self::AiUnknown(msg) => t!("ai.unknown_error", locale = &locale, message = msg).to_string(),
            Self::RequestInProgress(feature) => {
                t!("ai.request_in_progress", locale = &locale, feature = feature.as_str()).to_string()
            },
            Self::ValidationError(details) => {
                t!("validation.failed", locale = &locale, details = details).to_string()
            },
            Self::TooManyAttempts => t!("auth.too_many_attempts", locale = &locale).to_string(),
            Self::NotConfigured(what) => t!("internal.not_configured", locale = &locale, what = what).to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        } else {
            tracing::debug!("Request rejected: {}", self);
        }

        let details = self
            .ai_category()
            .map(|category| serde_json::json!({ "category": category.as_str(), "reason": self.to_string() }));
        let response = ApiErrorResponse { code: self.error_code(), message: self.localized_message(), details };

        (status, Json(response)).into_response()
    }
}

impl From<AiError> for ApiError {
    fn from(err: AiError) -> Self {
        match err {
            AiError::Auth(msg) => Self::AiAuth(msg),
            AiError::Quota(msg) => Self::AiQuota(msg),
            AiError::SafetyFilter(msg) => Self::AiSafetyFilter(msg),
            AiError::Network(msg) => Self::AiNetwork(msg),
            AiError::Unknown(msg) => Self::AiUnknown(msg),
            AiError::Busy(feature) => Self::RequestInProgress(feature),
            AiError::InvalidRequest(msg) => Self::ValidationError(msg),
        }
    }
}

impl From<IdentityError> for ApiError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::InvalidCredentials | IdentityError::UserDisabled => Self::InvalidCredentials,
            IdentityError::EmailExists => Self::EmailExists,
            IdentityError::WeakPassword(msg) => Self::ValidationError(msg),
            IdentityError::InvalidPhoneNumber => Self::ValidationError(err.to_string()),
            IdentityError::InvalidVerificationCode => Self::InvalidVerificationCode,
            IdentityError::VerificationExpired => Self::VerificationExpired,
            IdentityError::TooManyAttempts => Self::TooManyAttempts,
            IdentityError::SessionNotFound => Self::SessionNotFound,
            IdentityError::NotConfigured => Self::NotConfigured("identity provider".to_string()),
            IdentityError::Provider(msg) => Self::IdentityProvider(msg),
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(err: validator::ValidationErrors) -> Self {
        ApiError::validation_error(err.to_string())
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ai_error_mapping() {
        let err: ApiError = AiError::Quota("QUOTA exceeded".into()).into();
        assert_eq!(err.status_code(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(err.ai_category(), Some(ErrorCategory::QuotaError));

        let err: ApiError = AiError::Busy(AiFeature::Budget).into();
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        assert_eq!(err.ai_category(), None);

        let err: ApiError = AiError::SafetyFilter("SAFETY".into()).into();
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);

        let err: ApiError = AiError::Auth("no key".into()).into();
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_identity_error_mapping() {
        let err: ApiError = IdentityError::EmailExists.into();
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        let err: ApiError = IdentityError::InvalidVerificationCode.into();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        let err: ApiError = IdentityError::SessionNotFound.into();
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_localized_messages() {
        crate::utils::i18n::with_locale_sync("en", || {
            assert_eq!(
                ApiError::AiQuota("x".into()).localized_message(),
                "API quota exceeded. Please try again later or check your Gemini API usage."
            );
        });
        crate::utils::i18n::with_locale_sync("es", || {
            assert!(ApiError::AiQuota("x".into()).localized_message().contains("cuota"));
        });
    }
}
