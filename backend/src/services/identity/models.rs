use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Signed-in user as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AuthUser {
    pub uid: String,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
    /// `password`, `google.com` or `phone`
    pub provider_id: String,
}

/// Result of a successful provider sign-in.
#[derive(Debug, Clone)]
pub struct AuthCredential {
    pub user: AuthUser,
    pub id_token: String,
    pub refresh_token: Option<String>,
    /// Token lifetime in seconds as reported by the provider
    pub expires_in: Option<u64>,
    pub is_new_user: bool,
}

/// Opaque handle for a phone sign-in awaiting its OTP.
#[derive(Debug, Clone, PartialEq)]
pub struct PhoneVerification {
    pub session_info: String,
    pub phone_number: String,
}

#[derive(Debug, Clone)]
pub struct Session {
    pub id: String,
    pub credential: AuthCredential,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Email already in use")]
    EmailExists,

    #[error("Password is too weak: {0}")]
    WeakPassword(String),

    #[error("User account is disabled")]
    UserDisabled,

    #[error("Invalid phone number")]
    InvalidPhoneNumber,

    #[error("Invalid verification code")]
    InvalidVerificationCode,

    #[error("Verification session expired or not found")]
    VerificationExpired,

    #[error("Too many attempts, try again later")]
    TooManyAttempts,

    #[error("Session not found or expired")]
    SessionNotFound,

    #[error("Identity provider is not configured")]
    NotConfigured,

    #[error("Identity provider error: {0}")]
    Provider(String),
}

/// What a client gets back after signing in.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SessionInfo {
    /// Bearer token for subsequent `/api/auth/*` calls
    pub session_id: String,
    pub user: AuthUser,
    pub expires_at: DateTime<Utc>,
    pub is_new_user: bool,
}
