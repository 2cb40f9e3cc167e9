//! Identity Toolkit (Firebase Auth) REST client.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::{debug, warn};

use super::models::{AuthCredential, AuthUser, IdentityError, PhoneVerification};
use super::provider::IdentityProvider;
use crate::config::IdentityConfig;

/// Map an Identity Toolkit error message onto [`IdentityError`].
///
/// Messages look like `WEAK_PASSWORD : Password should be at least 6 characters`.
pub fn map_provider_error(message: &str) -> IdentityError {
    let (code, detail) = match message.split_once(':') {
        Some((code, detail)) => (code.trim(), detail.trim()),
        None => (message.trim(), ""),
    };

    match code {
        "EMAIL_EXISTS" => IdentityError::EmailExists,
        "EMAIL_NOT_FOUND" | "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS" | "INVALID_EMAIL"
        | "INVALID_IDP_RESPONSE" => IdentityError::InvalidCredentials,
        "USER_DISABLED" => IdentityError::UserDisabled,
        "WEAK_PASSWORD" => IdentityError::WeakPassword(detail.to_string()),
        "INVALID_PHONE_NUMBER" => IdentityError::InvalidPhoneNumber,
        "INVALID_CODE" => IdentityError::InvalidVerificationCode,
        "SESSION_EXPIRED" | "INVALID_SESSION_INFO" => IdentityError::VerificationExpired,
        "TOO_MANY_ATTEMPTS_TRY_LATER" => IdentityError::TooManyAttempts,
        _ => IdentityError::Provider(message.to_string()),
    }
}

/// Form-encoded `postBody` for `accounts:signInWithIdp`.
pub fn oauth_post_body(provider_id: &str, id_token: &str) -> String {
    format!("id_token={}&providerId={}", urlencoding::encode(id_token), urlencoding::encode(provider_id))
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenResponse {
    local_id: String,
    id_token: String,
    refresh_token: Option<String>,
    expires_in: Option<String>,
    email: Option<String>,
    display_name: Option<String>,
    photo_url: Option<String>,
    phone_number: Option<String>,
    #[serde(default)]
    is_new_user: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SendCodeResponse {
    session_info: String,
}

pub struct FirebaseIdentity {
    http: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
    request_uri: String,
}

impl FirebaseIdentity {
    pub fn new(config: &IdentityConfig) -> Result<Self, IdentityError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| IdentityError::Provider(e.to_string()))?;

        Ok(Self {
            http,
            api_key: config.api_key.clone().filter(|k| !k.trim().is_empty()),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            request_uri: config.request_uri.clone(),
        })
    }

    async fn call<T: for<'de> Deserialize<'de>>(&self, method: &str, body: Value) -> Result<T, IdentityError> {
        let api_key = self.api_key.as_deref().ok_or(IdentityError::NotConfigured)?;
        let url = format!("{}/accounts:{}", self.base_url, method);
        debug!("Identity Toolkit call accounts:{}", method);

        let resp = self
            .http
            .post(&url)
            .query(&[("key", api_key)])
            .json(&body)
            .send()
            .await
            .map_err(|e| IdentityError::Provider(e.to_string()))?;

        let status = resp.status();
        let raw = resp.text().await.map_err(|e| IdentityError::Provider(e.to_string()))?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorEnvelope>(&raw)
                .map(|e| e.error.message)
                .unwrap_or_else(|_| format!("HTTP {}", status));
            warn!(%status, "Identity Toolkit accounts:{} failed: {}", method, message);
            return Err(map_provider_error(&message));
        }

        serde_json::from_str(&raw).map_err(|e| IdentityError::Provider(format!("unreadable response: {}", e)))
    }

    fn credential(resp: TokenResponse, provider_id: &str) -> AuthCredential {
        AuthCredential {
            user: AuthUser {
                uid: resp.local_id,
                email: resp.email,
                phone_number: resp.phone_number,
                display_name: resp.display_name,
                photo_url: resp.photo_url,
                provider_id: provider_id.to_string(),
            },
            id_token: resp.id_token,
            refresh_token: resp.refresh_token,
            expires_in: resp.expires_in.and_then(|s| s.parse().ok()),
            is_new_user: resp.is_new_user,
        }
    }
}

#[async_trait]
impl IdentityProvider for FirebaseIdentity {
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthCredential, IdentityError> {
        let resp: TokenResponse = self
            .call("signInWithPassword", json!({"email": email, "password": password, "returnSecureToken": true}))
            .await?;
        Ok(Self::credential(resp, "password"))
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthCredential, IdentityError> {
        let resp: TokenResponse = self
            .call("signUp", json!({"email": email, "password": password, "returnSecureToken": true}))
            .await?;
        let mut credential = Self::credential(resp, "password");
        credential.is_new_user = true;
        Ok(credential)
    }

    async fn sign_in_with_oauth(&self, provider_id: &str, id_token: &str) -> Result<AuthCredential, IdentityError> {
        let post_body = oauth_post_body(provider_id, id_token);
        let resp: TokenResponse = self
            .call(
                "signInWithIdp",
                json!({
                    "postBody": post_body,
                    "requestUri": self.request_uri,
                    "returnSecureToken": true,
                    "returnIdpCredential": true,
                }),
            )
            .await?;
        Ok(Self::credential(resp, provider_id))
    }

    async fn send_phone_code(
        &self,
        phone_number: &str,
        recaptcha_token: &str,
    ) -> Result<PhoneVerification, IdentityError> {
        let resp: SendCodeResponse = self
            .call(
                "sendVerificationCode",
                json!({"phoneNumber": phone_number, "recaptchaToken": recaptcha_token}),
            )
            .await?;
        Ok(PhoneVerification { session_info: resp.session_info, phone_number: phone_number.to_string() })
    }

    async fn confirm_phone_code(
        &self,
        verification: &PhoneVerification,
        code: &str,
    ) -> Result<AuthCredential, IdentityError> {
        let resp: TokenResponse = self
            .call("signInWithPhoneNumber", json!({"sessionInfo": verification.session_info, "code": code}))
            .await?;
        let mut credential = Self::credential(resp, "phone");
        if credential.user.phone_number.is_none() {
            credential.user.phone_number = Some(verification.phone_number.clone());
        }
        Ok(credential)
    }
}
