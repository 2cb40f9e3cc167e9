use async_trait::async_trait;

use super::models::{AuthCredential, IdentityError, PhoneVerification};

/// Remote identity backend. Implementations are stateless; sessions live in
/// [`super::SessionStore`].
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthCredential, IdentityError>;

    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthCredential, IdentityError>;

    /// Exchange a federated ID token (e.g. Google) for a credential.
    async fn sign_in_with_oauth(&self, provider_id: &str, id_token: &str) -> Result<AuthCredential, IdentityError>;

    /// Start phone sign-in; the provider texts a code to `phone_number`.
    async fn send_phone_code(
        &self,
        phone_number: &str,
        recaptcha_token: &str,
    ) -> Result<PhoneVerification, IdentityError>;

    async fn confirm_phone_code(
        &self,
        verification: &PhoneVerification,
        code: &str,
    ) -> Result<AuthCredential, IdentityError>;
}
