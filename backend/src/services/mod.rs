pub mod ai;
pub mod identity;

pub use ai::{AiService, AiServiceImpl, GeminiClient, GenerativeClient, RequestTracker};
pub use identity::{FirebaseIdentity, IdentityProvider, SessionStore};
