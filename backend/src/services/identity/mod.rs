//! Identity Service Module
//!
//! Email/password, Google and phone (OTP) sign-in through a pluggable
//! [`IdentityProvider`], with sessions owned by [`SessionStore`].

mod firebase;
mod models;
mod provider;
mod session;

pub use firebase::{FirebaseIdentity, map_provider_error};
pub use models::*;
pub use provider::IdentityProvider;
pub use session::SessionStore;
