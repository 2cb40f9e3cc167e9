pub mod auth;
pub mod locale;

pub use auth::{AuthState, SessionId, auth_middleware};
pub use locale::locale_middleware;
