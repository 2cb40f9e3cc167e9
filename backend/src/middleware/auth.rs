use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use crate::services::identity::SessionStore;
use crate::utils::ApiError;

#[derive(Clone)]
pub struct AuthState {
    pub session_store: Arc<SessionStore>,
}

/// Session id of an authenticated request, inserted into extensions.
#[derive(Debug, Clone)]
pub struct SessionId(pub String);

/// Bearer session middleware.
/// 1. Read `Authorization: Bearer <session id>`
/// 2. Resolve it through the session store (expired sessions are rejected)
/// 3. Insert the `AuthUser` and `SessionId` into request extensions
pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let uri = req.uri().to_string();
    let method = req.method().to_string();

    tracing::debug!("Auth middleware processing: {} {}", method, uri);

    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| {
            tracing::warn!("Missing authorization header for {} {}", method, uri);
            ApiError::unauthorized("Missing authorization header")
        })?;

    let session_id = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
        tracing::warn!("Invalid authorization header format for {} {}", method, uri);
        ApiError::unauthorized("Invalid authorization header format")
    })?;
    let session_id = session_id.trim().to_string();

    let user = state.session_store.current_user(&session_id).map_err(|err| {
        tracing::warn!("Session lookup failed for {} {}: {}", method, uri, err);
        ApiError::from(err)
    })?;

    tracing::debug!("Session verified for user {} on {} {}", user.uid, method, uri);

    req.extensions_mut().insert(user);
    req.extensions_mut().insert(SessionId(session_id));

    Ok(next.run(req).await)
}
