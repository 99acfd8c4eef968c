/**
 * Authentication Middleware
 *
 * Protects the REST routes: extracts the bearer token from the
 * Authorization header, verifies it, checks the user still exists in the
 * directory, and attaches the resolved identity to request extensions.
 */

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::auth::sessions::user_id_from_token;
use crate::error::CoreError;
use crate::server::state::AppState;

/// Authenticated identity resolved from the bearer token.
#[derive(Clone, Copy, Debug)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
}

/// Middleware guarding the `/api` routes. Returns 401 if the token is
/// missing, invalid, or names an unknown user.
pub async fn auth_middleware(
    State(app_state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, CoreError> {
    let auth_header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| {
            tracing::warn!("missing Authorization header");
            CoreError::unauthorized("Missing Authorization header")
        })?;

    let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
        tracing::warn!("malformed Authorization header");
        CoreError::unauthorized("Invalid Authorization header format")
    })?;

    let user_id = user_id_from_token(token)?;

    if !app_state.directory.exists(user_id).await? {
        tracing::warn!(%user_id, "token names unknown user");
        return Err(CoreError::unauthorized("Unknown user"));
    }

    request.extensions_mut().insert(AuthenticatedUser { user_id });

    Ok(next.run(request).await)
}

/// Extractor for the authenticated user placed by `auth_middleware`.
#[derive(Clone, Copy, Debug)]
pub struct AuthUser(pub AuthenticatedUser);

impl axum::extract::FromRequestParts<AppState> for AuthUser {
    type Rejection = CoreError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = parts
            .extensions
            .get::<AuthenticatedUser>()
            .copied()
            .ok_or_else(|| {
                tracing::warn!("AuthenticatedUser not found in request extensions");
                CoreError::unauthorized("Not authenticated")
            })?;

        Ok(AuthUser(user))
    }
}
