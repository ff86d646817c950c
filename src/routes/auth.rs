//! Session extractors and access error mapping.

use axum::extract::FromRef;
use axum::http::{HeaderMap, StatusCode};
use axum_extra::extract::cookie::{Cookie, CookieJar};

use super::SESSION_COOKIE;
use crate::services::access::{AccessError, Viewer};
use crate::state::AppState;

// =============================================================================
// AUTH EXTRACTORS
// =============================================================================

/// Authenticated user extracted from the session cookie.
/// Use as a handler parameter to require authentication.
pub struct AuthUser {
    pub viewer: Viewer,
}

impl<S> axum::extract::FromRequestParts<S> for AuthUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut axum::http::request::Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        let viewer = session_viewer(&app_state, &parts.headers)
            .await?
            .ok_or(AccessError::Unauthenticated)
            .map_err(access_error_to_status)?;
        Ok(Self { viewer })
    }
}

/// Session user if the request carries a valid session, `None` for guests.
pub struct MaybeAuthUser(pub Option<Viewer>);

impl<S> axum::extract::FromRequestParts<S> for MaybeAuthUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut axum::http::request::Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        Ok(Self(session_viewer(&app_state, &parts.headers).await?))
    }
}

async fn session_viewer(state: &AppState, headers: &HeaderMap) -> Result<Option<Viewer>, StatusCode> {
    let jar = CookieJar::from_headers(headers);
    let token = jar.get(SESSION_COOKIE).map(Cookie::value).unwrap_or_default();
    if token.is_empty() {
        return Ok(None);
    }

    state
        .access
        .resolve_session(token)
        .await
        .map_err(access_error_to_status)
}

pub(crate) fn access_error_to_status(err: AccessError) -> StatusCode {
    match err {
        AccessError::Unauthenticated => StatusCode::UNAUTHORIZED,
        AccessError::Forbidden(_) => StatusCode::FORBIDDEN,
        AccessError::Database(e) => {
            tracing::error!(error = %e, "access lookup failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
