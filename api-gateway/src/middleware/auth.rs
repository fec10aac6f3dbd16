// ==============================================================================
// middleware/auth.rs - Bearer Token Authentication
// ==============================================================================
// Description: Token-verification gate and the AuthUser extractor
// Created: 2026-10-18
// Modified: 2026-10-18
// Version: 1.0.0
// ==============================================================================
//
// Security: protected mounts (payments, GraphQL) are wrapped in
// `require_bearer`. A request without a valid token is answered with 401 here
// and never reaches a handler. The credential is read from
// `Authorization: Bearer <jwt>`, falling back to the `access_token` cookie set
// by login.
//
// ==============================================================================

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use axum_extra::{
    extract::CookieJar,
    headers::{authorization::Bearer, Authorization, HeaderMapExt},
};
use tracing::debug;
use uuid::Uuid;

use crate::error::{AppError, AuthFailureReason};
use crate::state::AppState;
use crate::tokens::TokenService;

/// Cookie carrying the session token
pub const ACCESS_TOKEN_COOKIE: &str = "access_token";

/// Authenticated user resolved from a bearer token
///
/// Inserted into request extensions by `require_bearer`; usable as an
/// extractor on any route (it verifies the token itself when the gate did not
/// run).
///
/// # Example
/// ```rust,ignore
/// async fn my_handler(user: AuthUser) -> impl IntoResponse {
///     format!("Hello, {}!", user.name)
/// }
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
    pub name: String,
}

/// Pull the raw token out of the request headers
fn bearer_token(headers: &HeaderMap) -> Result<String, AuthFailureReason> {
    if headers.contains_key(AUTHORIZATION) {
        return headers
            .typed_get::<Authorization<Bearer>>()
            .map(|auth| auth.token().to_string())
            .ok_or(AuthFailureReason::InvalidToken);
    }

    CookieJar::from_headers(headers)
        .get(ACCESS_TOKEN_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .filter(|token| !token.is_empty())
        .ok_or(AuthFailureReason::MissingToken)
}

/// Verify the request's credential and resolve the user
pub fn authenticate(headers: &HeaderMap, tokens: &TokenService) -> Result<AuthUser, AppError> {
    let token = bearer_token(headers).map_err(AppError::auth)?;

    let claims = tokens.verify(&token).map_err(|e| {
        debug!("bearer token rejected: {}", e);
        AppError::auth(AuthFailureReason::InvalidToken)
    })?;

    let id = claims
        .user_id()
        .map_err(|_| AppError::auth(AuthFailureReason::InvalidToken))?;

    Ok(AuthUser {
        id,
        email: claims.email,
        name: claims.name,
    })
}

/// Gate for protected route groups
pub async fn require_bearer(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let user = authenticate(request.headers(), state.tokens())?;

    debug!(user_id = %user.id, path = %request.uri().path(), "bearer token accepted");
    request.extensions_mut().insert(user);

    Ok(next.run(request).await)
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<AuthUser>() {
            return Ok(user.clone());
        }

        authenticate(&parts.headers, state.tokens())
    }
}
