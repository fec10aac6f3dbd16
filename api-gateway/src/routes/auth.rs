// ==============================================================================
// routes/auth.rs - Account Endpoints
// ==============================================================================
// Description: Registration, local-strategy login, logout and current user
// Created: 2026-10-18
// Modified: 2026-10-18
// Version: 1.0.0
// ==============================================================================

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use tracing::{info, warn};
use validator::Validate;

use crate::error::{AppError, AuthFailureReason};
use crate::mailer::welcome_message;
use crate::middleware::{AuthUser, Payload, ACCESS_TOKEN_COOKIE};
use crate::models::{AuthResponse, LoginRequest, RegisterRequest, UserResponse};
use crate::security::hash_password;
use crate::state::AppState;
use crate::strategy::{Credentials, LOCAL_STRATEGY};
use crate::users::{User, UserStoreError};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/me", get(me))
}

/// Issue a token for `user` and set it as the session cookie
fn start_session(
    state: &AppState,
    jar: CookieJar,
    user: &User,
) -> Result<(CookieJar, AuthResponse), AppError> {
    let issued = state.tokens().issue(user).map_err(AppError::internal)?;

    let cookie = Cookie::build((ACCESS_TOKEN_COOKIE, issued.token.clone()))
        .path("/")
        .http_only(true)
        .secure(state.config().auth.cookie_secure)
        .same_site(SameSite::Lax);

    Ok((
        jar.add(cookie),
        AuthResponse {
            token: issued.token,
            token_type: "Bearer",
            expires_at: issued.expires_at,
            user: UserResponse::from(user),
        },
    ))
}

/// POST /api/auth/register
pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    Payload(request): Payload<RegisterRequest>,
) -> Result<(StatusCode, CookieJar, Json<AuthResponse>), AppError> {
    request.validate()?;

    let password = request.password;
    let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(AppError::internal)?
        .map_err(AppError::internal)?;

    let user = state
        .users()
        .insert(User::new(&request.email, request.name.trim(), password_hash))
        .await
        .map_err(|e| match e {
            UserStoreError::EmailTaken => AppError::Conflict {
                code: "EMAIL_TAKEN",
                message: "Email address is already registered".to_string(),
            },
        })?;

    info!(user_id = %user.id, "user registered");

    // Best-effort: the account exists whether or not the mail goes out
    let sent = match welcome_message(&user) {
        Ok(mail) => state.mailer().send(mail).await,
        Err(e) => Err(e),
    };
    if let Err(e) = sent {
        warn!(user_id = %user.id, "welcome email not sent: {}", e);
    }

    let (jar, response) = start_session(&state, jar, &user)?;
    Ok((StatusCode::CREATED, jar, Json(response)))
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Payload(request): Payload<LoginRequest>,
) -> Result<(CookieJar, Json<AuthResponse>), AppError> {
    request.validate()?;

    let credentials = Credentials::Password {
        email: request.email,
        password: request.password,
    };
    let user = state
        .strategies()
        .authenticate(LOCAL_STRATEGY, &credentials)
        .await?;

    info!(user_id = %user.id, strategy = LOCAL_STRATEGY, "login succeeded");

    let (jar, response) = start_session(&state, jar, &user)?;
    Ok((jar, Json(response)))
}

/// POST /api/auth/logout
pub async fn logout(jar: CookieJar) -> (StatusCode, CookieJar) {
    let jar = jar.remove(Cookie::build(ACCESS_TOKEN_COOKIE).path("/"));
    (StatusCode::NO_CONTENT, jar)
}

/// GET /api/auth/me
pub async fn me(State(state): State<AppState>, user: AuthUser) -> Result<Json<UserResponse>, AppError> {
    let account = state
        .users()
        .find_by_id(user.id)
        .await
        .ok_or_else(|| AppError::auth(AuthFailureReason::InvalidToken))?;

    Ok(Json(UserResponse::from(&account)))
}
