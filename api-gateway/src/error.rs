// ==============================================================================
// error.rs - Uniform Error Envelope & Terminal Handlers
// ==============================================================================
// Description: AppError kinds, JSON error envelope, unknown-route and panic
//              terminals
// Created: 2026-10-18
// Modified: 2026-10-18
// Version: 1.0.0
// ==============================================================================
//
// Every failure that reaches a client goes through `AppError::into_response`,
// which logs the event and emits:
//
//   { "errors": [ { "statusCode": "404", "message": "...", "code": "...", "meta": {} } ] }
//
// Internal causes (source chains, panic payloads) are logged, never returned.
//
// ==============================================================================

use axum::{
    extract::{rejection::BytesRejection, OriginalUri},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::any::Any;
use thiserror::Error;
use tracing::{error, warn};

// ==============================================================================
// ERROR DETAILS
// ==============================================================================

/// One entry of the `errors` array
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    pub meta: Map<String, Value>,
}

impl ErrorDetail {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            meta: Map::new(),
        }
    }

    pub fn with_meta(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.meta.insert(key.to_string(), value.into());
        self
    }
}

/// Why a request failed authentication
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailureReason {
    MissingToken,
    InvalidToken,
    InvalidCredentials,
}

impl AuthFailureReason {
    pub fn code(&self) -> &'static str {
        match self {
            AuthFailureReason::MissingToken => "MISSING_TOKEN",
            AuthFailureReason::InvalidToken => "INVALID_TOKEN",
            AuthFailureReason::InvalidCredentials => "INVALID_CREDENTIALS",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            AuthFailureReason::MissingToken => "Authentication token is required",
            AuthFailureReason::InvalidToken => "Authentication token is invalid or expired",
            AuthFailureReason::InvalidCredentials => "Invalid email or password",
        }
    }
}

// ==============================================================================
// APP ERROR
// ==============================================================================

/// Application error type
#[derive(Debug, Error)]
pub enum AppError {
    #[error("unknown route requested: {route}")]
    RouteNotFound { route: String },

    #[error("authentication failed: {}", .reason.code())]
    AuthFailure { reason: AuthFailureReason },

    #[error("bad request ({} problems)", .details.len())]
    BadRequest { details: Vec<ErrorDetail> },

    #[error("request body exceeds the configured limit")]
    PayloadTooLarge,

    #[error("{resource} not found")]
    NotFound { resource: &'static str },

    #[error("{message}")]
    Conflict { code: &'static str, message: String },

    /// Anything thrown by a collaborator; `cause` is logged, `message` is public
    #[error("{message}: {cause:#}")]
    Upstream {
        status: StatusCode,
        code: &'static str,
        message: String,
        cause: anyhow::Error,
    },
}

impl AppError {
    pub fn auth(reason: AuthFailureReason) -> Self {
        AppError::AuthFailure { reason }
    }

    /// Body could not be decoded
    pub fn invalid_body(message: impl Into<String>) -> Self {
        AppError::BadRequest {
            details: vec![ErrorDetail::new("INVALID_BODY", message)],
        }
    }

    pub fn upstream(
        status: StatusCode,
        code: &'static str,
        message: impl Into<String>,
        cause: impl Into<anyhow::Error>,
    ) -> Self {
        AppError::Upstream {
            status,
            code,
            message: message.into(),
            cause: cause.into(),
        }
    }

    /// Unexpected internal failure (500)
    pub fn internal(cause: impl Into<anyhow::Error>) -> Self {
        Self::upstream(
            StatusCode::INTERNAL_SERVER_ERROR,
            "INTERNAL_ERROR",
            "Internal server error",
            cause,
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            AppError::RouteNotFound { .. } => "RouteNotFound",
            AppError::AuthFailure { .. } => "AuthFailure",
            AppError::BadRequest { .. } => "BadRequest",
            AppError::PayloadTooLarge => "PayloadTooLarge",
            AppError::NotFound { .. } => "NotFound",
            AppError::Conflict { .. } => "Conflict",
            AppError::Upstream { .. } => "UpstreamError",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::RouteNotFound { .. } => StatusCode::NOT_FOUND,
            AppError::AuthFailure { .. } => StatusCode::UNAUTHORIZED,
            AppError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            AppError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::Conflict { .. } => StatusCode::CONFLICT,
            AppError::Upstream { status, .. } => *status,
        }
    }

    /// Ordered client-facing error list
    pub fn details(&self) -> Vec<ErrorDetail> {
        match self {
            AppError::RouteNotFound { route } => {
                vec![ErrorDetail::new("UNKNOWN_ROUTE", "Unknown route requested")
                    .with_meta("route", route.as_str())]
            }
            AppError::AuthFailure { reason } => {
                vec![ErrorDetail::new(reason.code(), reason.message())]
            }
            AppError::BadRequest { details } => details.clone(),
            AppError::PayloadTooLarge => vec![ErrorDetail::new(
                "PAYLOAD_TOO_LARGE",
                "Request body is too large",
            )],
            AppError::NotFound { resource } => {
                vec![ErrorDetail::new("NOT_FOUND", format!("{} not found", capitalize(resource)))
                    .with_meta("resource", *resource)]
            }
            AppError::Conflict { code, message } => vec![ErrorDetail::new(*code, message.as_str())],
            AppError::Upstream { code, message, .. } => {
                vec![ErrorDetail::new(*code, message.as_str())]
            }
        }
    }

    /// Wire representation; every entry carries the response status
    pub fn to_envelope(&self) -> ErrorEnvelope {
        let status_code = self.status().as_u16().to_string();

        ErrorEnvelope {
            errors: self
                .details()
                .into_iter()
                .map(|detail| WireError {
                    status_code: status_code.clone(),
                    message: detail.message,
                    code: detail.code,
                    meta: detail.meta,
                })
                .collect(),
        }
    }

    fn log(&self) {
        match self {
            AppError::RouteNotFound { route } => {
                warn!(route = %route, "unknown route requested");
            }
            AppError::Upstream {
                status,
                code,
                cause,
                ..
            } => {
                let cause = format!("{:#}", cause);
                error!(status = status.as_u16(), code = *code, error = %cause, "request failed");
            }
            other => {
                warn!(kind = other.name(), status = other.status().as_u16(), "request rejected: {}", other);
            }
        }
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.log();
        (self.status(), Json(self.to_envelope())).into_response()
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut details: Vec<ErrorDetail> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, field_errors)| {
                let field = field.to_string();
                field_errors.iter().map(move |e| {
                    let message = e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("{} is invalid", field));
                    ErrorDetail::new("INVALID_FIELD", message)
                        .with_meta("field", field.as_str())
                        .with_meta("rule", e.code.to_string())
                })
            })
            .collect();

        details.sort_by_key(|d| d.meta.get("field").and_then(Value::as_str).map(str::to_owned));

        AppError::BadRequest { details }
    }
}

impl From<BytesRejection> for AppError {
    fn from(rejection: BytesRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            AppError::PayloadTooLarge
        } else {
            AppError::invalid_body(rejection.body_text())
        }
    }
}

// ==============================================================================
// WIRE FORMAT
// ==============================================================================

/// `{ "errors": [...] }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub errors: Vec<WireError>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireError {
    pub status_code: String,
    pub message: String,
    pub code: String,
    pub meta: Map<String, Value>,
}

// ==============================================================================
// TERMINAL HANDLERS
// ==============================================================================

/// Catch-all for requests no route matched
pub async fn unknown_route(OriginalUri(uri): OriginalUri) -> AppError {
    AppError::RouteNotFound {
        route: uri.path().to_string(),
    }
}

/// Converts a handler panic into a 500 envelope
pub fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else {
        "non-string panic payload".to_string()
    };

    AppError::internal(anyhow::anyhow!("handler panicked: {}", detail)).into_response()
}

// ==============================================================================
// TESTS
// ==============================================================================
