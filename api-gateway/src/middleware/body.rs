// ==============================================================================
// middleware/body.rs - Request Body Decoding
// ==============================================================================
// Description: JSON / URL-encoded body extractor with uniform error reporting
// Created: 2026-10-18
// Modified: 2026-10-18
// Version: 1.0.0
// ==============================================================================
//
// Decoding rules:
//   - application/json (and +json)          -> serde_json
//   - application/x-www-form-urlencoded     -> form pairs, repeated keys become arrays;
//                                              values stay strings, so numeric fields
//                                              must accept digit strings to be form-postable
//   - empty body or any other content type  -> {}
//
// Malformed input becomes `AppError::BadRequest` (code INVALID_BODY) so it is
// reported through the same envelope as every other failure.
//
// ==============================================================================

use axum::{
    body::Bytes,
    extract::{FromRequest, Request},
    http::{header::CONTENT_TYPE, HeaderMap, StatusCode},
    Form,
};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::AppError;

/// Decoded request body
///
/// `Payload<serde_json::Value>` yields the raw structure; any other `T` is
/// deserialized from it.
#[derive(Debug, Clone)]
pub struct Payload<T>(pub T);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyKind {
    Json,
    Form,
    Other,
}

impl BodyKind {
    fn of(headers: &HeaderMap) -> Self {
        let Some(content_type) = headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok()) else {
            return BodyKind::Other;
        };

        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        if essence == "application/json" || essence.ends_with("+json") {
            BodyKind::Json
        } else if essence == "application/x-www-form-urlencoded" {
            BodyKind::Form
        } else {
            BodyKind::Other
        }
    }
}

/// Decode the body into a JSON value following the rules above
pub async fn decode_body<S>(request: Request, state: &S) -> Result<Value, AppError>
where
    S: Send + Sync,
{
    match BodyKind::of(request.headers()) {
        BodyKind::Json => {
            let bytes = Bytes::from_request(request, state).await?;
            if bytes.iter().all(u8::is_ascii_whitespace) {
                return Ok(Value::Object(Map::new()));
            }

            serde_json::from_slice(&bytes)
                .map_err(|e| AppError::invalid_body(format!("Malformed JSON body: {}", e)))
        }
        BodyKind::Form => {
            let Form(pairs) = Form::<Vec<(String, String)>>::from_request(request, state)
                .await
                .map_err(|rejection| {
                    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
                        AppError::PayloadTooLarge
                    } else {
                        AppError::invalid_body(rejection.body_text())
                    }
                })?;

            Ok(Value::Object(collect_pairs(pairs)))
        }
        BodyKind::Other => {
            // Drain so body-limit violations still surface
            Bytes::from_request(request, state).await?;
            Ok(Value::Object(Map::new()))
        }
    }
}

fn collect_pairs(pairs: Vec<(String, String)>) -> Map<String, Value> {
    let mut map = Map::new();

    for (key, value) in pairs {
        match map.get_mut(&key) {
            None => {
                map.insert(key, Value::String(value));
            }
            Some(Value::Array(values)) => values.push(Value::String(value)),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, Value::String(value)]);
            }
        }
    }

    map
}

impl<S, T> FromRequest<S> for Payload<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = AppError;

    async fn from_request(request: Request, state: &S) -> Result<Self, Self::Rejection> {
        let value = decode_body(request, state).await?;

        serde_json::from_value(value)
            .map(Payload)
            .map_err(|e| AppError::invalid_body(format!("Invalid request body: {}", e)))
    }
}
