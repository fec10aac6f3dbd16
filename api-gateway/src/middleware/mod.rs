// ==============================================================================
// middleware/mod.rs - API Gateway Middleware Modules
// ==============================================================================
// Description: Security headers, body decoding and bearer authentication
// Created: 2026-10-18
// Modified: 2026-10-18
// Version: 1.0.0
// ==============================================================================

pub mod auth;
pub mod body;
pub mod headers;

pub use auth::{require_bearer, AuthUser, ACCESS_TOKEN_COOKIE};
pub use body::Payload;
pub use headers::{security_headers, SecurityHeaders};
