// ==============================================================================
// lib.rs - Platform API Gateway
// ==============================================================================
// Description: HTTP pipeline fronting the auth, mailer, payments and GraphQL
//              services
// Created: 2026-10-18
// Modified: 2026-10-18
// Version: 1.0.0
// ==============================================================================

pub mod app;
pub mod config;
pub mod error;
pub mod graphql;
pub mod logging;
pub mod mailer;
pub mod middleware;
pub mod models;
pub mod payments;
pub mod routes;
pub mod security;
pub mod state;
pub mod strategy;
pub mod tokens;
pub mod users;

pub use app::build_router;
pub use config::AppConfig;
pub use error::AppError;
pub use state::AppState;
