// ==============================================================================
// app.rs - Request Pipeline
// ==============================================================================
// Description: Assembles the ordered middleware stack and route table
// Created: 2026-10-18
// Modified: 2026-10-18
// Version: 1.0.0
// ==============================================================================
//
// Stage order, outermost first:
//   1. security headers (stamped on every response, errors included)
//   2. request tracing
//   3. panic -> 500 envelope
//   4. CORS (preflights answered here, before any auth gate)
//   5. body size limit
//   6. /health-check, /public/*, route table, unknown-route fallback
//
// ==============================================================================

use anyhow::{Context, Result};
use axum::{
    extract::DefaultBodyLimit,
    handler::HandlerWithoutStateExt,
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware::from_fn_with_state,
    routing::get,
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{AllowOrigin, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing::info;

use crate::config::CorsConfig;
use crate::error::{panic_response, unknown_route};
use crate::middleware::security_headers;
use crate::routes::{self, Guard, RouteTable};
use crate::state::AppState;

/// Mounts in match order
pub fn route_table(docs: bool) -> Result<RouteTable> {
    let mut table = RouteTable::new()
        .mount("/api/auth", Guard::Public, routes::auth::router())?
        .mount("/api/mailer", Guard::Public, routes::mailer::router())?
        .mount("/api/payments", Guard::Bearer, routes::payments::router())?
        .mount("/api/graphql", Guard::Bearer, routes::graphql::router())?;

    if docs {
        table = table.mount("/api/docs", Guard::Public, routes::graphql::docs_router())?;
    }

    Ok(table)
}

/// CORS policy allowing exactly the configured origin
///
/// The origin is echoed only when the request's `Origin` matches it.
pub fn cors_layer(config: &CorsConfig) -> Result<CorsLayer> {
    if config.allowed_origin.trim() == "*" {
        anyhow::bail!("CORS origin must be a single origin, not a wildcard");
    }
    let origin = HeaderValue::from_str(&config.allowed_origin)
        .with_context(|| format!("Invalid CORS origin {:?}", config.allowed_origin))?;

    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list([origin]))
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::HEAD,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION, ACCEPT])
        .expose_headers([CONTENT_TYPE]))
}

/// Build the full application router
pub fn build_router(state: AppState) -> Result<Router> {
    let config = state.config();

    let table = route_table(config.server.docs)?;
    for (prefix, guard) in table.prefixes() {
        info!(prefix, ?guard, "mounted");
    }
    info!(strategies = ?state.strategies().names(), "authentication strategies registered");

    let static_files = ServeDir::new(&config.server.static_dir)
        .call_fallback_on_method_not_allowed(true)
        .fallback(unknown_route.into_service());

    let cors = cors_layer(&config.cors)?;
    let body_limit = config.server.body_limit_bytes;

    Ok(Router::new()
        .route("/health-check", get(routes::health::health_check))
        .method_not_allowed_fallback(unknown_route)
        .nest_service("/public", static_files)
        .merge(table.into_router(&state))
        .fallback(unknown_route)
        .layer(
            ServiceBuilder::new()
                .layer(from_fn_with_state(
                    state.security_headers().clone(),
                    security_headers,
                ))
                .layer(TraceLayer::new_for_http())
                .layer(CatchPanicLayer::custom(panic_response))
                .layer(cors)
                .layer(DefaultBodyLimit::max(body_limit)),
        )
        .with_state(state))
}
