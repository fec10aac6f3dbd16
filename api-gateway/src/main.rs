// ==============================================================================
// main.rs - Platform API Gateway Entry Point
// ==============================================================================
// Description: Loads configuration, builds the pipeline and serves it
// Created: 2026-10-18
// Modified: 2026-10-18
// Version: 1.0.0
// ==============================================================================

use anyhow::{Context, Result};
use std::net::SocketAddr;
use tracing::info;

use platform_gateway::{build_router, config::DEFAULT_ENVIRONMENT, logging, AppConfig, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let environment = std::env::var("APP_ENV").unwrap_or_else(|_| DEFAULT_ENVIRONMENT.to_string());
    logging::init(&environment);

    info!("Starting Platform API Gateway v{}", env!("CARGO_PKG_VERSION"));

    let config = AppConfig::load().context("Failed to load configuration")?;
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid listen address")?;
    let port = config.server.port;
    let mode = config.environment.clone();

    // Initialize application state
    let state = AppState::new(config).context("Failed to initialize application state")?;

    let app = build_router(state).context("Failed to build router")?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("listening on port {} in {} mode", port, mode);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server stopped");
    Ok(())
}

/// Resolves on Ctrl-C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to register SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("SIGINT received, initiating graceful shutdown..."),
        _ = terminate => info!("SIGTERM received, initiating graceful shutdown..."),
    }
}
