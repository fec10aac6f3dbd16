// ==============================================================================
// state.rs - Application State Management
// ==============================================================================
// Description: Shared, immutable-after-startup state for the gateway
// Created: 2026-10-18
// Modified: 2026-10-18
// Version: 1.0.0
// ==============================================================================

use anyhow::{Context, Result};
use std::sync::Arc;

use crate::config::AppConfig;
use crate::graphql::{build_schema, AppSchema};
use crate::mailer::{transport_from_config, MailTransport};
use crate::middleware::SecurityHeaders;
use crate::payments::{LedgerGateway, PaymentGateway};
use crate::strategy::{LocalStrategy, StrategyRegistry};
use crate::tokens::TokenService;
use crate::users::{MemoryUserStore, UserStore};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AppConfig,

    /// Bearer token signing/verification
    tokens: TokenService,

    /// Registered authentication strategies
    strategies: StrategyRegistry,

    users: Arc<dyn UserStore>,
    mailer: Arc<dyn MailTransport>,
    payments: Arc<dyn PaymentGateway>,

    schema: AppSchema,
    security_headers: SecurityHeaders,
}

impl AppState {
    /// Create state with the default collaborators for `config`
    pub fn new(config: AppConfig) -> Result<Self> {
        let mailer = transport_from_config(&config.mailer)
            .context("Failed to initialize mail transport")?;

        Self::with_collaborators(
            config,
            Arc::new(MemoryUserStore::new()),
            mailer,
            Arc::new(LedgerGateway::new()),
        )
    }

    /// Create state around explicit collaborators
    pub fn with_collaborators(
        config: AppConfig,
        users: Arc<dyn UserStore>,
        mailer: Arc<dyn MailTransport>,
        payments: Arc<dyn PaymentGateway>,
    ) -> Result<Self> {
        let security_headers = SecurityHeaders::from_config(&config.content_security_policy)
            .context("Invalid content security policy")?;

        let strategies = StrategyRegistry::builder()
            .register(LocalStrategy::new(users.clone()))
            .build()?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                tokens: TokenService::from_config(&config.auth),
                strategies,
                schema: build_schema(payments.clone()),
                users,
                mailer,
                payments,
                security_headers,
                config,
            }),
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }

    pub fn tokens(&self) -> &TokenService {
        &self.inner.tokens
    }

    pub fn strategies(&self) -> &StrategyRegistry {
        &self.inner.strategies
    }

    pub fn users(&self) -> &dyn UserStore {
        self.inner.users.as_ref()
    }

    pub fn mailer(&self) -> &dyn MailTransport {
        self.inner.mailer.as_ref()
    }

    pub fn payments(&self) -> &dyn PaymentGateway {
        self.inner.payments.as_ref()
    }

    pub fn schema(&self) -> &AppSchema {
        &self.inner.schema
    }

    pub fn security_headers(&self) -> &SecurityHeaders {
        &self.inner.security_headers
    }
}
