// ==============================================================================
// strategy.rs - Authentication Strategy Registry
// ==============================================================================
// Description: Named authentication strategies, registered once at startup
// Created: 2026-10-18
// Modified: 2026-10-18
// Version: 1.0.0
// ==============================================================================
//
// The registry is a capability, not a gate: routes that want to log a user in
// call `StrategyRegistry::authenticate` with the strategy name. It is built
// once and then only read.
//
// ==============================================================================

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::error::{AppError, AuthFailureReason};
use crate::security::{decoy_hash, verify_password};
use crate::users::{User, UserStore};

/// Name of the email/password strategy
pub const LOCAL_STRATEGY: &str = "local";

/// Credentials presented to a strategy
#[derive(Debug, Clone)]
pub enum Credentials {
    Password { email: String, password: String },
}

#[async_trait]
pub trait AuthStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    async fn authenticate(&self, credentials: &Credentials) -> Result<User, AppError>;
}

// ==============================================================================
// LOCAL STRATEGY
// ==============================================================================

/// Checks a plaintext password against a PHC hash string
pub type PasswordCheck = fn(&str, &str) -> anyhow::Result<bool>;

/// Email + Argon2id password against the user store
///
/// Unknown emails are verified against a decoy hash so both failure paths
/// cost one Argon2id verification.
pub struct LocalStrategy {
    users: Arc<dyn UserStore>,
    check: PasswordCheck,
}

impl LocalStrategy {
    pub fn new(users: Arc<dyn UserStore>) -> Self {
        Self::with_check(users, verify_password)
    }

    pub fn with_check(users: Arc<dyn UserStore>, check: PasswordCheck) -> Self {
        Self { users, check }
    }
}

#[async_trait]
impl AuthStrategy for LocalStrategy {
    fn name(&self) -> &'static str {
        LOCAL_STRATEGY
    }

    async fn authenticate(&self, credentials: &Credentials) -> Result<User, AppError> {
        let Credentials::Password { email, password } = credentials;

        let user = self.users.find_by_email(email).await;

        let check = self.check;
        let password = password.clone();
        let hash = user.as_ref().map(|u| u.password_hash.clone());
        let verified = tokio::task::spawn_blocking(move || match hash {
            Some(hash) => check(&password, &hash),
            None => check(&password, decoy_hash()),
        })
        .await
        .map_err(AppError::internal)?;

        let Some(user) = user else {
            debug!("login attempt for unknown email");
            return Err(AppError::auth(AuthFailureReason::InvalidCredentials));
        };

        if verified.map_err(AppError::internal)? {
            Ok(user)
        } else {
            debug!(user_id = %user.id, "password mismatch");
            Err(AppError::auth(AuthFailureReason::InvalidCredentials))
        }
    }
}

// ==============================================================================
// REGISTRY
// ==============================================================================

/// Immutable set of strategies keyed by name
#[derive(Clone)]
pub struct StrategyRegistry {
    strategies: Arc<HashMap<&'static str, Arc<dyn AuthStrategy>>>,
}

impl StrategyRegistry {
    pub fn builder() -> StrategyRegistryBuilder {
        StrategyRegistryBuilder::default()
    }

    /// Run the named strategy
    pub async fn authenticate(
        &self,
        strategy: &str,
        credentials: &Credentials,
    ) -> Result<User, AppError> {
        let Some(strategy) = self.strategies.get(strategy) else {
            return Err(AppError::internal(anyhow::anyhow!(
                "authentication strategy {:?} is not registered",
                strategy
            )));
        };

        strategy.authenticate(credentials).await
    }

    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.strategies.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

#[derive(Default)]
pub struct StrategyRegistryBuilder {
    strategies: Vec<Arc<dyn AuthStrategy>>,
}

impl StrategyRegistryBuilder {
    pub fn register(mut self, strategy: impl AuthStrategy + 'static) -> Self {
        self.strategies.push(Arc::new(strategy));
        self
    }

    /// Freeze the registry; duplicate names are a startup error
    pub fn build(self) -> Result<StrategyRegistry> {
        let mut strategies = HashMap::with_capacity(self.strategies.len());
        for strategy in self.strategies {
            let name = strategy.name();
            if strategies.insert(name, strategy).is_some() {
                bail!("authentication strategy {:?} registered twice", name);
            }
        }

        Ok(StrategyRegistry {
            strategies: Arc::new(strategies),
        })
    }
}
