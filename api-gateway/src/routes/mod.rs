// ==============================================================================
// routes/mod.rs - Route Table
// ==============================================================================
// Description: Ordered (prefix, guard, router) list mounted into the app router
// Created: 2026-10-18
// Modified: 2026-10-18
// Version: 1.0.0
// ==============================================================================
//
// Mounts are nested in registration order. A prefix that extends an earlier
// one (`/api/auth/admin` after `/api/auth`) is rejected: the earlier mount
// would claim its requests first. Bearer-guarded mounts get the unknown-route
// fallback inside the gate, so every path under them needs a valid token.
//
// ==============================================================================

pub mod auth;
pub mod graphql;
pub mod health;
pub mod mailer;
pub mod payments;

use axum::{middleware::from_fn_with_state, Router};
use thiserror::Error;

use crate::error::unknown_route;
use crate::middleware::require_bearer;
use crate::state::AppState;

/// Access policy for a mount
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Guard {
    Public,
    Bearer,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RouteTableError {
    #[error("invalid mount prefix {0:?}")]
    InvalidPrefix(String),

    #[error("prefix {0:?} is mounted twice")]
    Duplicate(String),

    #[error("prefix {prefix:?} is shadowed by earlier mount {earlier:?}")]
    Shadowed { prefix: String, earlier: String },
}

struct Mount {
    prefix: String,
    guard: Guard,
    router: Router<AppState>,
}

/// Immutable-once-built list of mounts
#[derive(Default)]
pub struct RouteTable {
    mounts: Vec<Mount>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mount(
        mut self,
        prefix: &str,
        guard: Guard,
        router: Router<AppState>,
    ) -> Result<Self, RouteTableError> {
        if !is_valid_prefix(prefix) {
            return Err(RouteTableError::InvalidPrefix(prefix.to_string()));
        }

        for earlier in &self.mounts {
            if earlier.prefix == prefix {
                return Err(RouteTableError::Duplicate(prefix.to_string()));
            }
            if extends(prefix, &earlier.prefix) {
                return Err(RouteTableError::Shadowed {
                    prefix: prefix.to_string(),
                    earlier: earlier.prefix.clone(),
                });
            }
        }

        self.mounts.push(Mount {
            prefix: prefix.to_string(),
            guard,
            router,
        });
        Ok(self)
    }

    pub fn prefixes(&self) -> Vec<(&str, Guard)> {
        self.mounts
            .iter()
            .map(|m| (m.prefix.as_str(), m.guard))
            .collect()
    }

    /// Nest every mount, in order, into one router
    pub fn into_router(self, state: &AppState) -> Router<AppState> {
        self.mounts
            .into_iter()
            .fold(Router::new(), |app, mount| {
                let router = mount.router.method_not_allowed_fallback(unknown_route);
                let router = match mount.guard {
                    Guard::Public => router,
                    Guard::Bearer => router
                        .fallback(unknown_route)
                        .layer(from_fn_with_state(state.clone(), require_bearer)),
                };
                app.nest(&mount.prefix, router)
            })
    }
}

/// `/segment(/segment)*`, no empty segments, no trailing slash
fn is_valid_prefix(prefix: &str) -> bool {
    prefix
        .strip_prefix('/')
        .map(|rest| !rest.is_empty() && rest.split('/').all(|s| !s.is_empty() && !s.contains(['{', '}', '*'])))
        .unwrap_or(false)
}

/// `prefix` lies under `base` on a segment boundary
fn extends(prefix: &str, base: &str) -> bool {
    prefix
        .strip_prefix(base)
        .is_some_and(|rest| rest.starts_with('/'))
}
