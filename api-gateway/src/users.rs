// ==============================================================================
// users.rs - User Accounts
// ==============================================================================
// Description: User records and the store behind the local strategy
// Created: 2026-10-18
// Modified: 2026-10-18
// Version: 1.0.0
// ==============================================================================

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Registered user
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    /// Always trimmed and lowercased
    pub email: String,
    pub name: String,
    /// Argon2id PHC string
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(email: &str, name: &str, password_hash: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            email: normalize_email(email),
            name: name.trim().to_string(),
            password_hash,
            created_at: Utc::now(),
        }
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum UserStoreError {
    #[error("email address is already registered")]
    EmailTaken,
}

/// Storage for user accounts
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a new user; emails are unique
    async fn insert(&self, user: User) -> Result<User, UserStoreError>;

    async fn find_by_email(&self, email: &str) -> Option<User>;

    async fn find_by_id(&self, id: Uuid) -> Option<User>;
}

/// Process-local user store
#[derive(Default)]
pub struct MemoryUserStore {
    by_email: RwLock<HashMap<String, User>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn insert(&self, user: User) -> Result<User, UserStoreError> {
        let mut users = self.by_email.write().await;
        if users.contains_key(&user.email) {
            return Err(UserStoreError::EmailTaken);
        }

        users.insert(user.email.clone(), user.clone());
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Option<User> {
        self.by_email.read().await.get(&normalize_email(email)).cloned()
    }

    async fn find_by_id(&self, id: Uuid) -> Option<User> {
        self.by_email
            .read()
            .await
            .values()
            .find(|user| user.id == id)
            .cloned()
    }
}
