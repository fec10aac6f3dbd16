// ==============================================================================
// payments.rs - Charges
// ==============================================================================
// Description: Payment gateway seam and the in-process ledger behind it
// Created: 2026-10-18
// Modified: 2026-10-18
// Version: 1.0.0
// ==============================================================================

use async_graphql::{Enum, InputObject, SimpleObject};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, ErrorDetail};

/// ISO currency codes the ledger settles in
pub const SUPPORTED_CURRENCIES: &[&str] = &["usd", "eur", "gbp"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Enum)]
#[serde(rename_all = "lowercase")]
pub enum ChargeStatus {
    Succeeded,
}

/// A settled charge
#[derive(Debug, Clone, Serialize, SimpleObject)]
pub struct Charge {
    pub id: Uuid,
    pub user_id: Uuid,
    pub amount_cents: i64,
    pub currency: String,
    pub description: Option<String>,
    pub status: ChargeStatus,
    pub created_at: DateTime<Utc>,
}

/// Charge creation input (REST body and GraphQL input)
#[derive(Debug, Clone, Deserialize, Validate, InputObject)]
pub struct NewCharge {
    #[serde(deserialize_with = "amount_from_number_or_text")]
    #[validate(range(min = 1, max = 100_000_000, message = "amount_cents must be between 1 and 100000000"))]
    pub amount_cents: i64,
    pub currency: String,
    #[validate(length(max = 500, message = "description must be at most 500 characters"))]
    pub description: Option<String>,
}

/// Form-encoded bodies carry every value as a string
fn amount_from_number_or_text<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Amount {
        Number(i64),
        Text(String),
    }

    match Amount::deserialize(deserializer)? {
        Amount::Number(cents) => Ok(cents),
        Amount::Text(text) => text.trim().parse().map_err(|_| {
            serde::de::Error::custom(format!("amount_cents must be an integer, got {:?}", text))
        }),
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PaymentError {
    #[error("currency {0:?} is not supported")]
    UnsupportedCurrency(String),

    #[error("charge not found")]
    ChargeNotFound,
}

impl From<PaymentError> for AppError {
    fn from(err: PaymentError) -> Self {
        match err {
            PaymentError::UnsupportedCurrency(currency) => AppError::BadRequest {
                details: vec![ErrorDetail::new(
                    "UNSUPPORTED_CURRENCY",
                    format!("Currency {:?} is not supported", currency),
                )
                .with_meta("field", "currency")
                .with_meta("supported", SUPPORTED_CURRENCIES.to_vec())],
            },
            PaymentError::ChargeNotFound => AppError::NotFound { resource: "charge" },
        }
    }
}

/// Payment processor seam
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_charge(&self, user_id: Uuid, charge: NewCharge) -> Result<Charge, PaymentError>;

    /// Caller's charges, oldest first
    async fn list_charges(&self, user_id: Uuid) -> Vec<Charge>;

    /// A charge owned by `user_id`; other users' charges are not found
    async fn find_charge(&self, user_id: Uuid, charge_id: Uuid) -> Result<Charge, PaymentError>;
}

/// In-process ledger; every valid charge settles immediately
#[derive(Default)]
pub struct LedgerGateway {
    charges: RwLock<HashMap<Uuid, Charge>>,
}

impl LedgerGateway {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PaymentGateway for LedgerGateway {
    async fn create_charge(&self, user_id: Uuid, charge: NewCharge) -> Result<Charge, PaymentError> {
        let currency = charge.currency.trim().to_ascii_lowercase();
        if !SUPPORTED_CURRENCIES.contains(&currency.as_str()) {
            return Err(PaymentError::UnsupportedCurrency(charge.currency));
        }

        let charge = Charge {
            id: Uuid::new_v4(),
            user_id,
            amount_cents: charge.amount_cents,
            currency,
            description: charge
                .description
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty()),
            status: ChargeStatus::Succeeded,
            created_at: Utc::now(),
        };

        self.charges.write().await.insert(charge.id, charge.clone());
        Ok(charge)
    }

    async fn list_charges(&self, user_id: Uuid) -> Vec<Charge> {
        let mut charges: Vec<Charge> = self
            .charges
            .read()
            .await
            .values()
            .filter(|charge| charge.user_id == user_id)
            .cloned()
            .collect();

        charges.sort_by_key(|charge| charge.created_at);
        charges
    }

    async fn find_charge(&self, user_id: Uuid, charge_id: Uuid) -> Result<Charge, PaymentError> {
        self.charges
            .read()
            .await
            .get(&charge_id)
            .filter(|charge| charge.user_id == user_id)
            .cloned()
            .ok_or(PaymentError::ChargeNotFound)
    }
}
