// ==============================================================================
// routes/payments.rs - Charge Endpoints
// ==============================================================================
// Description: Create, list and fetch the caller's charges (bearer-guarded)
// Created: 2026-10-18
// Modified: 2026-10-18
// Version: 1.0.0
// ==============================================================================

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::error::AppError;
use crate::middleware::{AuthUser, Payload};
use crate::models::ChargeListResponse;
use crate::payments::{Charge, NewCharge};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/charges", get(list_charges).post(create_charge))
        .route("/charges/{charge_id}", get(get_charge))
}

/// POST /api/payments/charges
pub async fn create_charge(
    State(state): State<AppState>,
    user: AuthUser,
    Payload(request): Payload<NewCharge>,
) -> Result<(StatusCode, Json<Charge>), AppError> {
    request.validate()?;

    let charge = state.payments().create_charge(user.id, request).await?;

    info!(
        charge_id = %charge.id,
        user_id = %user.id,
        amount_cents = charge.amount_cents,
        currency = %charge.currency,
        "charge created"
    );

    Ok((StatusCode::CREATED, Json(charge)))
}

/// GET /api/payments/charges
pub async fn list_charges(State(state): State<AppState>, user: AuthUser) -> Json<ChargeListResponse> {
    Json(ChargeListResponse {
        charges: state.payments().list_charges(user.id).await,
    })
}

/// GET /api/payments/charges/{charge_id}
pub async fn get_charge(
    State(state): State<AppState>,
    user: AuthUser,
    Path(charge_id): Path<String>,
) -> Result<Json<Charge>, AppError> {
    // Malformed ids cannot name a charge
    let charge_id =
        Uuid::parse_str(&charge_id).map_err(|_| AppError::NotFound { resource: "charge" })?;

    let charge = state.payments().find_charge(user.id, charge_id).await?;
    Ok(Json(charge))
}
