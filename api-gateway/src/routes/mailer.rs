// ==============================================================================
// routes/mailer.rs - Contact Form Endpoint
// ==============================================================================
// Description: POST /api/mailer/contact
// Created: 2026-10-18
// Modified: 2026-10-18
// Version: 1.0.0
// ==============================================================================

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use chrono::Utc;
use tracing::info;
use validator::Validate;

use crate::error::AppError;
use crate::mailer::contact_message;
use crate::middleware::Payload;
use crate::models::{ContactRequest, ContactResponse};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/contact", post(contact))
}

/// Forward a contact form submission to the support inbox
pub async fn contact(
    State(state): State<AppState>,
    Payload(request): Payload<ContactRequest>,
) -> Result<(StatusCode, Json<ContactResponse>), AppError> {
    request.validate()?;

    let mail = contact_message(&state.config().mailer.contact_inbox, &request, Utc::now())
        .map_err(AppError::internal)?;

    state.mailer().send(mail).await.map_err(|e| {
        AppError::upstream(
            StatusCode::BAD_GATEWAY,
            "MAIL_DELIVERY_FAILED",
            "Message could not be delivered",
            e,
        )
    })?;

    info!(subject = %request.subject, "contact message forwarded");

    Ok((StatusCode::ACCEPTED, Json(ContactResponse { status: "accepted" })))
}
