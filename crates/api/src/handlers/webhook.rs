//! Payment provider webhook.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use chrono::Utc;
use serde_json::json;

use crate::billing::events::Event;
use crate::billing::signature::{self, SIGNATURE_HEADER};
use crate::billing::webhook::{self, WebhookError};
use crate::error::{AppError, AppResult};
use crate::state::AppState;

fn webhook_error(message: impl std::fmt::Display) -> AppError {
    AppError::BadRequest(format!("Webhook Error: {message}"))
}

/// POST /api/webhook
///
/// Takes the raw body so the signature is checked over the exact bytes the
/// provider signed. Database failures surface as 500 so the provider
/// redelivers; everything else about a well-formed event is acknowledged.
pub async fn receive(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Json<serde_json::Value>> {
    let secret = state
        .config
        .stripe
        .webhook_secret
        .as_deref()
        .ok_or_else(|| webhook_error("webhook secret is not configured"))?;
    let header = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| webhook_error("missing signature header"))?;

    let now = Utc::now();
    signature::verify_signature(
        &body,
        header,
        secret,
        state.config.stripe.signature_tolerance_secs,
        now.timestamp(),
    )
    .map_err(webhook_error)?;

    let event: Event = serde_json::from_slice(&body).map_err(webhook_error)?;
    tracing::info!(event_id = ?event.id, event_type = %event.event_type, "Webhook received");

    match webhook::handle_event(&state.pool, state.mailer.as_ref(), &event, now).await {
        Ok(()) => Ok(Json(json!({ "received": true }))),
        Err(WebhookError::InvalidPayload(e)) => Err(webhook_error(e)),
        Err(WebhookError::Database(e)) => Err(AppError::Database(e)),
    }
}
