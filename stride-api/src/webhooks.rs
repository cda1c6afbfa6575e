use axum::{
    extract::State,
    http::StatusCode,
    routing::post,
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;
use stride_booking::PaymentOutcome;
use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PaymentWebhook {
    pub id: String,
    #[serde(rename = "type")]
    pub type_: String,
    pub data: WebhookData,
}

#[derive(Debug, Deserialize)]
pub struct WebhookData {
    pub object: PaymentIntentObject,
}

#[derive(Debug, Deserialize)]
pub struct PaymentIntentObject {
    pub id: String,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/v1/webhooks/payments", post(handle_payment_webhook))
}

fn outcome_for(event_type: &str) -> Option<PaymentOutcome> {
    match event_type {
        "payment_intent.succeeded" => Some(PaymentOutcome::Succeeded),
        "payment_intent.payment_failed" => Some(PaymentOutcome::Failed),
        "payment_intent.canceled" => Some(PaymentOutcome::Canceled),
        _ => None,
    }
}

/// POST /v1/webhooks/payments
/// Receive payment status updates and settle the booking named in metadata
async fn handle_payment_webhook(
    State(state): State<AppState>,
    Json(payload): Json<PaymentWebhook>,
) -> Result<StatusCode, AppError> {
    tracing::info!("Received webhook {}: {} for intent {}", payload.id, payload.type_, payload.data.object.id);

    let Some(outcome) = outcome_for(&payload.type_) else {
        tracing::debug!("Ignoring webhook type {}", payload.type_);
        return Ok(StatusCode::OK);
    };

    let booking_id = payload
        .data
        .object
        .metadata
        .as_ref()
        .and_then(|m| m.get("booking_id"))
        .and_then(|v| v.as_str())
        .and_then(|s| Uuid::parse_str(s).ok())
        .ok_or_else(|| AppError::BadRequest("metadata.booking_id missing or invalid".to_string()))?;

    match state.manager.reconcile_payment(booking_id, outcome).await {
        Ok(booking) => {
            tracing::info!("Booking {} is {} after payment {:?}", booking_id, booking.status, outcome);
        }
        // Redelivery cannot change the outcome, so acknowledge it
        Err(e) if e.is_business() => {
            tracing::warn!("Payment {:?} for booking {} not applied: {}", outcome, booking_id, e);
        }
        Err(e) => return Err(e.into()),
    }

    Ok(StatusCode::OK)
}
