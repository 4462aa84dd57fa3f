//! Webhook handlers.
//!
//! # Endpoints
//!
//! - `POST /webhooks/payments`    – payment processor events (`Stripe-Signature`)
//! - `POST /webhooks/fulfillment` – shipment notifications (`Shopflow-Signature`)

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};
use serde::Serialize;
use shopflow_core::processors::{FulfillmentError, FulfillmentOutcome, ShipmentError};
use shopflow_sdk::objects::ShipmentNotification;

use crate::api::extractors::{SignedBody, VerifiedEvent};
use crate::state::AppState;

/// Build the Webhook API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/webhooks/payments", post(payment_event))
        .route("/webhooks/fulfillment", post(shipment_notification))
}

#[derive(Serialize)]
struct Received {
    received: bool,
}

/// `POST /webhooks/payments`: act on a verified payment event.
///
/// Every outcome the processor should not retry (fulfilled, duplicate,
/// ignored) is acknowledged with `200`. Only a failure to consult the
/// order store before any side effect yields `500`, so the event is
/// redelivered.
async fn payment_event(
    State(state): State<AppState>,
    VerifiedEvent(body): VerifiedEvent,
) -> Result<impl IntoResponse, WebhookApiError> {
    let outcome = state.fulfillment.handle_payload(&body).await?;
    match &outcome {
        FulfillmentOutcome::Ignored(reason) => {
            tracing::debug!(?reason, "Payment event acknowledged without action");
        }
        other => tracing::debug!(outcome = ?other, "Payment event handled"),
    }
    Ok(Json(Received { received: true }))
}

/// `POST /webhooks/fulfillment`: record tracking details for a shipped order.
async fn shipment_notification(
    State(state): State<AppState>,
    SignedBody(payload): SignedBody<ShipmentNotification>,
) -> Result<impl IntoResponse, WebhookApiError> {
    let ack = state.shipments.handle(payload).await?;
    Ok(Json(ack))
}

/// Errors that can occur in webhook handlers.
#[derive(Debug)]
enum WebhookApiError {
    Fulfillment(FulfillmentError),
    Shipment(ShipmentError),
}

impl From<FulfillmentError> for WebhookApiError {
    fn from(err: FulfillmentError) -> Self {
        Self::Fulfillment(err)
    }
}

impl From<ShipmentError> for WebhookApiError {
    fn from(err: ShipmentError) -> Self {
        Self::Shipment(err)
    }
}

impl IntoResponse for WebhookApiError {
    fn into_response(self) -> Response {
        match self {
            WebhookApiError::Fulfillment(e) => {
                tracing::error!(error = %e, "Payment event not processed; asking for redelivery");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal server error").into_response()
            }
            WebhookApiError::Shipment(ShipmentError::OrderNotFound(_)) => {
                (StatusCode::NOT_FOUND, "order not found").into_response()
            }
            WebhookApiError::Shipment(ShipmentError::MissingTrackingNumber) => {
                (StatusCode::BAD_REQUEST, "tracking number is required").into_response()
            }
            WebhookApiError::Shipment(ShipmentError::Store(e)) => {
                tracing::error!(error = %e, "Shipment webhook store error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal server error").into_response()
            }
        }
    }
}
