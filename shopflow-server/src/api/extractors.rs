//! Custom Axum extractors for webhook authentication.
//!
//! Provides:
//! - `VerifiedEvent`: verifies the `Stripe-Signature` header against the raw
//!   payment event body (used by the payment webhook).
//! - `SignedBody<T>`: verifies the `Shopflow-Signature` header against a
//!   signed JSON body (used by the fulfillment partner webhook).
//!
//! All cryptographic operations are delegated to [`shopflow_sdk::signature`].

use axum::{
    body::Bytes,
    extract::{FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use shopflow_sdk::signature::{
    PROCESSOR_SIGNATURE_HEADER, SIGNATURE_HEADER, Signature, SignatureError, SignedObject,
    verify_processor_event,
};

use crate::state::AppState;

const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Errors shared by both webhook extractors.
#[derive(Debug, thiserror::Error)]
pub enum WebhookAuthError {
    #[error("missing signature header")]
    MissingHeader,
    #[error("invalid signature header format")]
    InvalidHeader,
    #[error("invalid signature encoding")]
    InvalidEncoding,
    #[error("failed to read request body")]
    BodyReadError,
    #[error("invalid JSON body: {0}")]
    JsonError(serde_json::Error),
    #[error("signature verification failed")]
    VerificationFailed,
    #[error("signature expired")]
    Expired,
}

impl From<SignatureError> for WebhookAuthError {
    fn from(err: SignatureError) -> Self {
        match err {
            SignatureError::InvalidFormat => Self::InvalidHeader,
            SignatureError::InvalidEncoding => Self::InvalidEncoding,
            SignatureError::Json(e) => Self::JsonError(e),
            SignatureError::SignatureMismatch => Self::VerificationFailed,
            SignatureError::Expired => Self::Expired,
        }
    }
}

impl IntoResponse for WebhookAuthError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            WebhookAuthError::MissingHeader => {
                (StatusCode::BAD_REQUEST, "missing signature header")
            }
            WebhookAuthError::InvalidHeader => {
                (StatusCode::BAD_REQUEST, "invalid signature header format")
            }
            WebhookAuthError::InvalidEncoding => {
                (StatusCode::BAD_REQUEST, "invalid signature encoding")
            }
            WebhookAuthError::BodyReadError => {
                (StatusCode::BAD_REQUEST, "failed to read request body")
            }
            WebhookAuthError::JsonError(_) => (StatusCode::BAD_REQUEST, "invalid JSON body"),
            WebhookAuthError::VerificationFailed => {
                (StatusCode::UNAUTHORIZED, "signature verification failed")
            }
            WebhookAuthError::Expired => (StatusCode::UNAUTHORIZED, "signature expired"),
        };
        if status == StatusCode::UNAUTHORIZED {
            tracing::warn!(reason = message, "Rejected unauthenticated webhook");
        }
        (status, message).into_response()
    }
}

fn header_value(req: &Request, name: &str) -> Result<String, WebhookAuthError> {
    Ok(req
        .headers()
        .get(name)
        .ok_or(WebhookAuthError::MissingHeader)?
        .to_str()
        .map_err(|_| WebhookAuthError::InvalidHeader)?
        .to_owned())
}

async fn read_body(req: Request) -> Result<Bytes, WebhookAuthError> {
    axum::body::to_bytes(req.into_body(), MAX_BODY_BYTES)
        .await
        .map_err(|_| WebhookAuthError::BodyReadError)
}

// ---------------------------------------------------------------------------
// VerifiedEvent: payment processor webhook
// ---------------------------------------------------------------------------

/// The raw body of a payment event whose `Stripe-Signature` header checked
/// out against the configured webhook secret.
///
/// # Header format
///
/// ```text
/// Stripe-Signature: t={unix_timestamp},v1={hex_signature}[,v1=...]
/// ```
///
/// The body is kept as bytes: the signature covers the exact payload, and
/// decoding is left to the fulfillment processor.
pub struct VerifiedEvent(pub Bytes);

impl FromRequest<AppState> for VerifiedEvent {
    type Rejection = WebhookAuthError;

    async fn from_request(req: Request, state: &AppState) -> Result<Self, Self::Rejection> {
        let header = header_value(&req, PROCESSOR_SIGNATURE_HEADER)?;
        let body = read_body(req).await?;

        let payments = state.config.payments.read().await;
        verify_processor_event(
            &header,
            &body,
            payments.webhook_secret_bytes(),
            payments.signature_tolerance_secs,
        )?;
        drop(payments);

        Ok(VerifiedEvent(body))
    }
}

// ---------------------------------------------------------------------------
// SignedBody: fulfillment partner webhook
// ---------------------------------------------------------------------------

/// An Axum extractor that verifies the `Shopflow-Signature` header and
/// deserializes + authenticates the JSON request body.
///
/// # Header format
///
/// ```text
/// Shopflow-Signature: {unix_timestamp}.{base64_signature}
/// ```
///
/// The signature is computed as
/// `HMAC-SHA256("{timestamp}.{json_body}", partner_webhook_secret)`.
pub struct SignedBody<T: Signature>(pub T);

impl<T: Signature + Send> FromRequest<AppState> for SignedBody<T> {
    type Rejection = WebhookAuthError;

    async fn from_request(req: Request, state: &AppState) -> Result<Self, Self::Rejection> {
        let header = header_value(&req, SIGNATURE_HEADER)?;
        let body = read_body(req).await?;
        let json = String::from_utf8(body.to_vec()).map_err(|_| WebhookAuthError::BodyReadError)?;

        let signed = SignedObject::<T>::from_header_and_body(&header, json)?;

        let partner = state.config.partner.read().await;
        let verified_body = signed.verify(partner.webhook_secret_bytes())?;
        drop(partner);

        Ok(SignedBody(verified_body))
    }
}
