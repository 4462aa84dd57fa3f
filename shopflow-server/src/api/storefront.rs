//! Storefront API handlers.
//!
//! These endpoints are called by the storefront backend before payment.
//!
//! # Endpoints
//!
//! - `POST /checkout`          – price a cart and open a hosted payment page
//! - `POST /coupons/validate`  – check a promo code without consuming it

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};
use shopflow_core::checkout::CheckoutError;
use shopflow_core::payments::MetadataError;
use shopflow_core::stores::StoreError;
use shopflow_sdk::objects::{CreateCheckoutRequest, ValidateCouponRequest};
use time::OffsetDateTime;

use crate::state::AppState;

/// Build the Storefront API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/checkout", post(create_checkout))
        .route("/coupons/validate", post(validate_coupon))
}

/// `POST /checkout`: create a hosted checkout session.
///
/// Prices are always taken from the catalog; the request only names
/// products, variants and quantities. Nothing is written to the database.
async fn create_checkout(
    State(state): State<AppState>,
    Json(payload): Json<CreateCheckoutRequest>,
) -> Result<impl IntoResponse, StorefrontApiError> {
    let storefront = state.config.storefront.read().await.clone();
    let response = state
        .checkout
        .create_session(payload, &storefront, OffsetDateTime::now_utc())
        .await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// `POST /coupons/validate`: preview the discount a code would grant.
///
/// An unusable code is a normal `200` answer with `valid: false`.
async fn validate_coupon(
    State(state): State<AppState>,
    Json(payload): Json<ValidateCouponRequest>,
) -> Result<impl IntoResponse, StorefrontApiError> {
    if payload.subtotal_cents < 0 {
        return Err(StorefrontApiError::NegativeSubtotal);
    }
    let response = state
        .checkout
        .validate_coupon(&payload.code, payload.subtotal_cents, OffsetDateTime::now_utc())
        .await
        .map_err(StorefrontApiError::Store)?;
    Ok(Json(response))
}

/// Errors that can occur in Storefront API handlers.
#[derive(Debug)]
enum StorefrontApiError {
    Checkout(CheckoutError),
    Store(StoreError),
    NegativeSubtotal,
}

impl From<CheckoutError> for StorefrontApiError {
    fn from(err: CheckoutError) -> Self {
        Self::Checkout(err)
    }
}

impl IntoResponse for StorefrontApiError {
    fn into_response(self) -> Response {
        match self {
            StorefrontApiError::Checkout(e) => checkout_error_response(e),
            StorefrontApiError::Store(e) => {
                tracing::error!(error = %e, "Storefront API store error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal server error").into_response()
            }
            StorefrontApiError::NegativeSubtotal => (
                StatusCode::BAD_REQUEST,
                "subtotal_cents must not be negative",
            )
                .into_response(),
        }
    }
}

fn checkout_error_response(err: CheckoutError) -> Response {
    let status = if err.is_client_error() {
        match &err {
            CheckoutError::CouponNotFound | CheckoutError::CouponRejected(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            _ => StatusCode::BAD_REQUEST,
        }
    } else {
        match &err {
            // a cart too large to carry through the processor
            CheckoutError::Metadata(MetadataError::TooLarge(_)) => StatusCode::BAD_REQUEST,
            CheckoutError::Processor(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    };

    if status.is_server_error() {
        tracing::error!(error = %err, "Checkout failed");
        let message = if status == StatusCode::BAD_GATEWAY {
            "payment processor unavailable"
        } else {
            "internal server error"
        };
        return (status, message).into_response();
    }

    tracing::info!(error = %err, "Checkout request rejected");
    (status, err.to_string()).into_response()
}
