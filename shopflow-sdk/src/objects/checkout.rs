use serde::{Deserialize, Serialize};

use super::cart::{CartItemRequest, CustomerInfo};

/// Request body for `POST /api/v1/checkout`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateCheckoutRequest {
    pub lines: Vec<CartItemRequest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub promo_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer: Option<CustomerInfo>,
}

/// Response returned once the processor session exists.
///
/// The storefront redirects the shopper to `redirect_url`; nothing has
/// been persisted at this point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutResponse {
    pub redirect_url: String,
    pub order_number: String,
    pub session_id: String,
    pub subtotal_cents: i64,
    pub discount_cents: i64,
    pub total_cents: i64,
}
