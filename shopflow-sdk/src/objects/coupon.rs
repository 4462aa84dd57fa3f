//! Coupon types exposed to the storefront.

use serde::{Deserialize, Serialize};

/// How a coupon's `value` is interpreted.
///
/// This is the API/DTO version without sqlx::Type.
/// For database operations, use the version in `shopflow-core::entities`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CouponKind {
    /// `value` is a whole percentage in `[0, 100]`.
    Percentage,
    /// `value` is an amount in cents.
    Fixed,
}

/// Request body for `POST /api/v1/coupons/validate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidateCouponRequest {
    pub code: String,
    pub subtotal_cents: i64,
}

/// Result of a pre-payment coupon check.
///
/// `valid == false` is a normal answer, not an HTTP error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidateCouponResponse {
    pub valid: bool,
    pub discount_cents: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coupon_id: Option<i64>,
}
