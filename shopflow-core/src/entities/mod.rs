pub mod catalog;
pub mod coupons;
pub mod inventory;
pub mod orders;

use shopflow_sdk::objects::{
    CouponKind as SdkCouponKind, FulfillmentStatus as SdkFulfillmentStatus,
    PaymentStatus as SdkPaymentStatus,
};

/// Coupon kind for database operations.
///
/// This is the sqlx::Type version. For API/DTO use, see `shopflow_sdk::objects::CouponKind`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(rename_all = "snake_case", type_name = "coupon_kind")]
pub enum CouponKind {
    Percentage,
    Fixed,
}

impl From<CouponKind> for SdkCouponKind {
    fn from(value: CouponKind) -> Self {
        match value {
            CouponKind::Percentage => SdkCouponKind::Percentage,
            CouponKind::Fixed => SdkCouponKind::Fixed,
        }
    }
}

impl From<SdkCouponKind> for CouponKind {
    fn from(value: SdkCouponKind) -> Self {
        match value {
            SdkCouponKind::Percentage => CouponKind::Percentage,
            SdkCouponKind::Fixed => CouponKind::Fixed,
        }
    }
}

/// Payment status for database operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(rename_all = "snake_case", type_name = "payment_status")]
pub enum PaymentStatus {
    Paid,
    Failed,
}

impl From<PaymentStatus> for SdkPaymentStatus {
    fn from(value: PaymentStatus) -> Self {
        match value {
            PaymentStatus::Paid => SdkPaymentStatus::Paid,
            PaymentStatus::Failed => SdkPaymentStatus::Failed,
        }
    }
}

/// Fulfillment status for database operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(rename_all = "snake_case", type_name = "fulfillment_status")]
pub enum FulfillmentStatus {
    Unfulfilled,
    SubmittedToPartner,
    PartnerFailed,
    Shipped,
}

impl From<FulfillmentStatus> for SdkFulfillmentStatus {
    fn from(value: FulfillmentStatus) -> Self {
        match value {
            FulfillmentStatus::Unfulfilled => SdkFulfillmentStatus::Unfulfilled,
            FulfillmentStatus::SubmittedToPartner => SdkFulfillmentStatus::SubmittedToPartner,
            FulfillmentStatus::PartnerFailed => SdkFulfillmentStatus::PartnerFailed,
            FulfillmentStatus::Shipped => SdkFulfillmentStatus::Shipped,
        }
    }
}

impl std::fmt::Display for FulfillmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        SdkFulfillmentStatus::from(*self).fmt(f)
    }
}
