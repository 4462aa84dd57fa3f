use serde::{Deserialize, Serialize};

/// Payment outcome recorded on an order.
///
/// This is the API/DTO version without sqlx::Type.
/// For database operations, use the version in `shopflow-core::entities`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Paid,
    Failed,
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentStatus::Paid => write!(f, "paid"),
            PaymentStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Where an order is in the physical fulfillment flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FulfillmentStatus {
    Unfulfilled,
    SubmittedToPartner,
    PartnerFailed,
    Shipped,
}

impl std::fmt::Display for FulfillmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FulfillmentStatus::Unfulfilled => write!(f, "unfulfilled"),
            FulfillmentStatus::SubmittedToPartner => write!(f, "submitted_to_partner"),
            FulfillmentStatus::PartnerFailed => write!(f, "partner_failed"),
            FulfillmentStatus::Shipped => write!(f, "shipped"),
        }
    }
}
