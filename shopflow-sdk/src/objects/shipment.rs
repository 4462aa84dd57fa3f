//! Shipment notifications pushed by the fulfillment partner.

use serde::{Deserialize, Serialize};

use crate::signature::Signature;

/// Body of `POST /api/v1/webhooks/fulfillment`.
///
/// Signed with the partner webhook secret using the Shopflow body scheme.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShipmentNotification {
    pub order_number: String,
    pub tracking_number: String,
    #[serde(default)]
    pub carrier: Option<String>,
    #[serde(default)]
    pub tracking_url: Option<String>,
    /// Unix timestamp of the ship date, if the partner reports one.
    #[serde(default)]
    pub shipped_at: Option<i64>,
}

impl Signature for ShipmentNotification {}

/// Acknowledgement returned to the partner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipmentAck {
    pub order_number: String,
    /// `false` when the same tracking number had already been recorded.
    pub updated: bool,
}
