//! Cart and customer snapshot types.
//!
//! A [`CartLine`] is frozen when the checkout session is created and then
//! travels through the payment processor's metadata, so the webhook can
//! rebuild the order without querying the catalog a second time.

use compact_str::CompactString;
use serde::{Deserialize, Serialize};

/// A single line submitted by the storefront.
///
/// Only identifiers and quantities are accepted from the client; prices
/// are always resolved server-side.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CartItemRequest {
    pub product_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<CompactString>,
    pub quantity: u32,
}

/// An immutable, server-priced cart line.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: String,
    pub name: String,
    pub unit_amount_cents: i64,
    pub quantity: u32,
    pub currency: CompactString,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<CompactString>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight_grams: Option<u32>,
}

impl CartLine {
    /// `unit_amount_cents × quantity`, or `None` on overflow.
    pub fn line_total_cents(&self) -> Option<i64> {
        self.unit_amount_cents.checked_mul(i64::from(self.quantity))
    }
}

/// Postal address as collected by the storefront or the processor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Address {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub line1: Option<String>,
    #[serde(default)]
    pub line2: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub postal_code: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

/// Customer contact details attached to a checkout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CustomerInfo {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
}
