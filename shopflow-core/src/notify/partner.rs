//! Order submission to a ShipStation-compatible fulfillment partner.

use super::{NotifyError, PartnerClient};
use crate::config::PartnerConfig;
use crate::entities::orders::Order;
use crate::utils::money::cents_to_decimal;
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shopflow_sdk::objects::Address;
use std::sync::Arc;
use std::time::Duration;
use time::format_description::well_known::Rfc3339;
use tokio::sync::RwLock;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PartnerAddress {
    pub name: Option<String>,
    pub street1: Option<String>,
    pub street2: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    pub phone: Option<String>,
}

impl From<&Address> for PartnerAddress {
    fn from(address: &Address) -> Self {
        Self {
            name: address.name.clone(),
            street1: address.line1.clone(),
            street2: address.line2.clone(),
            city: address.city.clone(),
            state: address.state.clone(),
            postal_code: address.postal_code.clone(),
            country: address.country.clone(),
            phone: address.phone.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PartnerWeight {
    pub value: u32,
    pub units: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PartnerItem {
    pub line_item_key: String,
    pub sku: Option<String>,
    pub name: String,
    pub quantity: u32,
    #[serde(with = "rust_decimal::serde::float")]
    pub unit_price: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<PartnerWeight>,
    /// Marks a negative price line such as a discount.
    pub adjustment: bool,
}

/// The order as the partner's `createorder` endpoint expects it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PartnerOrder {
    pub order_number: String,
    pub order_key: String,
    pub order_date: String,
    pub order_status: &'static str,
    pub customer_email: Option<String>,
    pub bill_to: PartnerAddress,
    pub ship_to: PartnerAddress,
    pub items: Vec<PartnerItem>,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount_paid: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requested_shipping_service: Option<String>,
}

impl PartnerOrder {
    pub fn from_order(order: &Order, service_level: Option<&str>) -> Self {
        let ship_to = order
            .shipping_address
            .as_ref()
            .or(order.customer.address.as_ref())
            .map(PartnerAddress::from)
            .unwrap_or_else(|| PartnerAddress::from(&Address::default()));
        let bill_to = order
            .customer
            .address
            .as_ref()
            .map(PartnerAddress::from)
            .unwrap_or_else(|| ship_to.clone());

        let mut items: Vec<PartnerItem> = order
            .lines
            .iter()
            .enumerate()
            .map(|(i, line)| PartnerItem {
                line_item_key: format!("{}-{i}", order.order_number),
                sku: line.sku.clone(),
                name: match &line.variant {
                    Some(variant) => format!("{} ({variant})", line.name),
                    None => line.name.clone(),
                },
                quantity: line.quantity,
                unit_price: cents_to_decimal(line.unit_amount_cents),
                weight: line.weight_grams.map(|value| PartnerWeight {
                    value,
                    units: "grams",
                }),
                adjustment: false,
            })
            .collect();
        if order.discount_cents > 0 {
            items.push(PartnerItem {
                line_item_key: format!("{}-discount", order.order_number),
                sku: None,
                name: "Discount".to_owned(),
                quantity: 1,
                unit_price: -cents_to_decimal(order.discount_cents),
                weight: None,
                adjustment: true,
            });
        }

        Self {
            order_number: order.order_number.clone(),
            order_key: order.order_number.clone(),
            order_date: order
                .created_at
                .format(&Rfc3339)
                .unwrap_or_else(|_| order.created_at.unix_timestamp().to_string()),
            order_status: "awaiting_shipment",
            customer_email: order.customer_email.clone(),
            bill_to,
            ship_to,
            items,
            amount_paid: cents_to_decimal(order.total_cents),
            requested_shipping_service: service_level.map(str::to_owned),
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateOrderResponse {
    order_id: i64,
}

/// Submits orders through `POST {api_base}/orders/createorder` with
/// HTTP basic auth.
#[derive(Debug, Clone)]
pub struct HttpPartnerClient {
    http_client: reqwest::Client,
    config: Arc<RwLock<PartnerConfig>>,
}

impl HttpPartnerClient {
    pub fn new(config: Arc<RwLock<PartnerConfig>>, timeout: Duration) -> Self {
        Self {
            http_client: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            config,
        }
    }
}

#[async_trait]
impl PartnerClient for HttpPartnerClient {
    #[tracing::instrument(skip_all, err, fields(order_number = %order.order_number))]
    async fn create_order(&self, order: &PartnerOrder) -> Result<String, NotifyError> {
        let config = self.config.read().await.clone();
        if !config.enabled {
            return Err(NotifyError::Disabled);
        }
        let response = self
            .http_client
            .post(config.api_base.join("orders/createorder")?)
            .basic_auth(&config.api_key, Some(&config.api_secret))
            .json(order)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        let created: CreateOrderResponse = response
            .json()
            .await
            .map_err(|e| NotifyError::InvalidResponse(e.to_string()))?;
        Ok(created.order_id.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{FulfillmentStatus, PaymentStatus};
    use compact_str::CompactString;
    use shopflow_sdk::objects::{CartLine, CustomerInfo};
    use time::macros::datetime;
    use uuid::Uuid;

    fn order() -> Order {
        Order {
            id: Uuid::nil(),
            order_number: "SF-20260301-00000042".to_owned(),
            provider_event_id: "evt_1".to_owned(),
            session_or_intent_id: "cs_1".to_owned(),
            customer_email: Some("buyer@example.com".to_owned()),
            customer: CustomerInfo::default(),
            lines: vec![CartLine {
                product_id: "A".to_owned(),
                name: "Trail Shoe".to_owned(),
                unit_amount_cents: 5000,
                quantity: 2,
                currency: CompactString::from("usd"),
                variant: Some(CompactString::from("8")),
                sku: Some("TS-8".to_owned()),
                weight_grams: Some(800),
            }],
            subtotal_cents: 10_000,
            discount_cents: 500,
            total_cents: 9_500,
            currency: CompactString::from("usd"),
            payment_status: PaymentStatus::Paid,
            shipping_address: Some(Address {
                name: Some("Ada Lovelace".to_owned()),
                line1: Some("1 Main St".to_owned()),
                country: Some("US".to_owned()),
                ..Default::default()
            }),
            coupon_id: None,
            created_at: datetime!(2026-03-01 12:00 UTC),
            fulfillment_status: FulfillmentStatus::Unfulfilled,
            partner_order_id: None,
            tracking_number: None,
            tracking_carrier: None,
            tracking_url: None,
            shipped_at: None,
        }
    }

    #[test]
    fn maps_order_to_partner_schema() {
        let partner = PartnerOrder::from_order(&order(), Some("ups_ground"));
        let json = serde_json::to_value(&partner).unwrap();
        assert_eq!(json["orderNumber"], "SF-20260301-00000042");
        assert_eq!(json["orderDate"], "2026-03-01T12:00:00Z");
        assert_eq!(json["shipTo"]["street1"], "1 Main St");
        // billing falls back to shipping
        assert_eq!(json["billTo"]["name"], "Ada Lovelace");
        assert_eq!(json["items"][0]["sku"], "TS-8");
        assert_eq!(json["items"][0]["unitPrice"], 50.0);
        assert_eq!(json["items"][0]["weight"]["value"], 800);
        assert_eq!(json["items"][1]["adjustment"], true);
        assert_eq!(json["items"][1]["unitPrice"], -5.0);
        assert_eq!(json["amountPaid"], 95.0);
        assert_eq!(json["requestedShippingService"], "ups_ground");
    }
}
