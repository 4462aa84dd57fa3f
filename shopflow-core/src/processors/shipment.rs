//! Shipment notifications from the fulfillment partner.

use super::notification::NotificationDispatcher;
use crate::stores::{OrderStore, ShipmentOutcome, ShipmentUpdate, StoreError};
use shopflow_sdk::objects::{ShipmentAck, ShipmentNotification};
use std::sync::Arc;
use thiserror::Error;
use time::OffsetDateTime;

#[derive(Debug, Error)]
pub enum ShipmentError {
    #[error("no paid order {0}")]
    OrderNotFound(String),

    #[error("tracking number is empty")]
    MissingTrackingNumber,

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub struct ShipmentProcessor {
    orders: Arc<dyn OrderStore>,
    notifier: NotificationDispatcher,
}

impl ShipmentProcessor {
    pub fn new(orders: Arc<dyn OrderStore>, notifier: NotificationDispatcher) -> Self {
        Self { orders, notifier }
    }

    /// Record tracking details and tell the customer, once per tracking
    /// number.
    #[tracing::instrument(skip_all, fields(order_number = %notification.order_number))]
    pub async fn handle(&self, notification: ShipmentNotification) -> Result<ShipmentAck, ShipmentError> {
        let tracking_number = notification.tracking_number.trim().to_owned();
        if tracking_number.is_empty() {
            return Err(ShipmentError::MissingTrackingNumber);
        }
        let update = ShipmentUpdate {
            order_number: notification.order_number.clone(),
            tracking_number,
            carrier: notification.carrier,
            tracking_url: notification.tracking_url,
            shipped_at: notification
                .shipped_at
                .and_then(|ts| OffsetDateTime::from_unix_timestamp(ts).ok()),
        };
        match self.orders.record_shipment(update).await? {
            ShipmentOutcome::Updated(order) => {
                tracing::info!(
                    tracking_number = ?order.tracking_number,
                    "Shipment recorded"
                );
                self.notifier.order_shipped(&order).await;
                Ok(ShipmentAck {
                    order_number: order.order_number,
                    updated: true,
                })
            }
            ShipmentOutcome::Unchanged(order) => {
                tracing::info!("Shipment already recorded, skipping");
                Ok(ShipmentAck {
                    order_number: order.order_number,
                    updated: false,
                })
            }
            ShipmentOutcome::NotFound => {
                tracing::warn!("Shipment notification for unknown order");
                Err(ShipmentError::OrderNotFound(notification.order_number))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;
    use crate::entities::orders::NewOrder;
    use crate::entities::{FulfillmentStatus, PaymentStatus};
    use crate::notify::{RecordingEmailSender, RecordingPartnerClient};
    use crate::stores::memory::MemoryOrderStore;
    use compact_str::CompactString;
    use shopflow_sdk::objects::CustomerInfo;

    fn order(order_number: &str, payment_status: PaymentStatus) -> NewOrder {
        NewOrder {
            order_number: order_number.to_owned(),
            provider_event_id: "evt_1".to_owned(),
            session_or_intent_id: "cs_1".to_owned(),
            customer_email: Some("buyer@example.com".to_owned()),
            customer: CustomerInfo::default(),
            lines: vec![],
            subtotal_cents: 1000,
            discount_cents: 0,
            total_cents: 1000,
            currency: CompactString::from("usd"),
            payment_status,
            shipping_address: None,
            coupon_id: None,
        }
    }

    fn notification(order_number: &str) -> ShipmentNotification {
        ShipmentNotification {
            order_number: order_number.to_owned(),
            tracking_number: "1Z999".to_owned(),
            carrier: Some("UPS".to_owned()),
            tracking_url: Some("https://track.example/1Z999".to_owned()),
            shipped_at: Some(1_772_366_400),
        }
    }

    #[tokio::test]
    async fn records_tracking_and_emails_once() {
        let orders = Arc::new(MemoryOrderStore::new());
        let email = Arc::new(RecordingEmailSender::new());
        let notifier = NotificationDispatcher::new(
            email.clone(),
            Arc::new(RecordingPartnerClient::new()),
            orders.clone(),
            test_config(),
        );
        let processor = ShipmentProcessor::new(orders.clone(), notifier);
        orders
            .create_if_absent(order("SF-1", PaymentStatus::Paid))
            .await
            .unwrap();
        orders
            .create_if_absent(order("SF-2", PaymentStatus::Failed))
            .await
            .unwrap();

        let ack = processor.handle(notification("SF-1")).await.unwrap();
        assert!(ack.updated);
        let ack = processor.handle(notification("SF-1")).await.unwrap();
        assert!(!ack.updated);
        assert_eq!(email.sent().await.len(), 1);

        let stored = orders.get("SF-1").await.unwrap();
        assert_eq!(stored.fulfillment_status, FulfillmentStatus::Shipped);
        assert_eq!(stored.tracking_carrier.as_deref(), Some("UPS"));
        assert_eq!(
            stored.shipped_at.map(|t| t.unix_timestamp()),
            Some(1_772_366_400)
        );

        assert!(matches!(
            processor.handle(notification("SF-2")).await,
            Err(ShipmentError::OrderNotFound(_))
        ));
        assert!(matches!(
            processor.handle(notification("SF-404")).await,
            Err(ShipmentError::OrderNotFound(_))
        ));
    }
}
