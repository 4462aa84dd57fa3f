//! Transactional email over a Resend-compatible HTTP API, with askama
//! templates.

use super::{EmailMessage, EmailSender, NotifyError};
use crate::config::EmailConfig;
use crate::entities::orders::Order;
use crate::utils::money::format_cents;
use askama::Template;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

pub struct LineView {
    pub name: String,
    pub variant: Option<String>,
    pub quantity: u32,
    pub total: String,
}

#[derive(Template)]
#[template(path = "email/order_confirmation.html")]
struct OrderConfirmationEmail<'a> {
    store_name: &'a str,
    customer_name: &'a str,
    order_number: &'a str,
    lines: Vec<LineView>,
    subtotal: String,
    discount: Option<String>,
    total: String,
}

#[derive(Template)]
#[template(path = "email/payment_failed.html")]
struct PaymentFailedEmail<'a> {
    store_name: &'a str,
    customer_name: &'a str,
    order_number: &'a str,
    reason: Option<&'a str>,
    retry_url: Option<&'a str>,
}

#[derive(Template)]
#[template(path = "email/shipment.html")]
struct ShipmentEmail<'a> {
    store_name: &'a str,
    customer_name: &'a str,
    order_number: &'a str,
    tracking_number: &'a str,
    carrier: Option<&'a str>,
    tracking_url: Option<&'a str>,
}

fn recipient(order: &Order) -> Result<String, NotifyError> {
    order
        .customer_email
        .clone()
        .or_else(|| order.customer.email.clone())
        .filter(|e| !e.is_empty())
        .ok_or(NotifyError::MissingRecipient)
}

fn customer_name(order: &Order) -> &str {
    order
        .customer
        .name
        .as_deref()
        .or_else(|| order.shipping_address.as_ref().and_then(|a| a.name.as_deref()))
        .unwrap_or("there")
}

pub fn order_confirmation(order: &Order, store_name: &str) -> Result<EmailMessage, NotifyError> {
    let to = recipient(order)?;
    let lines = order
        .lines
        .iter()
        .map(|line| LineView {
            name: line.name.clone(),
            variant: line.variant.as_ref().map(|v| v.to_string()),
            quantity: line.quantity,
            total: format_cents(line.line_total_cents().unwrap_or(0), &order.currency),
        })
        .collect();
    let html = OrderConfirmationEmail {
        store_name,
        customer_name: customer_name(order),
        order_number: &order.order_number,
        lines,
        subtotal: format_cents(order.subtotal_cents, &order.currency),
        discount: (order.discount_cents > 0)
            .then(|| format_cents(order.discount_cents, &order.currency)),
        total: format_cents(order.total_cents, &order.currency),
    }
    .render()?;
    Ok(EmailMessage {
        to,
        subject: format!("{store_name}: order {} confirmed", order.order_number),
        html,
    })
}

pub fn payment_failed(
    order: &Order,
    store_name: &str,
    reason: Option<&str>,
    retry_url: Option<&str>,
) -> Result<EmailMessage, NotifyError> {
    let to = recipient(order)?;
    let html = PaymentFailedEmail {
        store_name,
        customer_name: customer_name(order),
        order_number: &order.order_number,
        reason,
        retry_url,
    }
    .render()?;
    Ok(EmailMessage {
        to,
        subject: format!("{store_name}: payment for order {} failed", order.order_number),
        html,
    })
}

pub fn shipment(order: &Order, store_name: &str) -> Result<EmailMessage, NotifyError> {
    let to = recipient(order)?;
    let html = ShipmentEmail {
        store_name,
        customer_name: customer_name(order),
        order_number: &order.order_number,
        tracking_number: order.tracking_number.as_deref().unwrap_or_default(),
        carrier: order.tracking_carrier.as_deref(),
        tracking_url: order.tracking_url.as_deref(),
    }
    .render()?;
    Ok(EmailMessage {
        to,
        subject: format!("{store_name}: order {} has shipped", order.order_number),
        html,
    })
}

#[derive(Serialize)]
struct SendEmailBody<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_to: Option<&'a str>,
}

#[derive(Deserialize)]
struct SendEmailResponse {
    id: String,
}

/// Sends email through `POST {api_base}/emails` with bearer auth.
#[derive(Debug, Clone)]
pub struct HttpEmailSender {
    http_client: reqwest::Client,
    config: Arc<RwLock<EmailConfig>>,
}

impl HttpEmailSender {
    pub fn new(config: Arc<RwLock<EmailConfig>>, timeout: Duration) -> Self {
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
impl EmailSender for HttpEmailSender {
    #[tracing::instrument(skip_all, err, fields(subject = %message.subject))]
    async fn send(&self, message: EmailMessage) -> Result<String, NotifyError> {
        let config = self.config.read().await.clone();
        if !config.enabled {
            return Err(NotifyError::Disabled);
        }
        let body = SendEmailBody {
            from: &config.from_address,
            to: [&message.to],
            subject: &message.subject,
            html: &message.html,
            reply_to: config.reply_to.as_deref(),
        };
        let response = self
            .http_client
            .post(config.api_base.join("emails")?)
            .bearer_auth(&config.api_key)
            .json(&body)
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
        let sent: SendEmailResponse = response
            .json()
            .await
            .map_err(|e| NotifyError::InvalidResponse(e.to_string()))?;
        Ok(sent.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{FulfillmentStatus, PaymentStatus};
    use compact_str::CompactString;
    use shopflow_sdk::objects::{CartLine, CustomerInfo};
    use uuid::Uuid;

    fn order() -> Order {
        Order {
            id: Uuid::nil(),
            order_number: "SF-20260301-00000042".to_owned(),
            provider_event_id: "evt_1".to_owned(),
            session_or_intent_id: "cs_1".to_owned(),
            customer_email: Some("buyer@example.com".to_owned()),
            customer: CustomerInfo {
                name: Some("Ada <Admin>".to_owned()),
                ..Default::default()
            },
            lines: vec![CartLine {
                product_id: "A".to_owned(),
                name: "Trail Shoe".to_owned(),
                unit_amount_cents: 5000,
                quantity: 2,
                currency: CompactString::from("usd"),
                variant: Some(CompactString::from("8")),
                sku: None,
                weight_grams: None,
            }],
            subtotal_cents: 10_000,
            discount_cents: 500,
            total_cents: 9_500,
            currency: CompactString::from("usd"),
            payment_status: PaymentStatus::Paid,
            shipping_address: None,
            coupon_id: Some(1),
            created_at: time::OffsetDateTime::UNIX_EPOCH,
            fulfillment_status: FulfillmentStatus::Unfulfilled,
            partner_order_id: None,
            tracking_number: Some("1Z999".to_owned()),
            tracking_carrier: Some("UPS".to_owned()),
            tracking_url: Some("https://track.example/1Z999".to_owned()),
            shipped_at: None,
        }
    }

    #[test]
    fn confirmation_lists_lines_and_totals() {
        let message = order_confirmation(&order(), "Shopflow Demo").unwrap();
        assert_eq!(message.to, "buyer@example.com");
        assert!(message.subject.contains("SF-20260301-00000042"));
        assert!(message.html.contains("Trail Shoe"));
        assert!(message.html.contains("100.00 USD"));
        assert!(message.html.contains("5.00 USD"));
        assert!(message.html.contains("95.00 USD"));
        // names are escaped
        assert!(!message.html.contains("<Admin>"));
    }

    #[test]
    fn shipment_email_links_tracking() {
        let message = shipment(&order(), "Shopflow Demo").unwrap();
        assert!(message.html.contains("1Z999"));
        assert!(message.html.contains("track.example"));
    }

    #[test]
    fn missing_recipient_is_an_error() {
        let mut order = order();
        order.customer_email = None;
        assert!(matches!(
            payment_failed(&order, "Shop", None, None),
            Err(NotifyError::MissingRecipient)
        ));
    }
}
