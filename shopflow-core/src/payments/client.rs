//! Hosted checkout session creation.

use crate::config::PaymentsConfig;
use async_trait::async_trait;
use compact_str::CompactString;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;

#[derive(Debug, Error)]
pub enum ProcessorError {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("processor rejected request with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("invalid processor response: {0}")]
    InvalidResponse(String),

    #[error("invalid processor URL: {0}")]
    Url(#[from] url::ParseError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionLineItem {
    pub name: String,
    pub unit_amount_cents: i64,
    pub quantity: u32,
}

/// A fully priced session. Amounts are already server-trusted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRequest {
    pub order_number: String,
    pub currency: CompactString,
    pub line_items: Vec<SessionLineItem>,
    /// Applied as a one-off amount-off discount when positive.
    pub discount_cents: i64,
    pub success_url: String,
    pub cancel_url: String,
    pub customer_email: Option<String>,
    pub shipping_countries: Vec<String>,
    pub metadata: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessorSession {
    pub session_id: String,
    pub redirect_url: String,
}

#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    async fn create_session(&self, request: SessionRequest) -> Result<ProcessorSession, ProcessorError>;
}

/// Client for a Stripe-compatible Checkout API.
///
/// The API base and secret key are read from the shared config section on
/// every call.
#[derive(Debug, Clone)]
pub struct StripeCheckoutClient {
    http_client: reqwest::Client,
    config: Arc<RwLock<PaymentsConfig>>,
}

#[derive(Debug, Deserialize)]
struct CreatedObject {
    id: String,
    #[serde(default)]
    url: Option<String>,
}

impl StripeCheckoutClient {
    pub fn new(config: Arc<RwLock<PaymentsConfig>>, timeout: Duration) -> Self {
        Self {
            http_client: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            config,
        }
    }

    async fn post_form(
        &self,
        path: &str,
        idempotency_key: &str,
        form: &[(String, String)],
    ) -> Result<CreatedObject, ProcessorError> {
        let (url, secret_key) = {
            let config = self.config.read().await;
            (config.api_base.join(path)?, config.secret_key.clone())
        };
        let response = self
            .http_client
            .post(url)
            .bearer_auth(secret_key)
            .header("Idempotency-Key", idempotency_key)
            .form(form)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProcessorError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        response
            .json::<CreatedObject>()
            .await
            .map_err(|e| ProcessorError::InvalidResponse(e.to_string()))
    }

    /// A single-use amount-off coupon carrying the discount we computed.
    async fn create_one_off_coupon(&self, request: &SessionRequest) -> Result<String, ProcessorError> {
        let form = vec![
            ("amount_off".to_owned(), request.discount_cents.to_string()),
            ("currency".to_owned(), request.currency.to_string()),
            ("duration".to_owned(), "once".to_owned()),
            ("max_redemptions".to_owned(), "1".to_owned()),
            ("name".to_owned(), format!("Order {}", request.order_number)),
        ];
        let coupon = self
            .post_form(
                "v1/coupons",
                &format!("{}-coupon", request.order_number),
                &form,
            )
            .await?;
        Ok(coupon.id)
    }
}

/// Form fields for `POST /v1/checkout/sessions`.
pub fn session_form(request: &SessionRequest, coupon_id: Option<&str>) -> Vec<(String, String)> {
    let mut form = vec![
        ("mode".to_owned(), "payment".to_owned()),
        ("success_url".to_owned(), request.success_url.clone()),
        ("cancel_url".to_owned(), request.cancel_url.clone()),
        ("client_reference_id".to_owned(), request.order_number.clone()),
    ];
    if let Some(email) = &request.customer_email {
        form.push(("customer_email".to_owned(), email.clone()));
    }
    for (i, item) in request.line_items.iter().enumerate() {
        let prefix = format!("line_items[{i}]");
        form.push((
            format!("{prefix}[price_data][currency]"),
            request.currency.to_string(),
        ));
        form.push((
            format!("{prefix}[price_data][product_data][name]"),
            item.name.clone(),
        ));
        form.push((
            format!("{prefix}[price_data][unit_amount]"),
            item.unit_amount_cents.to_string(),
        ));
        form.push((format!("{prefix}[quantity]"), item.quantity.to_string()));
    }
    if let Some(coupon_id) = coupon_id {
        form.push(("discounts[0][coupon]".to_owned(), coupon_id.to_owned()));
    }
    for (i, country) in request.shipping_countries.iter().enumerate() {
        form.push((
            format!("shipping_address_collection[allowed_countries][{i}]"),
            country.clone(),
        ));
    }
    for (key, value) in &request.metadata {
        form.push((format!("metadata[{key}]"), value.clone()));
        form.push((
            format!("payment_intent_data[metadata][{key}]"),
            value.clone(),
        ));
    }
    form
}

#[async_trait]
impl PaymentProcessor for StripeCheckoutClient {
    #[tracing::instrument(skip_all, err, fields(order_number = %request.order_number))]
    async fn create_session(&self, request: SessionRequest) -> Result<ProcessorSession, ProcessorError> {
        let coupon_id = if request.discount_cents > 0 {
            Some(self.create_one_off_coupon(&request).await?)
        } else {
            None
        };
        let form = session_form(&request, coupon_id.as_deref());
        let session = self
            .post_form("v1/checkout/sessions", &request.order_number, &form)
            .await?;
        let redirect_url = session.url.ok_or_else(|| {
            ProcessorError::InvalidResponse(format!("session {} has no url", session.id))
        })?;
        tracing::debug!(session_id = %session.id, "Checkout session created");
        Ok(ProcessorSession {
            session_id: session.id,
            redirect_url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> SessionRequest {
        let mut metadata = BTreeMap::new();
        metadata.insert("order_number".to_owned(), "SF-1".to_owned());
        SessionRequest {
            order_number: "SF-1".to_owned(),
            currency: CompactString::from("usd"),
            line_items: vec![SessionLineItem {
                name: "Shoe".to_owned(),
                unit_amount_cents: 5000,
                quantity: 2,
            }],
            discount_cents: 500,
            success_url: "https://shop.example/thanks?order=SF-1".to_owned(),
            cancel_url: "https://shop.example/cart".to_owned(),
            customer_email: Some("buyer@example.com".to_owned()),
            shipping_countries: vec!["US".to_owned()],
            metadata,
        }
    }

    fn field<'a>(form: &'a [(String, String)], key: &str) -> Option<&'a str> {
        form.iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn session_form_carries_prices_and_metadata() {
        let form = session_form(&request(), Some("co_1"));
        assert_eq!(field(&form, "line_items[0][price_data][unit_amount]"), Some("5000"));
        assert_eq!(field(&form, "line_items[0][quantity]"), Some("2"));
        assert_eq!(field(&form, "discounts[0][coupon]"), Some("co_1"));
        assert_eq!(field(&form, "metadata[order_number]"), Some("SF-1"));
        assert_eq!(
            field(&form, "payment_intent_data[metadata][order_number]"),
            Some("SF-1")
        );
        assert_eq!(
            field(&form, "shipping_address_collection[allowed_countries][0]"),
            Some("US")
        );
    }

    #[test]
    fn no_discount_means_no_coupon_field() {
        let form = session_form(&request(), None);
        assert_eq!(field(&form, "discounts[0][coupon]"), None);
    }
}
