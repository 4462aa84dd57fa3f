//! Shipment-notification client (fulfillment partner → Shopflow server).
//!
//! Every request body is signed with
//! `HMAC-SHA256("{timestamp}.{json}", partner_webhook_secret)`.

use reqwest::Client;
use url::Url;

use super::{ClientError, parse_response};
use crate::objects::shipment::{ShipmentAck, ShipmentNotification};
use crate::signature::{SIGNATURE_HEADER, SignedObject};

/// Typed client used by partner-side tooling to push shipment updates.
#[derive(Debug, Clone)]
pub struct FulfillmentWebhookClient {
    http: Client,
    base_url: Url,
    secret: Vec<u8>,
}

impl FulfillmentWebhookClient {
    pub fn new(base_url: Url, webhook_secret: impl Into<Vec<u8>>) -> Self {
        Self {
            http: Client::new(),
            base_url,
            secret: webhook_secret.into(),
        }
    }

    /// `POST /api/v1/webhooks/fulfillment`
    pub async fn notify_shipment(
        &self,
        notification: ShipmentNotification,
    ) -> Result<ShipmentAck, ClientError> {
        let signed = SignedObject::new(notification, &self.secret)?;
        let url = self.base_url.join("/api/v1/webhooks/fulfillment")?;

        let resp = self
            .http
            .post(url)
            .header(SIGNATURE_HEADER, signed.to_header())
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(signed.json)
            .send()
            .await?;

        parse_response(resp).await
    }
}
