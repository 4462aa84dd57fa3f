//! Fulfillment partner configuration.

use url::Url;

#[derive(Debug, Clone)]
pub struct PartnerConfig {
    /// When false, paid orders are not submitted.
    pub enabled: bool,
    /// Base URL of the ShipStation-compatible API.
    pub api_base: Url,
    pub api_key: String,
    pub api_secret: String,
    /// Requested shipping service sent with every order.
    pub service_level: Option<String>,
    /// Secret the partner signs shipment notifications with.
    pub webhook_secret: Box<[u8]>,
}

impl PartnerConfig {
    pub fn webhook_secret_bytes(&self) -> &[u8] {
        &self.webhook_secret
    }
}
