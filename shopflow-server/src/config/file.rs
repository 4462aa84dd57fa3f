//! TOML file configuration structures.
//!
//! These structs directly map to the `shopflow-config.toml` file format.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// Root configuration structure as read from the TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub server: ServerConfig,
    pub storefront: StorefrontConfig,
    pub payments: PaymentsConfig,
    pub email: EmailConfig,
    pub partner: PartnerConfig,
    #[serde(default)]
    pub timeouts: TimeoutsConfig,
}

/// Server configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// The address and port to listen on (e.g., "0.0.0.0:8080").
    #[serde(default = "default_listen_addr")]
    pub listen: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen_addr(),
        }
    }
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

/// Storefront section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorefrontConfig {
    pub store_name: String,
    #[serde(default = "default_order_prefix")]
    pub order_prefix: String,
    /// May contain `{ORDER_NUMBER}`.
    pub success_url: String,
    /// May contain `{ORDER_NUMBER}`.
    pub cancel_url: String,
    #[serde(default)]
    pub shipping_countries: Vec<String>,
    #[serde(default)]
    pub retry_url: Option<String>,
}

fn default_order_prefix() -> String {
    "SF".to_string()
}

/// Payment processor section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentsConfig {
    #[serde(default = "default_payments_api")]
    pub api_base: String,
    pub secret_key: String,
    pub webhook_secret: String,
    #[serde(default = "default_tolerance")]
    pub signature_tolerance_secs: i64,
}

fn default_payments_api() -> String {
    "https://api.stripe.com/".to_string()
}

fn default_tolerance() -> i64 {
    shopflow_sdk::signature::DEFAULT_PROCESSOR_TOLERANCE
}

/// Outbound email section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_email_api")]
    pub api_base: String,
    pub api_key: String,
    pub from_address: String,
    #[serde(default)]
    pub reply_to: Option<String>,
}

fn default_email_api() -> String {
    "https://api.resend.com/".to_string()
}

/// Fulfillment partner section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartnerConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_partner_api")]
    pub api_base: String,
    pub api_key: String,
    pub api_secret: String,
    #[serde(default)]
    pub service_level: Option<String>,
    /// Secret for verifying shipment notifications.
    pub webhook_secret: String,
}

fn default_partner_api() -> String {
    "https://ssapi.shipstation.com/".to_string()
}

/// Timeout section, in seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutsConfig {
    #[serde(default = "default_http_secs")]
    pub http_secs: u64,
    #[serde(default = "default_notification_secs")]
    pub notification_secs: u64,
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        Self {
            http_secs: default_http_secs(),
            notification_secs: default_notification_secs(),
        }
    }
}

fn default_http_secs() -> u64 {
    10
}

fn default_notification_secs() -> u64 {
    15
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_parsing() {
        let toml_str = r#"
[server]
listen = "127.0.0.1:3000"

[storefront]
store_name = "Test Store"
success_url = "https://shop.example/thanks?order={ORDER_NUMBER}"
cancel_url = "https://shop.example/cart"

[payments]
secret_key = "sk_test_123"
webhook_secret = "whsec_123"

[email]
api_key = "re_123"
from_address = "orders@shop.example"

[partner]
api_key = "key"
api_secret = "secret"
webhook_secret = "partner_secret"
"#;
        let config: FileConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.listen.port(), 3000);
        assert_eq!(config.storefront.order_prefix, "SF");
        assert_eq!(config.payments.api_base, "https://api.stripe.com/");
        assert_eq!(config.payments.signature_tolerance_secs, 300);
        assert!(config.email.enabled);
        assert_eq!(config.timeouts.notification_secs, 15);
    }

    #[test]
    fn test_missing_section_is_an_error() {
        let toml_str = r#"
[storefront]
store_name = "Test Store"
success_url = "https://shop.example/thanks"
cancel_url = "https://shop.example/cart"
"#;
        assert!(toml::from_str::<FileConfig>(toml_str).is_err());
    }
}
