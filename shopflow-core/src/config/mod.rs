//! Configuration types for Shopflow.
//!
//! These types represent the validated runtime configuration used by the server
//! and the clients in this crate. The actual config loading/parsing is handled
//! by the server crate.

mod email;
mod partner;
mod payments;
mod server;
mod storefront;
mod timeouts;

pub use email::EmailConfig;
pub use partner::PartnerConfig;
pub use payments::PaymentsConfig;
pub use server::ServerConfig;
pub use storefront::StorefrontConfig;
pub use timeouts::TimeoutsConfig;

use std::sync::Arc;
use tokio::sync::RwLock;

/// Shared configuration state with separate locks for each section.
///
/// Every consumer reads its section per call, so a SIGHUP reload takes
/// effect on the next request without rebuilding clients.
#[derive(Debug, Clone)]
pub struct SharedConfig {
    pub server: Arc<RwLock<ServerConfig>>,
    pub storefront: Arc<RwLock<StorefrontConfig>>,
    pub payments: Arc<RwLock<PaymentsConfig>>,
    pub email: Arc<RwLock<EmailConfig>>,
    pub partner: Arc<RwLock<PartnerConfig>>,
    pub timeouts: Arc<RwLock<TimeoutsConfig>>,
}

impl SharedConfig {
    pub fn new(
        server: ServerConfig,
        storefront: StorefrontConfig,
        payments: PaymentsConfig,
        email: EmailConfig,
        partner: PartnerConfig,
        timeouts: TimeoutsConfig,
    ) -> Self {
        Self {
            server: Arc::new(RwLock::new(server)),
            storefront: Arc::new(RwLock::new(storefront)),
            payments: Arc::new(RwLock::new(payments)),
            email: Arc::new(RwLock::new(email)),
            partner: Arc::new(RwLock::new(partner)),
            timeouts: Arc::new(RwLock::new(timeouts)),
        }
    }
}

#[cfg(test)]
pub(crate) fn test_config() -> SharedConfig {
    let url = |s: &str| url::Url::parse(s).unwrap_or_else(|_| unreachable!());
    SharedConfig::new(
        ServerConfig {
            listen: std::net::SocketAddr::from(([127, 0, 0, 1], 0)),
        },
        StorefrontConfig {
            store_name: "Shopflow Test".to_owned(),
            order_prefix: "SF".to_owned(),
            success_url: "https://shop.example/thanks?order={ORDER_NUMBER}".to_owned(),
            cancel_url: "https://shop.example/cart".to_owned(),
            shipping_countries: vec!["US".to_owned()],
            retry_url: Some("https://shop.example/retry/{ORDER_NUMBER}".to_owned()),
        },
        PaymentsConfig {
            api_base: url("https://api.stripe.test/"),
            secret_key: "sk_test".to_owned(),
            webhook_secret: b"whsec_test".to_vec().into_boxed_slice(),
            signature_tolerance_secs: 300,
        },
        EmailConfig {
            enabled: true,
            api_base: url("https://mail.test/"),
            api_key: "re_test".to_owned(),
            from_address: "orders@shop.example".to_owned(),
            reply_to: None,
        },
        PartnerConfig {
            enabled: true,
            api_base: url("https://partner.test/"),
            api_key: "key".to_owned(),
            api_secret: "secret".to_owned(),
            service_level: Some("ups_ground".to_owned()),
            webhook_secret: b"partner_secret".to_vec().into_boxed_slice(),
        },
        TimeoutsConfig {
            http_secs: 5,
            notification_secs: 1,
        },
    )
}
