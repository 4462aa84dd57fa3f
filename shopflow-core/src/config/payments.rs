//! Payment processor configuration.

use url::Url;

#[derive(Debug, Clone)]
pub struct PaymentsConfig {
    /// Base URL of the Stripe-compatible API, e.g. `https://api.stripe.com/`.
    pub api_base: Url,
    /// Secret API key used as the bearer token.
    pub secret_key: String,
    /// Secret bytes for verifying webhook signatures.
    pub webhook_secret: Box<[u8]>,
    /// Maximum accepted age of a webhook signature, in seconds.
    pub signature_tolerance_secs: i64,
}

impl PaymentsConfig {
    pub fn webhook_secret_bytes(&self) -> &[u8] {
        &self.webhook_secret
    }
}
