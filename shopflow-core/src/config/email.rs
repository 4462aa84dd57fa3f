//! Outbound email configuration.

use url::Url;

#[derive(Debug, Clone)]
pub struct EmailConfig {
    /// When false, emails are rendered but not sent.
    pub enabled: bool,
    /// Base URL of the Resend-compatible API.
    pub api_base: Url,
    pub api_key: String,
    pub from_address: String,
    pub reply_to: Option<String>,
}
