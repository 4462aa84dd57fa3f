//! Configuration module for shopflow-server.
//!
//! Handles loading configuration from TOML files, CLI arguments,
//! and environment variables.

pub mod file;
pub mod runtime;

use crate::config::file::FileConfig;
use crate::config::runtime::{
    EmailConfig, PartnerConfig, PaymentsConfig, ServerConfig, SharedConfig, StorefrontConfig,
    TimeoutsConfig,
};
use std::net::SocketAddr;
use std::path::Path;
use thiserror::Error;
use url::Url;

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("DATABASE_URL environment variable not set")]
    MissingDatabaseUrl,
}

/// Loaded configuration result containing all parts.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub server: ServerConfig,
    pub storefront: StorefrontConfig,
    pub payments: PaymentsConfig,
    pub email: EmailConfig,
    pub partner: PartnerConfig,
    pub timeouts: TimeoutsConfig,
}

impl LoadedConfig {
    /// Validate a parsed file and convert it into runtime types.
    pub fn from_file_config(file_config: FileConfig) -> Result<Self, ConfigError> {
        validate(&file_config)?;
        let FileConfig {
            server,
            storefront,
            payments,
            email,
            partner,
            timeouts,
        } = file_config;

        Ok(Self {
            server: ServerConfig {
                listen: server.listen,
            },
            storefront: StorefrontConfig {
                store_name: storefront.store_name,
                order_prefix: storefront.order_prefix,
                success_url: storefront.success_url,
                cancel_url: storefront.cancel_url,
                shipping_countries: storefront
                    .shipping_countries
                    .into_iter()
                    .map(|c| c.to_ascii_uppercase())
                    .collect(),
                retry_url: storefront.retry_url,
            },
            payments: PaymentsConfig {
                api_base: parse_base_url("payments.api_base", &payments.api_base)?,
                secret_key: payments.secret_key,
                webhook_secret: payments.webhook_secret.into_bytes().into_boxed_slice(),
                signature_tolerance_secs: payments.signature_tolerance_secs,
            },
            email: EmailConfig {
                enabled: email.enabled,
                api_base: parse_base_url("email.api_base", &email.api_base)?,
                api_key: email.api_key,
                from_address: email.from_address,
                reply_to: email.reply_to,
            },
            partner: PartnerConfig {
                enabled: partner.enabled,
                api_base: parse_base_url("partner.api_base", &partner.api_base)?,
                api_key: partner.api_key,
                api_secret: partner.api_secret,
                service_level: partner.service_level,
                webhook_secret: partner.webhook_secret.into_bytes().into_boxed_slice(),
            },
            timeouts: TimeoutsConfig {
                http_secs: timeouts.http_secs,
                notification_secs: timeouts.notification_secs,
            },
        })
    }

    /// Convert into a SharedConfig with Arc<RwLock<T>> wrappers.
    pub fn into_shared(self) -> SharedConfig {
        SharedConfig::new(
            self.server,
            self.storefront,
            self.payments,
            self.email,
            self.partner,
            self.timeouts,
        )
    }

    /// Overwrite every section of a running SharedConfig.
    pub async fn apply_to(self, shared: &SharedConfig) {
        *shared.server.write().await = self.server;
        *shared.storefront.write().await = self.storefront;
        *shared.payments.write().await = self.payments;
        *shared.email.write().await = self.email;
        *shared.partner.write().await = self.partner;
        *shared.timeouts.write().await = self.timeouts;
    }
}

/// Configuration loader that handles the complete loading process.
pub struct ConfigLoader {
    config_path: std::path::PathBuf,
    listen_override: Option<SocketAddr>,
}

impl ConfigLoader {
    /// Create a new config loader.
    pub fn new(config_path: impl AsRef<Path>, listen_override: Option<SocketAddr>) -> Self {
        Self {
            config_path: config_path.as_ref().to_path_buf(),
            listen_override,
        }
    }

    /// Read the TOML file, apply CLI overrides, validate and build.
    pub fn load(&self) -> Result<LoadedConfig, ConfigError> {
        let config_content = std::fs::read_to_string(&self.config_path)?;
        let mut file_config: FileConfig = toml::from_str(&config_content)?;

        if let Some(listen) = self.listen_override {
            file_config.server.listen = listen;
        }

        LoadedConfig::from_file_config(file_config)
    }

    /// Reload the configuration (used during SIGHUP).
    pub fn reload(&self) -> Result<LoadedConfig, ConfigError> {
        self.load()
    }
}

fn validate(config: &FileConfig) -> Result<(), ConfigError> {
    if config.storefront.order_prefix.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "storefront.order_prefix must not be empty".to_string(),
        ));
    }
    for (field, value) in [
        ("storefront.success_url", &config.storefront.success_url),
        ("storefront.cancel_url", &config.storefront.cancel_url),
    ] {
        Url::parse(value)
            .map_err(|e| ConfigError::ValidationError(format!("{field} is not a URL: {e}")))?;
    }
    for (field, value) in [
        ("payments.secret_key", &config.payments.secret_key),
        ("payments.webhook_secret", &config.payments.webhook_secret),
        ("partner.webhook_secret", &config.partner.webhook_secret),
    ] {
        if value.is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "{field} must not be empty"
            )));
        }
    }
    if config.payments.signature_tolerance_secs <= 0 {
        return Err(ConfigError::ValidationError(
            "payments.signature_tolerance_secs must be positive".to_string(),
        ));
    }
    if config.timeouts.http_secs == 0 || config.timeouts.notification_secs == 0 {
        return Err(ConfigError::ValidationError(
            "timeouts must be at least one second".to_string(),
        ));
    }
    Ok(())
}

/// Parse a base URL, making sure it ends with `/` so relative joins keep the path.
fn parse_base_url(field: &str, value: &str) -> Result<Url, ConfigError> {
    let normalized = if value.ends_with('/') {
        value.to_string()
    } else {
        format!("{value}/")
    };
    Url::parse(&normalized)
        .map_err(|e| ConfigError::ValidationError(format!("{field} is not a URL: {e}")))
}

/// Get the database URL from the environment.
pub fn get_database_url() -> Result<String, ConfigError> {
    std::env::var("DATABASE_URL").map_err(|_| ConfigError::MissingDatabaseUrl)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"
[storefront]
store_name = "Test Store"
success_url = "https://shop.example/thanks?order={ORDER_NUMBER}"
cancel_url = "https://shop.example/cart"
shipping_countries = ["us", "CA"]

[payments]
api_base = "https://payments.test/base"
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

    #[test]
    fn loaded_config_normalizes_fields() {
        let file: FileConfig = toml::from_str(CONFIG).unwrap();
        let loaded = LoadedConfig::from_file_config(file).unwrap();
        assert_eq!(loaded.payments.api_base.as_str(), "https://payments.test/base/");
        assert_eq!(loaded.payments.webhook_secret_bytes(), b"whsec_123");
        assert_eq!(loaded.storefront.shipping_countries, vec!["US", "CA"]);
        assert_eq!(loaded.server.listen.port(), 8080);
    }

    #[test]
    fn empty_webhook_secret_is_rejected() {
        let mut file: FileConfig = toml::from_str(CONFIG).unwrap();
        file.payments.webhook_secret.clear();
        assert!(matches!(
            LoadedConfig::from_file_config(file),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn relative_redirect_url_is_rejected() {
        let mut file: FileConfig = toml::from_str(CONFIG).unwrap();
        file.storefront.success_url = "/thanks".to_string();
        assert!(LoadedConfig::from_file_config(file).is_err());
    }

    #[tokio::test]
    async fn apply_to_replaces_sections() {
        let file: FileConfig = toml::from_str(CONFIG).unwrap();
        let loaded = LoadedConfig::from_file_config(file).unwrap();
        let shared = loaded.clone().into_shared();

        let mut changed = loaded;
        changed.storefront.store_name = "Renamed".to_string();
        changed.apply_to(&shared).await;

        assert_eq!(shared.storefront.read().await.store_name, "Renamed");
    }
}
