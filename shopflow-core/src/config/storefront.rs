//! Storefront configuration.

/// Placeholder replaced with the order number in redirect URLs.
pub const ORDER_NUMBER_PLACEHOLDER: &str = "{ORDER_NUMBER}";

#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// Shown in customer emails.
    pub store_name: String,
    /// Prefix of generated order numbers, e.g. `SF`.
    pub order_prefix: String,
    /// Where the processor sends the customer after paying.
    pub success_url: String,
    /// Where the processor sends the customer after abandoning payment.
    pub cancel_url: String,
    /// Countries the hosted page collects shipping addresses for.
    pub shipping_countries: Vec<String>,
    /// Link offered in payment-failed emails.
    pub retry_url: Option<String>,
}

impl StorefrontConfig {
    pub fn success_url_for(&self, order_number: &str) -> String {
        self.success_url
            .replace(ORDER_NUMBER_PLACEHOLDER, order_number)
    }

    pub fn cancel_url_for(&self, order_number: &str) -> String {
        self.cancel_url.replace(ORDER_NUMBER_PLACEHOLDER, order_number)
    }

    pub fn retry_url_for(&self, order_number: &str) -> Option<String> {
        self.retry_url
            .as_ref()
            .map(|url| url.replace(ORDER_NUMBER_PLACEHOLDER, order_number))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_number_is_substituted() {
        let config = StorefrontConfig {
            store_name: "Shop".to_owned(),
            order_prefix: "SF".to_owned(),
            success_url: "https://shop.example/thanks?order={ORDER_NUMBER}".to_owned(),
            cancel_url: "https://shop.example/cart".to_owned(),
            shipping_countries: vec![],
            retry_url: None,
        };
        assert_eq!(
            config.success_url_for("SF-1"),
            "https://shop.example/thanks?order=SF-1"
        );
        assert_eq!(config.cancel_url_for("SF-1"), "https://shop.example/cart");
        assert_eq!(config.retry_url_for("SF-1"), None);
    }
}
