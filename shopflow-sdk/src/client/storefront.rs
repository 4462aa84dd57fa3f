//! Storefront API client (storefront backend → Shopflow server).

use reqwest::Client;
use url::Url;

use super::{ClientError, parse_response};
use crate::objects::checkout::{CheckoutResponse, CreateCheckoutRequest};
use crate::objects::coupon::{ValidateCouponRequest, ValidateCouponResponse};

/// Typed HTTP client for the storefront-facing endpoints.
#[derive(Debug, Clone)]
pub struct StorefrontClient {
    http: Client,
    base_url: Url,
}

impl StorefrontClient {
    /// Create a new `StorefrontClient` rooted at `base_url`
    /// (e.g. `https://shop.example.com`).
    pub fn new(base_url: Url) -> Self {
        Self {
            http: Client::new(),
            base_url,
        }
    }

    /// Replace the default `reqwest::Client` with a custom one (e.g. to
    /// configure timeouts or a proxy).
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http = client;
        self
    }

    /// `POST /api/v1/checkout` – price the cart and open a processor session.
    pub async fn create_checkout(
        &self,
        request: &CreateCheckoutRequest,
    ) -> Result<CheckoutResponse, ClientError> {
        let url = self.base_url.join("/api/v1/checkout")?;
        let resp = self.http.post(url).json(request).send().await?;
        parse_response(resp).await
    }

    /// `POST /api/v1/coupons/validate` – check a promo code before payment.
    pub async fn validate_coupon(
        &self,
        code: impl Into<String>,
        subtotal_cents: i64,
    ) -> Result<ValidateCouponResponse, ClientError> {
        let url = self.base_url.join("/api/v1/coupons/validate")?;
        let body = ValidateCouponRequest {
            code: code.into(),
            subtotal_cents,
        };
        let resp = self.http.post(url).json(&body).send().await?;
        parse_response(resp).await
    }
}
