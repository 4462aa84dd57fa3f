//! Checkout session initiation.
//!
//! Prices a cart against the catalog, applies a promo code read-only, and
//! asks the processor for a hosted payment page. Nothing is persisted here:
//! the order only comes into existence when the processor reports payment.

use crate::config::StorefrontConfig;
use crate::discount::{DiscountRejection, compute_discount};
use crate::payments::{
    MetadataError, OrderMetadata, PaymentProcessor, ProcessorError, SessionLineItem,
    SessionRequest,
};
use crate::stores::{Catalog, CouponStore, StoreError};
use crate::utils::order_number::generate_order_number;
use compact_str::CompactString;
use shopflow_sdk::objects::{
    CartLine, CheckoutResponse, CreateCheckoutRequest, ValidateCouponResponse,
};
use std::sync::Arc;
use thiserror::Error;
use time::OffsetDateTime;

#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("cart is empty")]
    EmptyCart,

    #[error("quantity for {0} must be at least 1")]
    InvalidQuantity(String),

    #[error("unknown product {0}")]
    UnknownProduct(String),

    #[error("product {product_id} has no variant {variant:?}")]
    UnknownVariant {
        product_id: String,
        variant: Option<String>,
    },

    #[error("cart mixes currencies {0} and {1}")]
    MixedCurrency(CompactString, CompactString),

    #[error("order amount is too large")]
    AmountOverflow,

    #[error("coupon not found")]
    CouponNotFound,

    #[error("{0}")]
    CouponRejected(DiscountRejection),

    #[error("order snapshot error: {0}")]
    Metadata(#[from] MetadataError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("payment processor error: {0}")]
    Processor(#[from] ProcessorError),
}

impl CheckoutError {
    /// Whether the caller sent something we cannot price.
    pub fn is_client_error(&self) -> bool {
        !matches!(
            self,
            CheckoutError::Store(_) | CheckoutError::Processor(_) | CheckoutError::Metadata(_)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedCart {
    pub lines: Vec<CartLine>,
    pub currency: CompactString,
    pub subtotal_cents: i64,
}

pub struct CheckoutInitiator {
    catalog: Arc<dyn Catalog>,
    coupons: Arc<dyn CouponStore>,
    processor: Arc<dyn PaymentProcessor>,
}

impl CheckoutInitiator {
    pub fn new(
        catalog: Arc<dyn Catalog>,
        coupons: Arc<dyn CouponStore>,
        processor: Arc<dyn PaymentProcessor>,
    ) -> Self {
        Self {
            catalog,
            coupons,
            processor,
        }
    }

    /// Resolve every requested line against server-side prices.
    pub async fn price_cart(&self, request: &CreateCheckoutRequest) -> Result<PricedCart, CheckoutError> {
        if request.lines.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }
        let mut lines = Vec::with_capacity(request.lines.len());
        let mut currency: Option<CompactString> = None;
        let mut subtotal_cents: i64 = 0;

        for item in &request.lines {
            if item.quantity == 0 {
                return Err(CheckoutError::InvalidQuantity(item.product_id.clone()));
            }
            let catalog_item = self
                .catalog
                .find_item(&item.product_id)
                .await?
                .ok_or_else(|| CheckoutError::UnknownProduct(item.product_id.clone()))?;
            if !catalog_item.accepts_variant(item.variant.as_deref()) {
                return Err(CheckoutError::UnknownVariant {
                    product_id: item.product_id.clone(),
                    variant: item.variant.as_ref().map(|v| v.to_string()),
                });
            }
            match &currency {
                Some(c) if !c.eq_ignore_ascii_case(&catalog_item.currency) => {
                    return Err(CheckoutError::MixedCurrency(
                        c.clone(),
                        catalog_item.currency.clone(),
                    ));
                }
                Some(_) => {}
                None => currency = Some(catalog_item.currency.to_lowercase().into()),
            }

            let line = CartLine {
                product_id: catalog_item.product_id,
                name: catalog_item.name,
                unit_amount_cents: catalog_item.unit_amount_cents,
                quantity: item.quantity,
                currency: catalog_item.currency.to_lowercase().into(),
                variant: item.variant.clone(),
                sku: catalog_item.sku,
                weight_grams: catalog_item.weight_grams,
            };
            subtotal_cents = line
                .line_total_cents()
                .and_then(|total| subtotal_cents.checked_add(total))
                .ok_or(CheckoutError::AmountOverflow)?;
            lines.push(line);
        }

        Ok(PricedCart {
            lines,
            currency: currency.ok_or(CheckoutError::EmptyCart)?,
            subtotal_cents,
        })
    }

    #[tracing::instrument(skip_all, fields(lines = request.lines.len()))]
    pub async fn create_session(
        &self,
        request: CreateCheckoutRequest,
        config: &StorefrontConfig,
        now: OffsetDateTime,
    ) -> Result<CheckoutResponse, CheckoutError> {
        let cart = self.price_cart(&request).await?;

        let (coupon_id, discount_cents) = match request
            .promo_code
            .as_deref()
            .map(str::trim)
            .filter(|code| !code.is_empty())
        {
            Some(code) => {
                let coupon = self
                    .coupons
                    .find_by_code(code)
                    .await?
                    .ok_or(CheckoutError::CouponNotFound)?;
                let outcome = compute_discount(&coupon, cart.subtotal_cents, now);
                if let Some(rejection) = outcome.rejection {
                    return Err(CheckoutError::CouponRejected(rejection));
                }
                (Some(coupon.id), outcome.discount_cents)
            }
            None => (None, 0),
        };
        let total_cents = (cart.subtotal_cents - discount_cents).max(0);

        let order_number = generate_order_number(&config.order_prefix, now);
        let snapshot = OrderMetadata {
            order_number: order_number.clone(),
            lines: cart.lines,
            customer: request.customer.clone(),
            coupon_id,
            subtotal_cents: cart.subtotal_cents,
            discount_cents,
            currency: cart.currency.clone(),
        };
        let metadata = snapshot.encode()?;

        let session_request = SessionRequest {
            order_number: order_number.clone(),
            currency: cart.currency,
            line_items: snapshot
                .lines
                .iter()
                .map(|line| SessionLineItem {
                    name: match &line.variant {
                        Some(variant) => format!("{} ({variant})", line.name),
                        None => line.name.clone(),
                    },
                    unit_amount_cents: line.unit_amount_cents,
                    quantity: line.quantity,
                })
                .collect(),
            discount_cents,
            success_url: config.success_url_for(&order_number),
            cancel_url: config.cancel_url_for(&order_number),
            customer_email: request
                .customer
                .as_ref()
                .and_then(|c| c.email.clone())
                .filter(|e| !e.is_empty()),
            shipping_countries: config.shipping_countries.clone(),
            metadata,
        };

        let session = self.processor.create_session(session_request).await?;
        tracing::info!(
            order_number = %order_number,
            session_id = %session.session_id,
            subtotal_cents = snapshot.subtotal_cents,
            discount_cents,
            "Checkout session created"
        );

        Ok(CheckoutResponse {
            redirect_url: session.redirect_url,
            order_number,
            session_id: session.session_id,
            subtotal_cents: snapshot.subtotal_cents,
            discount_cents,
            total_cents,
        })
    }

    /// The storefront's pre-payment coupon check. Never mutates usage.
    pub async fn validate_coupon(
        &self,
        code: &str,
        subtotal_cents: i64,
        now: OffsetDateTime,
    ) -> Result<ValidateCouponResponse, StoreError> {
        let Some(coupon) = self.coupons.find_by_code(code.trim()).await? else {
            return Ok(ValidateCouponResponse {
                valid: false,
                discount_cents: 0,
                message: CheckoutError::CouponNotFound.to_string(),
                coupon_id: None,
            });
        };
        let outcome = compute_discount(&coupon, subtotal_cents, now);
        Ok(match outcome.rejection {
            Some(rejection) => ValidateCouponResponse {
                valid: false,
                discount_cents: 0,
                message: rejection.to_string(),
                coupon_id: None,
            },
            None => ValidateCouponResponse {
                valid: true,
                discount_cents: outcome.discount_cents,
                message: "coupon applied".to_owned(),
                coupon_id: Some(coupon.id),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::CouponKind;
    use crate::entities::catalog::CatalogItem;
    use crate::entities::coupons::Coupon;
    use crate::payments::RecordingPaymentProcessor;
    use crate::stores::memory::{MemoryCatalog, MemoryCouponStore};
    use shopflow_sdk::objects::{CartItemRequest, CustomerInfo};
    use std::collections::HashMap;
    use time::macros::datetime;

    const NOW: OffsetDateTime = datetime!(2026-03-01 12:00 UTC);

    fn config() -> StorefrontConfig {
        StorefrontConfig {
            store_name: "Shop".to_owned(),
            order_prefix: "SF".to_owned(),
            success_url: "https://shop.example/thanks?order={ORDER_NUMBER}".to_owned(),
            cancel_url: "https://shop.example/cart".to_owned(),
            shipping_countries: vec!["US".to_owned()],
            retry_url: None,
        }
    }

    fn shoe() -> CatalogItem {
        CatalogItem {
            product_id: "A".to_owned(),
            name: "Trail Shoe".to_owned(),
            unit_amount_cents: 5000,
            currency: CompactString::from("usd"),
            sku: Some("TS".to_owned()),
            weight_grams: Some(800),
            variants: vec!["8".to_owned(), "9".to_owned()],
        }
    }

    fn coupon() -> Coupon {
        Coupon {
            id: 3,
            code: "SPRING10".to_owned(),
            kind: CouponKind::Percentage,
            value: 10,
            min_purchase_cents: None,
            max_discount_cents: Some(500),
            usage_limit: Some(100),
            usage_count: 0,
            active: true,
            expires_at: None,
        }
    }

    fn initiator() -> (CheckoutInitiator, Arc<RecordingPaymentProcessor>, Arc<MemoryCouponStore>) {
        let processor = Arc::new(RecordingPaymentProcessor::new());
        let coupons = Arc::new(MemoryCouponStore::new().with_coupon(coupon()));
        let catalog = Arc::new(
            MemoryCatalog::new()
                .with_item(shoe())
                .with_item(CatalogItem {
                    product_id: "EU".to_owned(),
                    currency: CompactString::from("eur"),
                    variants: vec![],
                    ..shoe()
                }),
        );
        (
            CheckoutInitiator::new(catalog, coupons.clone(), processor.clone()),
            processor,
            coupons,
        )
    }

    fn request(promo_code: Option<&str>) -> CreateCheckoutRequest {
        CreateCheckoutRequest {
            lines: vec![CartItemRequest {
                product_id: "A".to_owned(),
                variant: Some(CompactString::from("8")),
                quantity: 2,
            }],
            promo_code: promo_code.map(str::to_owned),
            customer: Some(CustomerInfo {
                email: Some("buyer@example.com".to_owned()),
                ..Default::default()
            }),
        }
    }

    #[tokio::test]
    async fn prices_cart_and_applies_clamped_discount() {
        let (initiator, processor, coupons) = initiator();
        let response = initiator
            .create_session(request(Some("spring10")), &config(), NOW)
            .await
            .unwrap();
        assert_eq!(response.subtotal_cents, 10_000);
        assert_eq!(response.discount_cents, 500);
        assert_eq!(response.total_cents, 9_500);
        assert!(response.order_number.starts_with("SF-20260301-"));
        assert_eq!(response.session_id, "cs_test_1");

        let sent = processor.requests().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].discount_cents, 500);
        assert_eq!(sent[0].line_items[0].unit_amount_cents, 5000);
        assert_eq!(
            sent[0].success_url,
            format!("https://shop.example/thanks?order={}", response.order_number)
        );
        assert_eq!(sent[0].customer_email.as_deref(), Some("buyer@example.com"));

        // The snapshot round-trips and nothing was redeemed.
        let metadata: HashMap<String, String> = sent[0].metadata.clone().into_iter().collect();
        let snapshot = OrderMetadata::decode(&metadata).unwrap().unwrap();
        assert_eq!(snapshot.order_number, response.order_number);
        assert_eq!(snapshot.coupon_id, Some(3));
        assert_eq!(snapshot.lines[0].sku.as_deref(), Some("TS"));
        assert_eq!(coupons.get(3).await.unwrap().usage_count, 0);
    }

    #[tokio::test]
    async fn rejects_bad_carts() {
        let (initiator, processor, _) = initiator();
        let empty = CreateCheckoutRequest {
            lines: vec![],
            promo_code: None,
            customer: None,
        };
        assert!(matches!(
            initiator.create_session(empty, &config(), NOW).await,
            Err(CheckoutError::EmptyCart)
        ));

        let mut zero = request(None);
        zero.lines[0].quantity = 0;
        assert!(matches!(
            initiator.create_session(zero, &config(), NOW).await,
            Err(CheckoutError::InvalidQuantity(_))
        ));

        let mut unknown = request(None);
        unknown.lines[0].product_id = "missing".to_owned();
        assert!(matches!(
            initiator.create_session(unknown, &config(), NOW).await,
            Err(CheckoutError::UnknownProduct(_))
        ));

        let mut no_size = request(None);
        no_size.lines[0].variant = None;
        assert!(matches!(
            initiator.create_session(no_size, &config(), NOW).await,
            Err(CheckoutError::UnknownVariant { .. })
        ));

        let mut mixed = request(None);
        mixed.lines.push(CartItemRequest {
            product_id: "EU".to_owned(),
            variant: None,
            quantity: 1,
        });
        assert!(matches!(
            initiator.create_session(mixed, &config(), NOW).await,
            Err(CheckoutError::MixedCurrency(_, _))
        ));

        assert!(processor.requests().await.is_empty());
    }

    #[tokio::test]
    async fn rejected_coupon_fails_checkout() {
        let (initiator, _, coupons) = initiator();
        let mut exhausted = coupon();
        exhausted.usage_count = 100;
        coupons.insert(exhausted).await;
        let err = initiator
            .create_session(request(Some("SPRING10")), &config(), NOW)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CheckoutError::CouponRejected(DiscountRejection::Exhausted)
        ));
        assert!(err.is_client_error());

        assert!(matches!(
            initiator
                .create_session(request(Some("NOPE")), &config(), NOW)
                .await,
            Err(CheckoutError::CouponNotFound)
        ));
    }

    #[tokio::test]
    async fn processor_failure_is_reported() {
        let (initiator, processor, _) = initiator();
        processor.fail_requests(true);
        let err = initiator
            .create_session(request(None), &config(), NOW)
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::Processor(_)));
        assert!(!err.is_client_error());
    }

    #[tokio::test]
    async fn validates_coupons() {
        let (initiator, _, _) = initiator();
        let ok = initiator.validate_coupon("Spring10", 10_000, NOW).await.unwrap();
        assert!(ok.valid);
        assert_eq!(ok.discount_cents, 500);
        assert_eq!(ok.coupon_id, Some(3));

        let missing = initiator.validate_coupon("nope", 10_000, NOW).await.unwrap();
        assert!(!missing.valid);
        assert_eq!(missing.message, "coupon not found");
    }
}
