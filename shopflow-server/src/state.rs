//! Application state shared across all request handlers.

use shopflow_core::checkout::CheckoutInitiator;
use shopflow_core::config::SharedConfig;
use shopflow_core::notify::{EmailSender, HttpEmailSender, HttpPartnerClient, PartnerClient};
use shopflow_core::payments::{PaymentProcessor, StripeCheckoutClient};
use shopflow_core::processors::{FulfillmentProcessor, NotificationDispatcher, ShipmentProcessor};
use shopflow_core::stores::postgres::PostgresStore;
use shopflow_core::stores::{Catalog, CouponStore, InventoryStore, OrderStore};
use sqlx::PgPool;
use std::sync::Arc;

/// Application state that is shared across all request handlers.
///
/// This is cloneable and cheap to pass around (everything is behind Arc).
#[derive(Clone)]
pub struct AppState {
    /// Runtime configuration (can be reloaded via SIGHUP).
    pub config: SharedConfig,
    pub checkout: Arc<CheckoutInitiator>,
    pub fulfillment: Arc<FulfillmentProcessor>,
    pub shipments: Arc<ShipmentProcessor>,
}

/// The storage and outbound collaborators the handlers run against.
pub struct Collaborators {
    pub orders: Arc<dyn OrderStore>,
    pub inventory: Arc<dyn InventoryStore>,
    pub coupons: Arc<dyn CouponStore>,
    pub catalog: Arc<dyn Catalog>,
    pub processor: Arc<dyn PaymentProcessor>,
    pub email: Arc<dyn EmailSender>,
    pub partner: Arc<dyn PartnerClient>,
}

impl AppState {
    /// Build the production state: Postgres for every store and HTTP clients
    /// for the processor, email and partner APIs.
    pub async fn new(db: PgPool, config: SharedConfig) -> Self {
        let http_timeout = config.timeouts.read().await.http();
        let store = Arc::new(PostgresStore::new(db));

        Self::from_parts(
            config.clone(),
            Collaborators {
                orders: store.clone(),
                inventory: store.clone(),
                coupons: store.clone(),
                catalog: store,
                processor: Arc::new(StripeCheckoutClient::new(
                    config.payments.clone(),
                    http_timeout,
                )),
                email: Arc::new(HttpEmailSender::new(config.email.clone(), http_timeout)),
                partner: Arc::new(HttpPartnerClient::new(config.partner.clone(), http_timeout)),
            },
        )
    }

    /// Wire the state from explicit collaborators.
    pub fn from_parts(config: SharedConfig, parts: Collaborators) -> Self {
        let notifier = NotificationDispatcher::new(
            parts.email,
            parts.partner,
            parts.orders.clone(),
            config.clone(),
        );

        Self {
            checkout: Arc::new(CheckoutInitiator::new(
                parts.catalog,
                parts.coupons.clone(),
                parts.processor,
            )),
            fulfillment: Arc::new(FulfillmentProcessor::new(
                parts.orders.clone(),
                parts.inventory,
                parts.coupons,
                notifier.clone(),
            )),
            shipments: Arc::new(ShipmentProcessor::new(parts.orders, notifier)),
            config,
        }
    }
}
