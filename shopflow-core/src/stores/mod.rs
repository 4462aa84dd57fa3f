//! Durable stores behind narrow, injectable traits.
//!
//! The orchestrator only ever sees these traits. [`postgres`] backs them
//! with the `Processor` commands in [`crate::entities`]; [`memory`] backs
//! them with mutex-guarded maps for tests and local runs.
//!
//! Correctness under at-least-once delivery depends on exactly one atomic
//! primitive: [`OrderStore::create_if_absent`]. Inventory and coupon
//! counters are atomic on their own but are only safe to call because
//! they sit behind that gate.

pub mod memory;
pub mod postgres;

use crate::entities::FulfillmentStatus;
use crate::entities::catalog::CatalogItem;
use crate::entities::coupons::Coupon;
use crate::entities::orders::{NewOrder, Order};
use async_trait::async_trait;
use thiserror::Error;

/// Failure of the storage layer itself.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("order {0} vanished between insert and lookup")]
    Inconsistent(String),
}

/// Result of the idempotency gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateOutcome {
    /// This call wrote the order; the caller owns the side effects.
    Created(Order),
    /// Another delivery already wrote it; the caller must skip side effects.
    AlreadyExists(Order),
}

/// Tracking details reported by the fulfillment partner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShipmentUpdate {
    pub order_number: String,
    pub tracking_number: String,
    pub carrier: Option<String>,
    pub tracking_url: Option<String>,
    pub shipped_at: Option<time::OffsetDateTime>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShipmentOutcome {
    Updated(Order),
    /// The same tracking number was already on file.
    Unchanged(Order),
    /// No paid order with that number.
    NotFound,
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Create the order unless one with the same number exists.
    ///
    /// Must be atomic at the storage layer.
    async fn create_if_absent(&self, order: NewOrder) -> Result<CreateOutcome, StoreError>;

    async fn find_by_number(&self, order_number: &str) -> Result<Option<Order>, StoreError>;

    async fn set_fulfillment_status(
        &self,
        order_number: &str,
        status: FulfillmentStatus,
        partner_order_id: Option<String>,
    ) -> Result<(), StoreError>;

    async fn record_shipment(&self, update: ShipmentUpdate) -> Result<ShipmentOutcome, StoreError>;
}

#[derive(Debug, Error)]
pub enum InventoryError {
    #[error("insufficient stock for {product_id} (variant {variant:?}): requested {requested}")]
    InsufficientStock {
        product_id: String,
        variant: Option<String>,
        requested: u32,
    },

    #[error("no stock counter for {product_id} (variant {variant:?})")]
    NotFound {
        product_id: String,
        variant: Option<String>,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[async_trait]
pub trait InventoryStore: Send + Sync {
    /// Atomically subtract `quantity` from the matching counter and return
    /// what remains. Never drives stock negative.
    async fn decrement(
        &self,
        product_id: &str,
        variant: Option<&str>,
        quantity: u32,
    ) -> Result<u32, InventoryError>;
}

#[derive(Debug, Error)]
pub enum CouponStoreError {
    #[error("coupon {0} not found")]
    NotFound(i64),

    #[error("coupon {0} is at its usage limit")]
    LimitReached(i64),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[async_trait]
pub trait CouponStore: Send + Sync {
    /// Case-insensitive lookup.
    async fn find_by_code(&self, code: &str) -> Result<Option<Coupon>, StoreError>;

    /// Atomically add one redemption, refusing to pass `usage_limit`.
    async fn increment_usage(&self, coupon_id: i64) -> Result<(), CouponStoreError>;
}

#[async_trait]
pub trait Catalog: Send + Sync {
    async fn find_item(&self, product_id: &str) -> Result<Option<CatalogItem>, StoreError>;
}
