//! Postgres-backed stores.

use super::{
    Catalog, CouponStore, CouponStoreError, CreateOutcome, InventoryError, InventoryStore,
    OrderStore, ShipmentOutcome, ShipmentUpdate, StoreError,
};
use crate::entities::catalog::{CatalogItem, GetCatalogItem};
use crate::entities::coupons::{Coupon, GetCouponByCode, GetCouponById, IncrementCouponUsage};
use crate::entities::inventory::{DecrementGeneralStock, DecrementVariantStock, GetInventoryRecord};
use crate::entities::orders::{
    GetOrderByNumber, InsertOrderIfAbsent, NewOrder, Order, RecordShipment,
    UpdateFulfillmentStatus,
};
use crate::entities::{FulfillmentStatus, PaymentStatus};
use crate::framework::DatabaseProcessor;
use async_trait::async_trait;
use kanau::processor::Processor;
use sqlx::PgPool;

/// Every store trait, implemented over one connection pool.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    processor: DatabaseProcessor,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            processor: DatabaseProcessor::new(pool),
        }
    }
}

#[async_trait]
impl OrderStore for PostgresStore {
    async fn create_if_absent(&self, order: NewOrder) -> Result<CreateOutcome, StoreError> {
        let order_number = order.order_number.clone();
        if let Some(created) = self.processor.process(InsertOrderIfAbsent { order }).await? {
            return Ok(CreateOutcome::Created(created));
        }
        let existing = self
            .processor
            .process(GetOrderByNumber {
                order_number: order_number.clone(),
            })
            .await?
            .ok_or(StoreError::Inconsistent(order_number))?;
        Ok(CreateOutcome::AlreadyExists(existing))
    }

    async fn find_by_number(&self, order_number: &str) -> Result<Option<Order>, StoreError> {
        let order = self
            .processor
            .process(GetOrderByNumber {
                order_number: order_number.to_owned(),
            })
            .await?;
        Ok(order)
    }

    async fn set_fulfillment_status(
        &self,
        order_number: &str,
        status: FulfillmentStatus,
        partner_order_id: Option<String>,
    ) -> Result<(), StoreError> {
        let updated = self
            .processor
            .process(UpdateFulfillmentStatus {
                order_number: order_number.to_owned(),
                status,
                partner_order_id,
            })
            .await?;
        if updated == 0 {
            tracing::debug!(
                order_number = %order_number,
                status = %status,
                "Fulfillment status not changed (order missing or already shipped)"
            );
        }
        Ok(())
    }

    async fn record_shipment(&self, update: ShipmentUpdate) -> Result<ShipmentOutcome, StoreError> {
        let order_number = update.order_number.clone();
        let updated = self
            .processor
            .process(RecordShipment {
                order_number: update.order_number,
                tracking_number: update.tracking_number,
                carrier: update.carrier,
                tracking_url: update.tracking_url,
                shipped_at: update.shipped_at,
            })
            .await?;
        if let Some(order) = updated {
            return Ok(ShipmentOutcome::Updated(order));
        }
        let existing = self
            .processor
            .process(GetOrderByNumber { order_number })
            .await?;
        Ok(match existing {
            Some(order) if order.payment_status == PaymentStatus::Paid => {
                ShipmentOutcome::Unchanged(order)
            }
            _ => ShipmentOutcome::NotFound,
        })
    }
}

#[async_trait]
impl InventoryStore for PostgresStore {
    async fn decrement(
        &self,
        product_id: &str,
        variant: Option<&str>,
        quantity: u32,
    ) -> Result<u32, InventoryError> {
        if let Some(variant) = variant {
            let remaining = self
                .processor
                .process(DecrementVariantStock {
                    product_id: product_id.to_owned(),
                    variant: variant.to_owned(),
                    quantity,
                })
                .await
                .map_err(StoreError::from)?;
            if let Some(remaining) = remaining {
                return Ok(remaining);
            }
        }

        // The conditional update matched nothing; find out why so the
        // caller can log something a human can reconcile.
        let record = self
            .processor
            .process(GetInventoryRecord {
                product_id: product_id.to_owned(),
            })
            .await
            .map_err(StoreError::from)?;
        let not_found = || InventoryError::NotFound {
            product_id: product_id.to_owned(),
            variant: variant.map(str::to_owned),
        };
        let insufficient = || InventoryError::InsufficientStock {
            product_id: product_id.to_owned(),
            variant: variant.map(str::to_owned),
            requested: quantity,
        };

        let Some(record) = record else {
            return Err(not_found());
        };

        if record.tracks_variants() {
            return match variant {
                Some(v) if record.variant_stocks.contains_key(v) => Err(insufficient()),
                _ => Err(not_found()),
            };
        }

        if record.general_stock.is_none() {
            return Err(not_found());
        }
        let remaining = self
            .processor
            .process(DecrementGeneralStock {
                product_id: product_id.to_owned(),
                quantity,
            })
            .await
            .map_err(StoreError::from)?;
        remaining.ok_or_else(insufficient)
    }
}

#[async_trait]
impl CouponStore for PostgresStore {
    async fn find_by_code(&self, code: &str) -> Result<Option<Coupon>, StoreError> {
        let coupon = self
            .processor
            .process(GetCouponByCode {
                code: code.to_owned(),
            })
            .await?;
        Ok(coupon)
    }

    async fn increment_usage(&self, coupon_id: i64) -> Result<(), CouponStoreError> {
        let updated = self
            .processor
            .process(IncrementCouponUsage { coupon_id })
            .await
            .map_err(StoreError::from)?;
        if updated > 0 {
            return Ok(());
        }
        let exists = self
            .processor
            .process(GetCouponById { coupon_id })
            .await
            .map_err(StoreError::from)?;
        match exists {
            Some(_) => Err(CouponStoreError::LimitReached(coupon_id)),
            None => Err(CouponStoreError::NotFound(coupon_id)),
        }
    }
}

#[async_trait]
impl Catalog for PostgresStore {
    async fn find_item(&self, product_id: &str) -> Result<Option<CatalogItem>, StoreError> {
        let item = self
            .processor
            .process(GetCatalogItem {
                product_id: product_id.to_owned(),
            })
            .await?;
        Ok(item)
    }
}
