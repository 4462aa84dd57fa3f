//! In-memory stores for tests and local runs.
//!
//! Each store guards its whole state with one `tokio::sync::Mutex`, so
//! every operation is atomic with respect to the others on the same store.

use super::{
    Catalog, CouponStore, CouponStoreError, CreateOutcome, InventoryError, InventoryStore,
    OrderStore, ShipmentOutcome, ShipmentUpdate, StoreError,
};
use crate::entities::catalog::CatalogItem;
use crate::entities::coupons::Coupon;
use crate::entities::inventory::InventoryRecord;
use crate::entities::orders::{NewOrder, Order};
use crate::entities::{FulfillmentStatus, PaymentStatus};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Debug, Default)]
pub struct MemoryOrderStore {
    orders: Mutex<HashMap<String, Order>>,
    fail_writes: std::sync::atomic::AtomicBool,
}

impl MemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `create_if_absent` fail with
    /// [`StoreError::Unavailable`].
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes
            .store(fail, std::sync::atomic::Ordering::SeqCst);
    }

    pub async fn len(&self) -> usize {
        self.orders.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.orders.lock().await.is_empty()
    }

    pub async fn get(&self, order_number: &str) -> Option<Order> {
        self.orders.lock().await.get(order_number).cloned()
    }
}

#[async_trait]
impl OrderStore for MemoryOrderStore {
    async fn create_if_absent(&self, order: NewOrder) -> Result<CreateOutcome, StoreError> {
        if self.fail_writes.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(StoreError::Unavailable("order store offline".to_owned()));
        }
        let mut orders = self.orders.lock().await;
        match orders.get(&order.order_number) {
            Some(existing)
                if !(existing.payment_status == PaymentStatus::Failed
                    && order.payment_status == PaymentStatus::Paid) =>
            {
                Ok(CreateOutcome::AlreadyExists(existing.clone()))
            }
            _ => {
                let created = Order::from_new(
                    order,
                    Uuid::now_v7(),
                    time::OffsetDateTime::now_utc(),
                );
                orders.insert(created.order_number.clone(), created.clone());
                Ok(CreateOutcome::Created(created))
            }
        }
    }

    async fn find_by_number(&self, order_number: &str) -> Result<Option<Order>, StoreError> {
        Ok(self.get(order_number).await)
    }

    async fn set_fulfillment_status(
        &self,
        order_number: &str,
        status: FulfillmentStatus,
        partner_order_id: Option<String>,
    ) -> Result<(), StoreError> {
        let mut orders = self.orders.lock().await;
        if let Some(order) = orders
            .get_mut(order_number)
            .filter(|o| o.fulfillment_status != FulfillmentStatus::Shipped)
        {
            order.fulfillment_status = status;
            if partner_order_id.is_some() {
                order.partner_order_id = partner_order_id;
            }
        }
        Ok(())
    }

    async fn record_shipment(&self, update: ShipmentUpdate) -> Result<ShipmentOutcome, StoreError> {
        let mut orders = self.orders.lock().await;
        let Some(order) = orders
            .get_mut(&update.order_number)
            .filter(|o| o.payment_status == PaymentStatus::Paid)
        else {
            return Ok(ShipmentOutcome::NotFound);
        };
        if order.tracking_number.as_deref() == Some(update.tracking_number.as_str()) {
            return Ok(ShipmentOutcome::Unchanged(order.clone()));
        }
        order.tracking_number = Some(update.tracking_number);
        order.tracking_carrier = update.carrier;
        order.tracking_url = update.tracking_url;
        order.shipped_at = Some(
            update
                .shipped_at
                .unwrap_or_else(time::OffsetDateTime::now_utc),
        );
        order.fulfillment_status = FulfillmentStatus::Shipped;
        Ok(ShipmentOutcome::Updated(order.clone()))
    }
}

#[derive(Debug, Default)]
pub struct MemoryInventoryStore {
    records: Mutex<HashMap<String, InventoryRecord>>,
}

impl MemoryInventoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_variant_stock(self, product_id: &str, variant: &str, stock: u32) -> Self {
        let mut records = self.records.into_inner();
        records
            .entry(product_id.to_owned())
            .or_insert_with(|| InventoryRecord {
                product_id: product_id.to_owned(),
                ..Default::default()
            })
            .variant_stocks
            .insert(variant.to_owned(), stock);
        Self {
            records: Mutex::new(records),
        }
    }

    pub fn with_general_stock(self, product_id: &str, stock: u32) -> Self {
        let mut records = self.records.into_inner();
        records
            .entry(product_id.to_owned())
            .or_insert_with(|| InventoryRecord {
                product_id: product_id.to_owned(),
                ..Default::default()
            })
            .general_stock = Some(stock);
        Self {
            records: Mutex::new(records),
        }
    }

    /// Current stock for a counter, if it exists.
    pub async fn stock(&self, product_id: &str, variant: Option<&str>) -> Option<u32> {
        let records = self.records.lock().await;
        let record = records.get(product_id)?;
        match variant {
            Some(v) => record.variant_stocks.get(v).copied(),
            None => record.general_stock,
        }
    }
}

#[async_trait]
impl InventoryStore for MemoryInventoryStore {
    async fn decrement(
        &self,
        product_id: &str,
        variant: Option<&str>,
        quantity: u32,
    ) -> Result<u32, InventoryError> {
        let not_found = || InventoryError::NotFound {
            product_id: product_id.to_owned(),
            variant: variant.map(str::to_owned),
        };
        let insufficient = || InventoryError::InsufficientStock {
            product_id: product_id.to_owned(),
            variant: variant.map(str::to_owned),
            requested: quantity,
        };

        let mut records = self.records.lock().await;
        let record = records.get_mut(product_id).ok_or_else(not_found)?;
        let counter = if record.tracks_variants() {
            variant
                .and_then(|v| record.variant_stocks.get_mut(v))
                .ok_or_else(not_found)?
        } else {
            record.general_stock.as_mut().ok_or_else(not_found)?
        };
        if *counter < quantity {
            return Err(insufficient());
        }
        *counter -= quantity;
        Ok(*counter)
    }
}

#[derive(Debug, Default)]
pub struct MemoryCouponStore {
    coupons: Mutex<HashMap<i64, Coupon>>,
}

impl MemoryCouponStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_coupon(self, coupon: Coupon) -> Self {
        let mut coupons = self.coupons.into_inner();
        coupons.insert(coupon.id, coupon);
        Self {
            coupons: Mutex::new(coupons),
        }
    }

    pub async fn insert(&self, coupon: Coupon) {
        self.coupons.lock().await.insert(coupon.id, coupon);
    }

    pub async fn get(&self, coupon_id: i64) -> Option<Coupon> {
        self.coupons.lock().await.get(&coupon_id).cloned()
    }

    pub async fn remove(&self, coupon_id: i64) -> Option<Coupon> {
        self.coupons.lock().await.remove(&coupon_id)
    }
}

#[async_trait]
impl CouponStore for MemoryCouponStore {
    async fn find_by_code(&self, code: &str) -> Result<Option<Coupon>, StoreError> {
        let coupons = self.coupons.lock().await;
        Ok(coupons
            .values()
            .find(|c| c.code.eq_ignore_ascii_case(code))
            .cloned())
    }

    async fn increment_usage(&self, coupon_id: i64) -> Result<(), CouponStoreError> {
        let mut coupons = self.coupons.lock().await;
        let coupon = coupons
            .get_mut(&coupon_id)
            .ok_or(CouponStoreError::NotFound(coupon_id))?;
        if coupon
            .usage_limit
            .is_some_and(|limit| coupon.usage_count >= limit)
        {
            return Err(CouponStoreError::LimitReached(coupon_id));
        }
        coupon.usage_count += 1;
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryCatalog {
    items: HashMap<String, CatalogItem>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_item(mut self, item: CatalogItem) -> Self {
        self.items.insert(item.product_id.clone(), item);
        self
    }
}

#[async_trait]
impl Catalog for MemoryCatalog {
    async fn find_item(&self, product_id: &str) -> Result<Option<CatalogItem>, StoreError> {
        Ok(self.items.get(product_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::CouponKind;
    use compact_str::CompactString;
    use shopflow_sdk::objects::{CartLine, CustomerInfo};
    use std::sync::Arc;

    fn new_order(order_number: &str, status: PaymentStatus) -> NewOrder {
        NewOrder {
            order_number: order_number.to_owned(),
            provider_event_id: "evt_1".to_owned(),
            session_or_intent_id: "cs_1".to_owned(),
            customer_email: Some("buyer@example.com".to_owned()),
            customer: CustomerInfo::default(),
            lines: vec![CartLine {
                product_id: "A".to_owned(),
                name: "Shoe".to_owned(),
                unit_amount_cents: 5000,
                quantity: 2,
                currency: CompactString::from("usd"),
                variant: Some(CompactString::from("8")),
                sku: None,
                weight_grams: None,
            }],
            subtotal_cents: 10000,
            discount_cents: 0,
            total_cents: 10000,
            currency: CompactString::from("usd"),
            payment_status: status,
            shipping_address: None,
            coupon_id: None,
        }
    }

    #[tokio::test]
    async fn create_if_absent_is_idempotent() {
        let store = MemoryOrderStore::new();
        let first = store
            .create_if_absent(new_order("SF-1", PaymentStatus::Paid))
            .await
            .unwrap();
        assert!(matches!(first, CreateOutcome::Created(_)));
        let second = store
            .create_if_absent(new_order("SF-1", PaymentStatus::Paid))
            .await
            .unwrap();
        assert!(matches!(second, CreateOutcome::AlreadyExists(_)));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn paid_write_supersedes_failure_record() {
        let store = MemoryOrderStore::new();
        store
            .create_if_absent(new_order("SF-2", PaymentStatus::Failed))
            .await
            .unwrap();
        let outcome = store
            .create_if_absent(new_order("SF-2", PaymentStatus::Paid))
            .await
            .unwrap();
        assert!(matches!(outcome, CreateOutcome::Created(ref o) if o.payment_status == PaymentStatus::Paid));

        // A later failure never downgrades a paid order.
        let outcome = store
            .create_if_absent(new_order("SF-2", PaymentStatus::Failed))
            .await
            .unwrap();
        assert!(matches!(outcome, CreateOutcome::AlreadyExists(ref o) if o.payment_status == PaymentStatus::Paid));
    }

    #[tokio::test]
    async fn concurrent_creates_yield_one_winner() {
        let store = Arc::new(MemoryOrderStore::new());
        let mut handles = Vec::new();
        for _ in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .create_if_absent(new_order("SF-3", PaymentStatus::Paid))
                    .await
                    .unwrap()
            }));
        }
        let mut created = 0;
        for handle in handles {
            if matches!(handle.await.unwrap(), CreateOutcome::Created(_)) {
                created += 1;
            }
        }
        assert_eq!(created, 1);
    }

    #[tokio::test]
    async fn variant_stock_never_goes_negative() {
        let store = MemoryInventoryStore::new().with_variant_stock("A", "8", 1);
        assert_eq!(store.decrement("A", Some("8"), 1).await.unwrap(), 0);
        let err = store.decrement("A", Some("8"), 1).await.unwrap_err();
        assert!(matches!(err, InventoryError::InsufficientStock { requested: 1, .. }));
        assert_eq!(store.stock("A", Some("8")).await, Some(0));
    }

    #[tokio::test]
    async fn concurrent_variant_decrements_sell_the_last_unit_once() {
        let store = Arc::new(MemoryInventoryStore::new().with_variant_stock("A", "8", 1));
        let mut handles = Vec::new();
        for _ in 0..2 {
            let store = store.clone();
            handles.push(tokio::spawn(
                async move { store.decrement("A", Some("8"), 1).await },
            ));
        }
        let mut ok = 0;
        let mut insufficient = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(remaining) => {
                    assert_eq!(remaining, 0);
                    ok += 1;
                }
                Err(InventoryError::InsufficientStock { .. }) => insufficient += 1,
                Err(other) => panic!("unexpected error: {other}"),
            }
        }
        assert_eq!(ok, 1);
        assert_eq!(insufficient, 1);
        assert_eq!(store.stock("A", Some("8")).await, Some(0));
    }

    #[tokio::test]
    async fn unknown_counters_are_not_found() {
        let store = MemoryInventoryStore::new()
            .with_variant_stock("A", "8", 3)
            .with_general_stock("B", 2);
        assert!(matches!(
            store.decrement("A", Some("9"), 1).await,
            Err(InventoryError::NotFound { .. })
        ));
        assert!(matches!(
            store.decrement("A", None, 1).await,
            Err(InventoryError::NotFound { .. })
        ));
        assert!(matches!(
            store.decrement("C", None, 1).await,
            Err(InventoryError::NotFound { .. })
        ));
        assert_eq!(store.decrement("B", None, 2).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn concurrent_decrements_respect_stock() {
        let store = Arc::new(MemoryInventoryStore::new().with_general_stock("B", 5));
        let mut handles = Vec::new();
        for _ in 0..20 {
            let store = store.clone();
            handles.push(tokio::spawn(async move { store.decrement("B", None, 1).await }));
        }
        let mut ok = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                ok += 1;
            }
        }
        assert_eq!(ok, 5);
        assert_eq!(store.stock("B", None).await, Some(0));
    }

    #[tokio::test]
    async fn coupon_increment_stops_at_limit() {
        let store = MemoryCouponStore::new().with_coupon(Coupon {
            id: 7,
            code: "SAVE10".to_owned(),
            kind: CouponKind::Percentage,
            value: 10,
            min_purchase_cents: None,
            max_discount_cents: None,
            usage_limit: Some(1),
            usage_count: 0,
            active: true,
            expires_at: None,
        });
        assert!(store.find_by_code("save10").await.unwrap().is_some());
        store.increment_usage(7).await.unwrap();
        assert!(matches!(
            store.increment_usage(7).await,
            Err(CouponStoreError::LimitReached(7))
        ));
        assert!(matches!(
            store.increment_usage(8).await,
            Err(CouponStoreError::NotFound(8))
        ));
        assert_eq!(store.get(7).await.unwrap().usage_count, 1);
    }

    #[tokio::test]
    async fn shipment_is_recorded_once() {
        let store = MemoryOrderStore::new();
        store
            .create_if_absent(new_order("SF-4", PaymentStatus::Paid))
            .await
            .unwrap();
        let update = ShipmentUpdate {
            order_number: "SF-4".to_owned(),
            tracking_number: "1Z999".to_owned(),
            carrier: Some("ups".to_owned()),
            tracking_url: None,
            shipped_at: None,
        };
        assert!(matches!(
            store.record_shipment(update.clone()).await.unwrap(),
            ShipmentOutcome::Updated(ref o) if o.fulfillment_status == FulfillmentStatus::Shipped
        ));
        assert!(matches!(
            store.record_shipment(update).await.unwrap(),
            ShipmentOutcome::Unchanged(_)
        ));

        // Shipped orders keep their status.
        store
            .set_fulfillment_status("SF-4", FulfillmentStatus::PartnerFailed, None)
            .await
            .unwrap();
        assert_eq!(
            store.get("SF-4").await.unwrap().fulfillment_status,
            FulfillmentStatus::Shipped
        );
    }
}
