use crate::entities::{FulfillmentStatus, PaymentStatus};
use crate::framework::DatabaseProcessor;
use compact_str::CompactString;
use kanau::processor::Processor;
use shopflow_sdk::objects::{Address, CartLine, CustomerInfo};
use sqlx::types::Json;
use uuid::Uuid;

/// Everything needed to persist an order, reconstructed from a verified
/// processor event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub order_number: String,
    pub provider_event_id: String,
    pub session_or_intent_id: String,
    pub customer_email: Option<String>,
    pub customer: CustomerInfo,
    pub lines: Vec<CartLine>,
    pub subtotal_cents: i64,
    pub discount_cents: i64,
    pub total_cents: i64,
    pub currency: CompactString,
    pub payment_status: PaymentStatus,
    pub shipping_address: Option<Address>,
    pub coupon_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub id: Uuid,
    pub order_number: String,
    pub provider_event_id: String,
    pub session_or_intent_id: String,
    pub customer_email: Option<String>,
    pub customer: CustomerInfo,
    pub lines: Vec<CartLine>,
    pub subtotal_cents: i64,
    pub discount_cents: i64,
    pub total_cents: i64,
    pub currency: CompactString,
    pub payment_status: PaymentStatus,
    pub shipping_address: Option<Address>,
    pub coupon_id: Option<i64>,
    pub created_at: time::OffsetDateTime,
    pub fulfillment_status: FulfillmentStatus,
    pub partner_order_id: Option<String>,
    pub tracking_number: Option<String>,
    pub tracking_carrier: Option<String>,
    pub tracking_url: Option<String>,
    pub shipped_at: Option<time::OffsetDateTime>,
}

impl Order {
    /// Materialize a freshly inserted order. Used by stores that do not
    /// round-trip through SQL.
    pub fn from_new(new: NewOrder, id: Uuid, created_at: time::OffsetDateTime) -> Self {
        Self {
            id,
            order_number: new.order_number,
            provider_event_id: new.provider_event_id,
            session_or_intent_id: new.session_or_intent_id,
            customer_email: new.customer_email,
            customer: new.customer,
            lines: new.lines,
            subtotal_cents: new.subtotal_cents,
            discount_cents: new.discount_cents,
            total_cents: new.total_cents,
            currency: new.currency,
            payment_status: new.payment_status,
            shipping_address: new.shipping_address,
            coupon_id: new.coupon_id,
            created_at,
            fulfillment_status: FulfillmentStatus::Unfulfilled,
            partner_order_id: None,
            tracking_number: None,
            tracking_carrier: None,
            tracking_url: None,
            shipped_at: None,
        }
    }

    /// Whether `new` describes the same purchase as this record.
    ///
    /// Two deliveries for one order (session and intent events, or plain
    /// redelivery) carry identical cart snapshots; a mismatch means two
    /// different carts drew the same order number.
    pub fn same_purchase(&self, new: &NewOrder) -> bool {
        self.lines == new.lines
            && self.subtotal_cents == new.subtotal_cents
            && self.discount_cents == new.discount_cents
            && self.currency == new.currency
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    order_number: String,
    provider_event_id: String,
    session_or_intent_id: String,
    customer_email: Option<String>,
    customer_info: Json<CustomerInfo>,
    lines: Json<Vec<CartLine>>,
    subtotal_cents: i64,
    discount_cents: i64,
    total_cents: i64,
    currency: String,
    payment_status: PaymentStatus,
    shipping_address: Option<Json<Address>>,
    coupon_id: Option<i64>,
    created_at: time::OffsetDateTime,
    fulfillment_status: FulfillmentStatus,
    partner_order_id: Option<String>,
    tracking_number: Option<String>,
    tracking_carrier: Option<String>,
    tracking_url: Option<String>,
    shipped_at: Option<time::OffsetDateTime>,
}

impl From<OrderRow> for Order {
    fn from(row: OrderRow) -> Self {
        Self {
            id: row.id,
            order_number: row.order_number,
            provider_event_id: row.provider_event_id,
            session_or_intent_id: row.session_or_intent_id,
            customer_email: row.customer_email,
            customer: row.customer_info.0,
            lines: row.lines.0,
            subtotal_cents: row.subtotal_cents,
            discount_cents: row.discount_cents,
            total_cents: row.total_cents,
            currency: CompactString::from(row.currency),
            payment_status: row.payment_status,
            shipping_address: row.shipping_address.map(|a| a.0),
            coupon_id: row.coupon_id,
            created_at: row.created_at,
            fulfillment_status: row.fulfillment_status,
            partner_order_id: row.partner_order_id,
            tracking_number: row.tracking_number,
            tracking_carrier: row.tracking_carrier,
            tracking_url: row.tracking_url,
            shipped_at: row.shipped_at,
        }
    }
}

const ORDER_COLUMNS: &str = r#"
    id,
    order_number,
    provider_event_id,
    session_or_intent_id,
    customer_email,
    customer_info,
    lines,
    subtotal_cents,
    discount_cents,
    total_cents,
    currency,
    payment_status,
    shipping_address,
    coupon_id,
    created_at,
    fulfillment_status,
    partner_order_id,
    tracking_number,
    tracking_carrier,
    tracking_url,
    shipped_at
"#;

#[derive(Debug, Clone)]
/// The idempotency gate.
///
/// Inserts the order unless one with the same `order_number` exists, in a
/// single statement guarded by the unique key. A `failed` record is the
/// one exception: a `paid` write replaces it, because the failure record
/// never triggered side effects.
///
/// Returns the stored row when this call created (or promoted) it, and
/// `None` when another delivery got there first.
pub struct InsertOrderIfAbsent {
    pub order: NewOrder,
}

impl Processor<InsertOrderIfAbsent> for DatabaseProcessor {
    type Output = Option<Order>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:InsertOrderIfAbsent")]
    async fn process(&self, cmd: InsertOrderIfAbsent) -> Result<Option<Order>, sqlx::Error> {
        let order = cmd.order;
        let sql = format!(
            r#"
            INSERT INTO orders (
                id, order_number, provider_event_id, session_or_intent_id,
                customer_email, customer_info, lines,
                subtotal_cents, discount_cents, total_cents, currency,
                payment_status, shipping_address, coupon_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            ON CONFLICT (order_number) DO UPDATE SET
                provider_event_id = EXCLUDED.provider_event_id,
                session_or_intent_id = EXCLUDED.session_or_intent_id,
                customer_email = EXCLUDED.customer_email,
                customer_info = EXCLUDED.customer_info,
                lines = EXCLUDED.lines,
                subtotal_cents = EXCLUDED.subtotal_cents,
                discount_cents = EXCLUDED.discount_cents,
                total_cents = EXCLUDED.total_cents,
                currency = EXCLUDED.currency,
                payment_status = EXCLUDED.payment_status,
                shipping_address = EXCLUDED.shipping_address,
                coupon_id = EXCLUDED.coupon_id,
                created_at = now()
            WHERE orders.payment_status = 'failed'
              AND EXCLUDED.payment_status = 'paid'
            RETURNING {ORDER_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(Uuid::now_v7())
            .bind(&order.order_number)
            .bind(&order.provider_event_id)
            .bind(&order.session_or_intent_id)
            .bind(&order.customer_email)
            .bind(Json(&order.customer))
            .bind(Json(&order.lines))
            .bind(order.subtotal_cents)
            .bind(order.discount_cents)
            .bind(order.total_cents)
            .bind(order.currency.as_str())
            .bind(order.payment_status)
            .bind(order.shipping_address.as_ref().map(Json))
            .bind(order.coupon_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Into::into))
    }
}

#[derive(Debug, Clone)]
pub struct GetOrderByNumber {
    pub order_number: String,
}

impl Processor<GetOrderByNumber> for DatabaseProcessor {
    type Output = Option<Order>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetOrderByNumber")]
    async fn process(&self, query: GetOrderByNumber) -> Result<Option<Order>, sqlx::Error> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE order_number = $1");
        let row = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(&query.order_number)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Into::into))
    }
}

#[derive(Debug, Clone)]
/// Record the outcome of a partner submission.
///
/// Shipped orders are never moved back. Returns rows updated.
pub struct UpdateFulfillmentStatus {
    pub order_number: String,
    pub status: FulfillmentStatus,
    pub partner_order_id: Option<String>,
}

impl Processor<UpdateFulfillmentStatus> for DatabaseProcessor {
    type Output = u64;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:UpdateFulfillmentStatus")]
    async fn process(&self, cmd: UpdateFulfillmentStatus) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE orders
            SET fulfillment_status = $2,
                partner_order_id = COALESCE($3, partner_order_id)
            WHERE order_number = $1
              AND fulfillment_status <> 'shipped'
            "#,
        )
        .bind(&cmd.order_number)
        .bind(cmd.status)
        .bind(&cmd.partner_order_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}

#[derive(Debug, Clone)]
/// Attach tracking details to a paid order and mark it shipped.
///
/// Returns the updated row, or `None` if the order is unknown, unpaid, or
/// already carries this tracking number.
pub struct RecordShipment {
    pub order_number: String,
    pub tracking_number: String,
    pub carrier: Option<String>,
    pub tracking_url: Option<String>,
    pub shipped_at: Option<time::OffsetDateTime>,
}

impl Processor<RecordShipment> for DatabaseProcessor {
    type Output = Option<Order>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:RecordShipment")]
    async fn process(&self, cmd: RecordShipment) -> Result<Option<Order>, sqlx::Error> {
        let sql = format!(
            r#"
            UPDATE orders
            SET tracking_number = $2,
                tracking_carrier = $3,
                tracking_url = $4,
                shipped_at = COALESCE($5, now()),
                fulfillment_status = 'shipped'
            WHERE order_number = $1
              AND payment_status = 'paid'
              AND tracking_number IS DISTINCT FROM $2
            RETURNING {ORDER_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(&cmd.order_number)
            .bind(&cmd.tracking_number)
            .bind(&cmd.carrier)
            .bind(&cmd.tracking_url)
            .bind(cmd.shipped_at)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Into::into))
    }
}
