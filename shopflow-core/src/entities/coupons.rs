use crate::entities::CouponKind;
use crate::framework::DatabaseProcessor;
use kanau::processor::Processor;

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Coupon {
    pub id: i64,
    pub code: String,
    pub kind: CouponKind,
    /// Whole percent for `Percentage`, cents for `Fixed`.
    pub value: i64,
    pub min_purchase_cents: Option<i64>,
    pub max_discount_cents: Option<i64>,
    pub usage_limit: Option<i64>,
    pub usage_count: i64,
    pub active: bool,
    pub expires_at: Option<time::OffsetDateTime>,
}

const COUPON_COLUMNS: &str = r#"
    id,
    code,
    kind,
    value,
    min_purchase_cents,
    max_discount_cents,
    usage_limit,
    usage_count,
    active,
    expires_at
"#;

#[derive(Debug, Clone)]
/// Look up a coupon by its code, ignoring case.
pub struct GetCouponByCode {
    pub code: String,
}

impl Processor<GetCouponByCode> for DatabaseProcessor {
    type Output = Option<Coupon>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetCouponByCode")]
    async fn process(&self, query: GetCouponByCode) -> Result<Option<Coupon>, sqlx::Error> {
        let sql = format!("SELECT {COUPON_COLUMNS} FROM coupons WHERE lower(code) = lower($1)");
        let coupon = sqlx::query_as::<_, Coupon>(&sql)
            .bind(query.code.trim())
            .fetch_optional(&self.pool)
            .await?;
        Ok(coupon)
    }
}

#[derive(Debug, Clone)]
pub struct GetCouponById {
    pub coupon_id: i64,
}

impl Processor<GetCouponById> for DatabaseProcessor {
    type Output = Option<Coupon>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetCouponById")]
    async fn process(&self, query: GetCouponById) -> Result<Option<Coupon>, sqlx::Error> {
        let sql = format!("SELECT {COUPON_COLUMNS} FROM coupons WHERE id = $1");
        let coupon = sqlx::query_as::<_, Coupon>(&sql)
            .bind(query.coupon_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(coupon)
    }
}

#[derive(Debug, Clone)]
/// Atomically add one redemption to a coupon.
///
/// The guard in the `WHERE` clause keeps `usage_count <= usage_limit`
/// under concurrent redemptions. Returns the number of rows updated
/// (0 when the coupon is missing or already at its limit).
pub struct IncrementCouponUsage {
    pub coupon_id: i64,
}

impl Processor<IncrementCouponUsage> for DatabaseProcessor {
    type Output = u64;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:IncrementCouponUsage")]
    async fn process(&self, cmd: IncrementCouponUsage) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE coupons
            SET usage_count = usage_count + 1
            WHERE id = $1
              AND (usage_limit IS NULL OR usage_count < usage_limit)
            "#,
        )
        .bind(cmd.coupon_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}
