use crate::framework::DatabaseProcessor;
use kanau::processor::Processor;
use std::collections::BTreeMap;

/// Stock counters for one product.
///
/// Exactly one of `variant_stocks` (non-empty) or `general_stock` is
/// authoritative, fixed when the catalog entry is created.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InventoryRecord {
    pub product_id: String,
    pub variant_stocks: BTreeMap<String, u32>,
    pub general_stock: Option<u32>,
}

impl InventoryRecord {
    pub fn tracks_variants(&self) -> bool {
        !self.variant_stocks.is_empty()
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct InventoryRow {
    product_id: String,
    general_stock: Option<i32>,
    variants: Vec<String>,
    variant_stocks: Vec<i32>,
}

impl From<InventoryRow> for InventoryRecord {
    fn from(row: InventoryRow) -> Self {
        let variant_stocks = row
            .variants
            .into_iter()
            .zip(row.variant_stocks)
            .map(|(variant, stock)| (variant, u32::try_from(stock).unwrap_or(0)))
            .collect();
        Self {
            product_id: row.product_id,
            variant_stocks,
            general_stock: row.general_stock.map(|s| u32::try_from(s).unwrap_or(0)),
        }
    }
}

fn quantity_param(quantity: u32) -> i32 {
    i32::try_from(quantity).unwrap_or(i32::MAX)
}

#[derive(Debug, Clone)]
pub struct GetInventoryRecord {
    pub product_id: String,
}

impl Processor<GetInventoryRecord> for DatabaseProcessor {
    type Output = Option<InventoryRecord>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetInventoryRecord")]
    async fn process(&self, query: GetInventoryRecord) -> Result<Option<InventoryRecord>, sqlx::Error> {
        let row = sqlx::query_as::<_, InventoryRow>(
            r#"
            SELECT
                i.product_id,
                i.general_stock,
                COALESCE(ARRAY_AGG(v.variant ORDER BY v.variant) FILTER (WHERE v.variant IS NOT NULL), '{}') AS variants,
                COALESCE(ARRAY_AGG(v.stock ORDER BY v.variant) FILTER (WHERE v.variant IS NOT NULL), '{}') AS variant_stocks
            FROM inventory_items i
            LEFT JOIN inventory_variants v ON v.product_id = i.product_id
            WHERE i.product_id = $1
            GROUP BY i.product_id, i.general_stock
            "#,
        )
        .bind(&query.product_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }
}

#[derive(Debug, Clone)]
/// Compare-and-subtract on a single variant counter.
///
/// Returns the remaining stock, or `None` when the variant is unknown or
/// holds fewer than `quantity` units. Never drives stock negative.
pub struct DecrementVariantStock {
    pub product_id: String,
    pub variant: String,
    pub quantity: u32,
}

impl Processor<DecrementVariantStock> for DatabaseProcessor {
    type Output = Option<u32>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:DecrementVariantStock")]
    async fn process(&self, cmd: DecrementVariantStock) -> Result<Option<u32>, sqlx::Error> {
        let remaining: Option<i32> = sqlx::query_scalar(
            r#"
            UPDATE inventory_variants
            SET stock = stock - $3
            WHERE product_id = $1 AND variant = $2 AND stock >= $3
            RETURNING stock
            "#,
        )
        .bind(&cmd.product_id)
        .bind(&cmd.variant)
        .bind(quantity_param(cmd.quantity))
        .fetch_optional(&self.pool)
        .await?;
        Ok(remaining.map(|s| u32::try_from(s).unwrap_or(0)))
    }
}

#[derive(Debug, Clone)]
/// Compare-and-subtract on a product's general counter.
pub struct DecrementGeneralStock {
    pub product_id: String,
    pub quantity: u32,
}

impl Processor<DecrementGeneralStock> for DatabaseProcessor {
    type Output = Option<u32>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:DecrementGeneralStock")]
    async fn process(&self, cmd: DecrementGeneralStock) -> Result<Option<u32>, sqlx::Error> {
        let remaining: Option<i32> = sqlx::query_scalar(
            r#"
            UPDATE inventory_items
            SET general_stock = general_stock - $2
            WHERE product_id = $1
              AND general_stock IS NOT NULL
              AND general_stock >= $2
            RETURNING general_stock
            "#,
        )
        .bind(&cmd.product_id)
        .bind(quantity_param(cmd.quantity))
        .fetch_optional(&self.pool)
        .await?;
        Ok(remaining.map(|s| u32::try_from(s).unwrap_or(0)))
    }
}
