use crate::framework::DatabaseProcessor;
use compact_str::CompactString;
use kanau::processor::Processor;

/// Server-trusted pricing and shipping data for one product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogItem {
    pub product_id: String,
    pub name: String,
    pub unit_amount_cents: i64,
    pub currency: CompactString,
    pub sku: Option<String>,
    pub weight_grams: Option<u32>,
    /// Sizes with their own stock counter. Empty for products tracked by
    /// general stock.
    pub variants: Vec<String>,
}

impl CatalogItem {
    /// A variant must be named exactly when the product tracks variants.
    pub fn accepts_variant(&self, variant: Option<&str>) -> bool {
        match variant {
            Some(v) => self.variants.iter().any(|known| known == v),
            None => self.variants.is_empty(),
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct CatalogRow {
    product_id: String,
    name: String,
    unit_amount_cents: i64,
    currency: String,
    sku: Option<String>,
    weight_grams: Option<i32>,
    variants: Vec<String>,
}

impl From<CatalogRow> for CatalogItem {
    fn from(row: CatalogRow) -> Self {
        Self {
            product_id: row.product_id,
            name: row.name,
            unit_amount_cents: row.unit_amount_cents,
            currency: CompactString::from(row.currency.to_ascii_lowercase()),
            sku: row.sku,
            weight_grams: row.weight_grams.and_then(|w| u32::try_from(w).ok()),
            variants: row.variants,
        }
    }
}

#[derive(Debug, Clone)]
/// Fetch an active catalog item together with its known variants.
pub struct GetCatalogItem {
    pub product_id: String,
}

impl Processor<GetCatalogItem> for DatabaseProcessor {
    type Output = Option<CatalogItem>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetCatalogItem")]
    async fn process(&self, query: GetCatalogItem) -> Result<Option<CatalogItem>, sqlx::Error> {
        let row = sqlx::query_as::<_, CatalogRow>(
            r#"
            SELECT
                c.product_id,
                c.name,
                c.unit_amount_cents,
                c.currency,
                c.sku,
                c.weight_grams,
                ARRAY(
                    SELECT v.variant FROM inventory_variants v
                    WHERE v.product_id = c.product_id
                    ORDER BY v.variant
                ) AS variants
            FROM catalog_items c
            WHERE c.product_id = $1 AND c.active
            "#,
        )
        .bind(&query.product_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(variants: &[&str]) -> CatalogItem {
        CatalogItem {
            product_id: "runner".to_string(),
            name: "Trail Runner".to_string(),
            unit_amount_cents: 12_000,
            currency: "usd".into(),
            sku: None,
            weight_grams: Some(900),
            variants: variants.iter().map(|v| v.to_string()).collect(),
        }
    }

    #[test]
    fn test_variant_required_for_sized_products() {
        let sized = item(&["8", "9"]);
        assert!(sized.accepts_variant(Some("8")));
        assert!(!sized.accepts_variant(Some("12")));
        assert!(!sized.accepts_variant(None));
    }

    #[test]
    fn test_variant_rejected_for_general_stock_products() {
        let plain = item(&[]);
        assert!(plain.accepts_variant(None));
        assert!(!plain.accepts_variant(Some("8")));
    }
}
