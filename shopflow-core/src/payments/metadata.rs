//! The order snapshot carried in processor session metadata.
//!
//! The processor caps metadata at 50 keys with values of at most 500
//! characters, so the cart and customer JSON are split into numbered
//! chunks (`cart_0`, `cart_1`, ... with the count in `cart_chunks`).

use compact_str::CompactString;
use shopflow_sdk::objects::{CartLine, CustomerInfo};
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

pub const MAX_VALUE_CHARS: usize = 500;
pub const MAX_KEYS: usize = 50;

const ORDER_NUMBER: &str = "order_number";
const COUPON_ID: &str = "coupon_id";
const SUBTOTAL: &str = "subtotal_cents";
const DISCOUNT: &str = "discount_cents";
const CURRENCY: &str = "currency";
const CART: &str = "cart";
const CUSTOMER: &str = "customer";

#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("metadata field `{0}` is missing")]
    Missing(&'static str),

    #[error("metadata field `{field}` is malformed: {reason}")]
    Malformed { field: &'static str, reason: String },

    #[error("order snapshot needs {0} metadata keys, more than the processor allows")]
    TooLarge(usize),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Everything the webhook needs to rebuild an order without reading the
/// database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderMetadata {
    pub order_number: String,
    pub lines: Vec<CartLine>,
    pub customer: Option<CustomerInfo>,
    pub coupon_id: Option<i64>,
    pub subtotal_cents: i64,
    pub discount_cents: i64,
    pub currency: CompactString,
}

impl OrderMetadata {
    pub fn total_cents(&self) -> i64 {
        (self.subtotal_cents - self.discount_cents).max(0)
    }

    pub fn encode(&self) -> Result<BTreeMap<String, String>, MetadataError> {
        let mut map = BTreeMap::new();
        map.insert(ORDER_NUMBER.to_owned(), self.order_number.clone());
        map.insert(SUBTOTAL.to_owned(), self.subtotal_cents.to_string());
        map.insert(DISCOUNT.to_owned(), self.discount_cents.to_string());
        map.insert(CURRENCY.to_owned(), self.currency.to_string());
        if let Some(coupon_id) = self.coupon_id {
            map.insert(COUPON_ID.to_owned(), coupon_id.to_string());
        }
        insert_chunked(&mut map, CART, &serde_json::to_string(&self.lines)?);
        if let Some(customer) = &self.customer {
            insert_chunked(&mut map, CUSTOMER, &serde_json::to_string(customer)?);
        }
        if map.len() > MAX_KEYS {
            return Err(MetadataError::TooLarge(map.len()));
        }
        Ok(map)
    }

    /// Rebuild the snapshot. `Ok(None)` means the metadata carries no order
    /// at all, which is how sessions created elsewhere look.
    pub fn decode(metadata: &HashMap<String, String>) -> Result<Option<Self>, MetadataError> {
        let Some(order_number) = metadata.get(ORDER_NUMBER).filter(|n| !n.is_empty()) else {
            return Ok(None);
        };

        let lines: Vec<CartLine> = serde_json::from_str(&join_chunks(metadata, CART)?.ok_or(
            MetadataError::Missing("cart_chunks"),
        )?)
        .map_err(|e| MetadataError::Malformed {
            field: CART,
            reason: e.to_string(),
        })?;
        let customer = join_chunks(metadata, CUSTOMER)?
            .map(|json| serde_json::from_str::<CustomerInfo>(&json))
            .transpose()
            .map_err(|e| MetadataError::Malformed {
                field: CUSTOMER,
                reason: e.to_string(),
            })?;
        let coupon_id = metadata
            .get(COUPON_ID)
            .filter(|v| !v.is_empty())
            .map(|v| parse_int(COUPON_ID, v))
            .transpose()?;
        let subtotal_cents = parse_int(
            SUBTOTAL,
            metadata.get(SUBTOTAL).ok_or(MetadataError::Missing(SUBTOTAL))?,
        )?;
        let discount_cents = metadata
            .get(DISCOUNT)
            .map(|v| parse_int(DISCOUNT, v))
            .transpose()?
            .unwrap_or(0);
        let currency = metadata
            .get(CURRENCY)
            .ok_or(MetadataError::Missing(CURRENCY))?;

        if subtotal_cents < 0 || discount_cents < 0 {
            return Err(MetadataError::Malformed {
                field: SUBTOTAL,
                reason: "negative amount".to_owned(),
            });
        }

        Ok(Some(Self {
            order_number: order_number.clone(),
            lines,
            customer,
            coupon_id,
            subtotal_cents,
            discount_cents,
            currency: CompactString::from(currency.as_str()),
        }))
    }
}

fn parse_int(field: &'static str, value: &str) -> Result<i64, MetadataError> {
    value.parse().map_err(|e: std::num::ParseIntError| MetadataError::Malformed {
        field,
        reason: e.to_string(),
    })
}

fn insert_chunked(map: &mut BTreeMap<String, String>, prefix: &str, value: &str) {
    let chunks = split_chars(value, MAX_VALUE_CHARS);
    map.insert(format!("{prefix}_chunks"), chunks.len().to_string());
    for (i, chunk) in chunks.into_iter().enumerate() {
        map.insert(format!("{prefix}_{i}"), chunk);
    }
}

fn join_chunks(
    metadata: &HashMap<String, String>,
    prefix: &'static str,
) -> Result<Option<String>, MetadataError> {
    let Some(count) = metadata.get(&format!("{prefix}_chunks")) else {
        return Ok(None);
    };
    let count: usize = count.parse().map_err(|_| MetadataError::Malformed {
        field: prefix,
        reason: format!("bad chunk count {count:?}"),
    })?;
    if count > MAX_KEYS {
        return Err(MetadataError::Malformed {
            field: prefix,
            reason: format!("chunk count {count} out of range"),
        });
    }
    let mut joined = String::new();
    for i in 0..count {
        let chunk = metadata
            .get(&format!("{prefix}_{i}"))
            .ok_or_else(|| MetadataError::Malformed {
                field: prefix,
                reason: format!("chunk {i} of {count} missing"),
            })?;
        joined.push_str(chunk);
    }
    Ok(Some(joined))
}

/// Split on character boundaries into pieces of at most `max` characters.
fn split_chars(value: &str, max: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut count = 0;
    for c in value.chars() {
        if count == max {
            chunks.push(std::mem::take(&mut current));
            count = 0;
        }
        current.push(c);
        count += 1;
    }
    if !current.is_empty() || chunks.is_empty() {
        chunks.push(current);
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use shopflow_sdk::objects::Address;

    fn line(product_id: &str, name: &str) -> CartLine {
        CartLine {
            product_id: product_id.to_owned(),
            name: name.to_owned(),
            unit_amount_cents: 5000,
            quantity: 2,
            currency: CompactString::from("usd"),
            variant: Some(CompactString::from("8")),
            sku: Some(format!("SKU-{product_id}")),
            weight_grams: Some(450),
        }
    }

    fn snapshot(lines: Vec<CartLine>) -> OrderMetadata {
        OrderMetadata {
            order_number: "SF-20260301-12345678".to_owned(),
            lines,
            customer: Some(CustomerInfo {
                email: Some("buyer@example.com".to_owned()),
                name: Some("Ada".to_owned()),
                phone: None,
                address: Some(Address {
                    line1: Some("1 Main St".to_owned()),
                    ..Default::default()
                }),
            }),
            coupon_id: Some(7),
            subtotal_cents: 10_000,
            discount_cents: 500,
            currency: CompactString::from("usd"),
        }
    }

    fn to_hash(map: BTreeMap<String, String>) -> HashMap<String, String> {
        map.into_iter().collect()
    }

    #[test]
    fn large_cart_is_chunked_within_limits() {
        let lines = (0..12)
            .map(|i| line(&format!("product-{i}"), "A rather long product name ü"))
            .collect();
        let meta = snapshot(lines);
        let encoded = meta.encode().unwrap();
        let chunks: usize = encoded["cart_chunks"].parse().unwrap();
        assert!(chunks > 1);
        assert!(encoded.values().all(|v| v.chars().count() <= MAX_VALUE_CHARS));
        assert_eq!(OrderMetadata::decode(&to_hash(encoded)).unwrap(), Some(meta));
    }

    #[test]
    fn oversized_cart_is_refused() {
        let lines = (0..400).map(|i| line(&format!("p{i}"), "Item")).collect();
        assert!(matches!(
            snapshot(lines).encode(),
            Err(MetadataError::TooLarge(_))
        ));
    }

    #[test]
    fn missing_order_number_means_no_order() {
        let mut meta = HashMap::new();
        meta.insert("campaign".to_owned(), "spring".to_owned());
        assert_eq!(OrderMetadata::decode(&meta).unwrap(), None);
    }

    #[test]
    fn missing_chunk_is_malformed() {
        let mut encoded = to_hash(snapshot(vec![line("A", "Shoe")]).encode().unwrap());
        encoded.remove("cart_0");
        assert!(matches!(
            OrderMetadata::decode(&encoded),
            Err(MetadataError::Malformed { field: "cart", .. })
        ));
    }

    #[test]
    fn split_respects_char_boundaries() {
        let chunks = split_chars("ééééé", 2);
        assert_eq!(chunks, vec!["éé", "éé", "é"]);
        assert_eq!(split_chars("", 10), vec![""]);
    }
}
