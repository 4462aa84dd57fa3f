//! Integer-cent helpers. Amounts are never carried as floats.

use rust_decimal::Decimal;

/// Convert cents to a two-place decimal amount (`1234` → `12.34`).
pub fn cents_to_decimal(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}

/// Render an amount for humans, e.g. `12.34 USD`.
pub fn format_cents(cents: i64, currency: &str) -> String {
    format!("{} {}", cents_to_decimal(cents), currency.to_ascii_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_cents() {
        assert_eq!(format_cents(1234, "usd"), "12.34 USD");
        assert_eq!(format_cents(5, "eur"), "0.05 EUR");
        assert_eq!(format_cents(0, "usd"), "0.00 USD");
    }
}
