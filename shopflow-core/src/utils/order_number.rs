use rand::Rng;
use time::OffsetDateTime;

/// Number of random digits appended to every order number.
///
/// Eight digits give 10^8 suffixes per prefix and day; the order store
/// still dedupes on first write, so a collision degrades to a logged
/// duplicate rather than corrupting another order.
pub const ORDER_SUFFIX_DIGITS: usize = 8;

const SUFFIX_SPACE: u32 = 100_000_000;

/// Build `<PREFIX>-<YYYYMMDD>-<NNNNNNNN>` for the UTC date of `now`.
pub fn generate_order_number(prefix: &str, now: OffsetDateTime) -> String {
    let suffix = rand::rng().random_range(0..SUFFIX_SPACE);
    format_order_number(prefix, now, suffix)
}

fn format_order_number(prefix: &str, now: OffsetDateTime, suffix: u32) -> String {
    let date = now.to_offset(time::UtcOffset::UTC).date();
    format!(
        "{prefix}-{:04}{:02}{:02}-{suffix:0width$}",
        date.year(),
        u8::from(date.month()),
        date.day(),
        width = ORDER_SUFFIX_DIGITS,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn test_format_pads_suffix_and_date() {
        let now = datetime!(2026-03-07 23:10 UTC);
        assert_eq!(format_order_number("SF", now, 42), "SF-20260307-00000042");
    }

    #[test]
    fn test_date_is_taken_in_utc() {
        let now = datetime!(2026-03-07 23:10 -05:00);
        assert_eq!(
            format_order_number("SF", now, 1),
            "SF-20260308-00000001"
        );
    }

    #[test]
    fn test_generated_shape() {
        let now = datetime!(2026-10-16 12:00 UTC);
        for _ in 0..50 {
            let number = generate_order_number("SHOE", now);
            let parts: Vec<&str> = number.split('-').collect();
            assert_eq!(parts.len(), 3);
            assert_eq!(parts[0], "SHOE");
            assert_eq!(parts[1], "20261016");
            assert_eq!(parts[2].len(), ORDER_SUFFIX_DIGITS);
            assert!(parts[2].chars().all(|c| c.is_ascii_digit()));
        }
    }
}
