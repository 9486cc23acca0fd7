//! Order number allocation
//!
//! Format: `ORD-YYYYMMDD-NNNN`, sequence per UTC calendar day, zero-padded to
//! four digits and widening past 9999. The next number is derived from the
//! numerically highest existing number for the day; the unique constraint on
//! `order_number` is what actually guarantees uniqueness under concurrency.

use std::cmp::Ordering;

use chrono::NaiveDate;

/// Prefix shared by all order numbers
pub const ORDER_NUMBER_PREFIX: &str = "ORD";

/// Minimum width of the sequence part
const SEQUENCE_WIDTH: usize = 4;

/// Day prefix, e.g. `ORD-20261017-`
pub fn day_prefix(date: NaiveDate) -> String {
    format!("{ORDER_NUMBER_PREFIX}-{}-", date.format("%Y%m%d"))
}

pub fn format_order_number(date: NaiveDate, sequence: u64) -> String {
    format!("{}{sequence:0width$}", day_prefix(date), width = SEQUENCE_WIDTH)
}

/// Sequence part of an order number for the given day, if it belongs to it
pub fn parse_sequence(order_number: &str, date: NaiveDate) -> Option<u64> {
    let suffix = order_number.strip_prefix(&day_prefix(date))?;
    if suffix.is_empty() || !suffix.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    suffix.parse().ok()
}

/// Next order number for the day given the current highest one
pub fn next_order_number(date: NaiveDate, latest: Option<&str>) -> String {
    let next = latest
        .and_then(|n| parse_sequence(n, date))
        .map_or(1, |seq| seq + 1);
    format_order_number(date, next)
}

/// Numeric ordering of same-day order numbers: longer suffix first, then lexicographic
pub fn compare_order_numbers(a: &str, b: &str) -> Ordering {
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 17).unwrap()
    }

    #[test]
    fn test_first_number_of_day() {
        assert_eq!(next_order_number(day(), None), "ORD-20261017-0001");
    }

    #[test]
    fn test_increments_latest() {
        assert_eq!(
            next_order_number(day(), Some("ORD-20261017-0041")),
            "ORD-20261017-0042"
        );
    }

    #[test]
    fn test_widens_past_9999() {
        assert_eq!(
            next_order_number(day(), Some("ORD-20261017-9999")),
            "ORD-20261017-10000"
        );
        assert_eq!(parse_sequence("ORD-20261017-10000", day()), Some(10000));
    }

    #[test]
    fn test_other_day_restarts() {
        assert_eq!(
            next_order_number(day(), Some("ORD-20261016-0077")),
            "ORD-20261017-0001"
        );
    }

    #[test]
    fn test_rejects_malformed_suffix() {
        assert_eq!(parse_sequence("ORD-20261017-", day()), None);
        assert_eq!(parse_sequence("ORD-20261017-12a4", day()), None);
        assert_eq!(parse_sequence("ORD-20261017-+123", day()), None);
    }

    #[test]
    fn test_numeric_ordering() {
        let mut numbers = vec![
            "ORD-20261017-10000",
            "ORD-20261017-9999",
            "ORD-20261017-0002",
        ];
        numbers.sort_by(|a, b| compare_order_numbers(a, b));
        assert_eq!(
            numbers,
            vec!["ORD-20261017-0002", "ORD-20261017-9999", "ORD-20261017-10000"]
        );
    }
}
