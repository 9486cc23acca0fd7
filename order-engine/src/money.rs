//! Money helpers
//!
//! All arithmetic stays in `Decimal`; amounts are rounded to cents only where
//! they are stored or sent to the payment provider.

use rust_decimal::prelude::*;

/// Rounding strategy for monetary values (2 decimal places, half away from zero)
const DECIMAL_PLACES: u32 = 2;

/// Largest order total accepted (currency units)
pub const MAX_ORDER_TOTAL: Decimal = Decimal::from_parts(1_000_000, 0, 0, false, 0);

/// Round to cents
#[inline]
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
}

/// Convert a currency amount to integer minor units (cents)
///
/// Returns `None` if the value does not fit in an `i64`.
pub fn to_minor_units(value: Decimal) -> Option<i64> {
    (round_money(value) * Decimal::ONE_HUNDRED).to_i64()
}
