//! Monetary types.
//!
//! All amounts are integer minor units (cents). Floating point never touches
//! money; rates are `Decimal` and products are rounded per component.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

/// Amount in minor currency units (e.g. cents).
pub type Cents = i64;

/// Fractional rate such as a commission percentage (0.06 = 6%).
pub type Rate = Decimal;

/// Multiply an amount by a rate and round half-up to whole minor units.
///
/// Amounts passed here are non-negative, so away-from-zero midpoint rounding
/// is round-half-up. `None` when the product does not fit in [`Cents`].
#[must_use]
pub fn apply_rate(amount: Cents, rate: Rate) -> Option<Cents> {
    Decimal::from(amount)
        .checked_mul(rate)?
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
}

/// Format minor units as a dollar string, e.g. `1500` → `$15.00`.
#[must_use]
pub fn format_cents(amount: Cents) -> String {
    let sign = if amount < 0 { "-" } else { "" };
    let abs = amount.unsigned_abs();
    format!("{sign}${}.{:02}", abs / 100, abs % 100)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn apply_rate_rounds_half_up() {
        // 1500 * 0.029 = 43.5
        assert_eq!(apply_rate(1500, dec!(0.029)), Some(44));
        // 5000 * 0.029 = 145.0
        assert_eq!(apply_rate(5000, dec!(0.029)), Some(145));
        // 1499 * 0.029 = 43.471
        assert_eq!(apply_rate(1499, dec!(0.029)), Some(43));
    }

    #[test]
    fn apply_rate_zero_rate_is_zero() {
        assert_eq!(apply_rate(123_456, Decimal::ZERO), Some(0));
    }

    #[test]
    fn apply_rate_above_one_can_overflow() {
        assert_eq!(apply_rate(Cents::MAX, dec!(2)), None);
        assert_eq!(apply_rate(Cents::MAX, Decimal::ONE), Some(Cents::MAX));
    }

    #[test]
    fn format_cents_handles_sign_and_padding() {
        assert_eq!(format_cents(1500), "$15.00");
        assert_eq!(format_cents(5), "$0.05");
        assert_eq!(format_cents(-1250), "-$12.50");
    }
}
