//! Fixed-scale decimal rounding for every monetary computation.
//!
//! All rounding is round-half-up (midpoint away from zero), applied to
//! `rust_decimal::Decimal` values. Binary floating point never touches money.

use rust_decimal::{Decimal, RoundingStrategy};

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

fn round_to(x: Decimal, places: u32) -> Decimal {
    x.round_dp_with_strategy(places, RoundingStrategy::MidpointAwayFromZero)
}

/// Round to a whole number.
pub fn round_integer(x: Decimal) -> Decimal {
    round_to(x, 0)
}

/// Round to 2 decimal places.
pub fn round2(x: Decimal) -> Decimal {
    round_to(x, 2)
}

/// Round to 3 decimal places. Used for values, charges and gains.
pub fn round3(x: Decimal) -> Decimal {
    round_to(x, 3)
}

/// Round to 4 decimal places. Used for unit-price differences.
pub fn round4(x: Decimal) -> Decimal {
    round_to(x, 4)
}

/// `round3(numerator * 100 / denominator)`; zero when the denominator is zero.
pub fn percent(numerator: Decimal, denominator: Decimal) -> Decimal {
    if denominator.is_zero() {
        return Decimal::ZERO;
    }
    round3(numerator * HUNDRED / denominator)
}
