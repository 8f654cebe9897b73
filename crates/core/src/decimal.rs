//! Shared decimal rounding policy.
//!
//! All quantities and monetary values are `rust_decimal::Decimal`; floating
//! point never appears in the domain layer. Rounding is midpoint-away-from-zero
//! throughout: quantities carry at most 5 decimal places, stored money at
//! most 2, with the finer 5-place scale reserved for per-unit money produced
//! by scaling a unit down (e.g. a per-gram price derived from a per-kg one).

use rust_decimal::{Decimal, RoundingStrategy};

/// Scale for monetary values at rest (per-unit rates, totals).
pub const MONEY_DP: u32 = 2;

/// Scale for quantities and scaled-down per-unit money.
pub const QUANTITY_DP: u32 = 5;

/// Round a monetary value to 2 decimal places.
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(MONEY_DP, RoundingStrategy::MidpointAwayFromZero)
}

/// Round a quantity (or scaled-down per-unit monetary value) to 5 decimal places.
pub fn round_quantity(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(QUANTITY_DP, RoundingStrategy::MidpointAwayFromZero)
}
