//! Shipping allocation.
//!
//! One aggregate shipping charge is spread across every line of a stock
//! intake as a single blended per-unit rate. Rounding happens once here, at
//! allocation time, so per-line multiplication cannot compound rounding error
//! across lines with different quantities.

use rust_decimal::Decimal;

use stockbook_core::round_money;

/// Blended per-unit shipping rate for a transaction.
///
/// `total_shipping / Σ quantity`, rounded to 2 decimal places; zero when the
/// total quantity is zero.
pub fn allocate(total_shipping: Decimal, quantities: &[Decimal]) -> Decimal {
    let total_quantity: Decimal = quantities.iter().copied().sum();
    if total_quantity.is_zero() {
        return Decimal::ZERO;
    }
    round_money(total_shipping / total_quantity)
}
