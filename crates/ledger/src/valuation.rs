//! Line and transaction valuation.
//!
//! Canonical profit convention: shipping is netted into unit cost **per
//! line** — `qty × measurement × (sale_price − (unit_price + shipping))` —
//! and transaction profit is the plain sum of line profits. Aggregate
//! shipping is never subtracted a second time. The edit path recomputes
//! through these same functions, so created and edited transactions cannot
//! drift apart.

use rust_decimal::Decimal;

use crate::transaction::{TransactionItem, TransactionKind};

/// Monetary value of a single line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineValue {
    pub total: Decimal,
    /// Defined for sale/return lines only.
    pub profit: Option<Decimal>,
}

/// Value one line for the given transaction kind.
///
/// Sale/return lines are valued at sale price; stock-intake lines at
/// purchase price. Payments carry no lines and never reach here.
pub fn value_line(kind: TransactionKind, item: &TransactionItem) -> LineValue {
    let effective = item.effective_quantity();
    if kind.is_trade() {
        let total = effective * item.sale_price;
        let profit =
            effective * (item.sale_price - (item.unit_price + item.shipping_per_unit));
        LineValue {
            total,
            profit: Some(profit),
        }
    } else {
        LineValue {
            total: effective * item.unit_price,
            profit: None,
        }
    }
}

/// Transaction-level aggregates, summed from per-line values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aggregates {
    /// Quantity-weighted purchase cost.
    pub price: Decimal,
    /// Quantity-weighted sale value (zero for stock intakes).
    pub sale_price: Decimal,
    /// Sum over lines of `shipping_per_unit × quantity`. The raw quantity is
    /// used here, not the measurement-adjusted one: shipping was paid on the
    /// physical units moved, and the blended intake rate must re-sum to the
    /// original charge.
    pub total_shipping: Decimal,
    /// Sum of line profits; `None` where profit is undefined for the kind.
    pub profit: Option<Decimal>,
}

pub fn aggregate(kind: TransactionKind, items: &[TransactionItem]) -> Aggregates {
    let mut price = Decimal::ZERO;
    let mut sale_price = Decimal::ZERO;
    let mut total_shipping = Decimal::ZERO;
    let mut profit = Decimal::ZERO;

    for item in items {
        let effective = item.effective_quantity();
        price += effective * item.unit_price;
        total_shipping += item.shipping_per_unit * item.quantity;

        let value = value_line(kind, item);
        if kind.is_trade() {
            sale_price += value.total;
        }
        if let Some(p) = value.profit {
            profit += p;
        }
    }

    Aggregates {
        price,
        sale_price,
        total_shipping,
        profit: kind.is_trade().then_some(profit),
    }
}
