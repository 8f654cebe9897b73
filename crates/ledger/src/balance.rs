//! Buyer balance effects.
//!
//! Computes the signed delta a posted transaction applies to its buyer's
//! running balance (negative = the buyer owes more). The delta is committed
//! atomically with the transaction write.

use rust_decimal::Decimal;

use crate::transaction::{PaymentDirection, TransactionBody};

/// Signed balance delta for the transaction's buyer.
///
/// Zero when no buyer is attached (pure stock intakes).
pub fn balance_delta(body: &TransactionBody) -> Decimal {
    match body {
        TransactionBody::Payment(b) => match b.payment.direction {
            PaymentDirection::Received => b.payment.amount,
            PaymentDirection::Given => -b.payment.amount,
        },
        TransactionBody::Sale(b) => {
            let paid = b
                .payment
                .as_ref()
                .map(|p| p.amount)
                .unwrap_or(Decimal::ZERO);
            paid - b.totals.sale_price
        }
        TransactionBody::Return(b) => b.totals.sale_price,
        TransactionBody::Restock(b) | TransactionBody::InventoryAddition(b) => {
            // A buyer-attached intake is a sale of the newly stocked goods to
            // that buyer; without a buyer it touches stock only.
            if b.buyer_id.is_some() {
                -b.totals.price
            } else {
                Decimal::ZERO
            }
        }
    }
}
