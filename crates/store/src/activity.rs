//! Activity log projection.
//!
//! A read-only view over committed transactions for audit display. Derived on
//! demand; never stored, never part of the write path.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stockbook_core::{BuyerId, TransactionId};
use stockbook_ledger::{Transaction, TransactionKind, balance_delta};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityLogEntry {
    pub transaction_id: TransactionId,
    pub kind: TransactionKind,
    pub buyer_id: Option<BuyerId>,
    /// Signed effect on the buyer balance (zero for pure stock intakes).
    pub amount: Decimal,
    /// Headline aggregate: sale value for trades, cost for intakes.
    pub total: Option<Decimal>,
    pub profit: Option<Decimal>,
    pub created_at: DateTime<Utc>,
    pub edited: bool,
    pub edit_count: usize,
}

/// Filters for the activity listing; all optional, all conjunctive.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActivityFilter {
    pub kind: Option<TransactionKind>,
    pub buyer_id: Option<BuyerId>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl ActivityFilter {
    fn matches(&self, transaction: &Transaction) -> bool {
        if let Some(kind) = self.kind {
            if transaction.kind() != kind {
                return false;
            }
        }
        if let Some(buyer_id) = self.buyer_id {
            if transaction.buyer_id() != Some(buyer_id) {
                return false;
            }
        }
        if let Some(from) = self.from {
            if transaction.created_at < from {
                return false;
            }
        }
        if let Some(to) = self.to {
            if transaction.created_at > to {
                return false;
            }
        }
        true
    }
}

/// Project transactions into activity entries, newest first.
pub fn project(transactions: &[Transaction], filter: &ActivityFilter) -> Vec<ActivityLogEntry> {
    let mut entries: Vec<ActivityLogEntry> = transactions
        .iter()
        .filter(|txn| filter.matches(txn))
        .map(|txn| ActivityLogEntry {
            transaction_id: txn.id,
            kind: txn.kind(),
            buyer_id: txn.buyer_id(),
            amount: balance_delta(&txn.body),
            total: txn.body.sale_price().or_else(|| txn.body.price()),
            profit: txn.body.profit(),
            created_at: txn.created_at,
            edited: txn.edited,
            edit_count: txn.prev_values.len(),
        })
        .collect();
    entries.reverse();
    entries
}
