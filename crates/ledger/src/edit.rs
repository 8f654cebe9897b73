//! Edit audit trail.
//!
//! Editing a posted transaction never overwrites history: the pre-edit item
//! set and shipping total are appended to `prev_values` first, then the new
//! line set is recomputed through the same assembly path used at creation.
//! The outcome carries the stock and balance deltas between the old and new
//! state, to be committed atomically.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use stockbook_core::{BuyerId, DomainError, DomainResult, InventoryItemId};
use stockbook_inventory::InventoryItem;

use crate::balance::balance_delta;
use crate::builder::{LineInput, StockDelta, assemble_lines};
use crate::transaction::{
    EditHistoryEntry, StockTotals, TradeTotals, Transaction, TransactionBody, TransactionItem,
    TransactionKind,
};

/// Result of an edit; committed all-or-nothing like a create.
#[derive(Debug, Clone, PartialEq)]
pub struct EditOutcome {
    pub transaction: Transaction,
    pub stock_deltas: Vec<StockDelta>,
    pub balance_delta: Option<(BuyerId, Decimal)>,
}

/// Apply an edit to a posted transaction.
pub fn apply_edit(
    existing: &Transaction,
    new_lines: &[LineInput],
    new_total_shipping: Option<Decimal>,
    inventory: &HashMap<InventoryItemId, InventoryItem>,
    now: DateTime<Utc>,
) -> DomainResult<EditOutcome> {
    let kind = existing.kind();
    if kind == TransactionKind::Payment {
        return Err(DomainError::invalid_input(
            "payment transactions have no line items to edit",
        ));
    }

    let set = assemble_lines(kind, new_lines, inventory, new_total_shipping)?;

    let snapshot = EditHistoryEntry {
        updated_at: now,
        original_items: existing.items().to_vec(),
        original_total_shipping: existing.body.total_shipping(),
    };

    let old_delta = balance_delta(&existing.body);
    let body = rebuild_body(&existing.body, set.items, &set.aggregates)?;
    let new_delta = balance_delta(&body);

    let stock_deltas = stock_diff(kind, existing.items(), body.items(), &set.shipping_updates);

    let mut transaction = existing.clone();
    transaction.body = body;
    transaction.edited = true;
    transaction.prev_values.push(snapshot);
    transaction.version += 1;

    let balance = transaction
        .buyer_id()
        .map(|buyer_id| (buyer_id, new_delta - old_delta));

    tracing::debug!(
        transaction_id = %transaction.id,
        edits = transaction.prev_values.len(),
        "recomputed edited transaction"
    );

    Ok(EditOutcome {
        transaction,
        stock_deltas,
        balance_delta: balance,
    })
}

/// Replay history: the line set in effect immediately before edit `k`
/// (0-based), where `k == prev_values.len()` yields the current items.
pub fn items_before_edit(transaction: &Transaction, k: usize) -> &[TransactionItem] {
    transaction
        .prev_values
        .get(k)
        .map(|entry| entry.original_items.as_slice())
        .unwrap_or_else(|| transaction.items())
}

fn rebuild_body(
    old: &TransactionBody,
    items: Vec<TransactionItem>,
    aggregates: &crate::valuation::Aggregates,
) -> DomainResult<TransactionBody> {
    let trade = TradeTotals {
        price: aggregates.price,
        sale_price: aggregates.sale_price,
        total_shipping: aggregates.total_shipping,
        profit: aggregates.profit.unwrap_or(Decimal::ZERO),
    };
    let stock = StockTotals {
        price: aggregates.price,
        total_shipping: aggregates.total_shipping,
    };

    let body = match old {
        TransactionBody::Sale(b) => TransactionBody::Sale(crate::transaction::SaleBody {
            buyer_id: b.buyer_id,
            items,
            totals: trade,
            payment: b.payment.clone(),
        }),
        TransactionBody::Return(b) => TransactionBody::Return(crate::transaction::ReturnBody {
            buyer_id: b.buyer_id,
            original_sale_id: b.original_sale_id,
            items,
            totals: trade,
        }),
        TransactionBody::Restock(b) => TransactionBody::Restock(crate::transaction::StockBody {
            buyer_id: b.buyer_id,
            items,
            totals: stock,
        }),
        TransactionBody::InventoryAddition(b) => {
            TransactionBody::InventoryAddition(crate::transaction::StockBody {
                buyer_id: b.buyer_id,
                items,
                totals: stock,
            })
        }
        TransactionBody::Payment(_) => {
            return Err(DomainError::invalid_input(
                "payment transactions have no line items to edit",
            ));
        }
    };
    Ok(body)
}

/// Per-item stock adjustment between the old and new line sets.
///
/// Sales hold stock as negative inventory movement, so selling more means a
/// further decrement; returns and intakes move stock the other way.
fn stock_diff(
    kind: TransactionKind,
    old_items: &[TransactionItem],
    new_items: &[TransactionItem],
    shipping_updates: &[(InventoryItemId, Decimal)],
) -> Vec<StockDelta> {
    let sign = if kind == TransactionKind::Sale {
        -Decimal::ONE
    } else {
        Decimal::ONE
    };

    let mut effect: HashMap<InventoryItemId, Decimal> = HashMap::new();
    let mut order: Vec<InventoryItemId> = Vec::new();
    for line in new_items {
        if !effect.contains_key(&line.item_id) {
            order.push(line.item_id);
        }
        *effect.entry(line.item_id).or_default() += sign * line.effective_quantity();
    }
    for line in old_items {
        if !effect.contains_key(&line.item_id) {
            order.push(line.item_id);
        }
        *effect.entry(line.item_id).or_default() -= sign * line.effective_quantity();
    }

    let shipping: HashMap<InventoryItemId, Decimal> = shipping_updates.iter().copied().collect();

    order
        .into_iter()
        .filter_map(|item_id| {
            let quantity_delta = effect[&item_id];
            let new_shipping_cost = shipping.get(&item_id).copied();
            if quantity_delta.is_zero() && new_shipping_cost.is_none() {
                return None;
            }
            Some(StockDelta {
                item_id,
                quantity_delta,
                new_shipping_cost,
            })
        })
        .collect()
}
