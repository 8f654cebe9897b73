//! Transaction assembly.
//!
//! `build` turns caller input into a complete, internally consistent
//! [`Transaction`] plus the side effects the store must commit atomically
//! with it: stock deltas, standing-shipping updates, and the buyer balance
//! delta. Assembly is pure — persistence and buyer/sale resolution happen in
//! the store layer.
//!
//! The line-normalization path (`assemble_lines`) is shared with the edit
//! recomputation, so a transaction edited to a given line set carries exactly
//! the aggregates a fresh build of that line set would.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use stockbook_core::{
    BuyerId, DomainError, DomainResult, InventoryItemId, SessionContext, TransactionId,
};
use stockbook_inventory::{InventoryItem, UnitAmounts, units};

use crate::balance::balance_delta;
use crate::shipping;
use crate::transaction::{
    Measurement, PaymentBody, PaymentDetails, ReturnBody, SaleBody, StockBody, StockTotals,
    TradeTotals, Transaction, TransactionBody, TransactionItem, TransactionKind,
};
use crate::valuation::{Aggregates, aggregate};

/// One line as submitted by the caller, possibly in a display unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineInput {
    pub item_id: InventoryItemId,
    pub quantity: Decimal,
    pub measurement: Measurement,
    /// Unit the caller worked in; `None` means the item's native unit.
    pub unit: Option<String>,
    /// Sale price per display unit. Required for sale/return lines.
    pub sale_price: Option<Decimal>,
    /// Cost price per display unit; defaults to the item's recorded price.
    pub unit_price: Option<Decimal>,
    /// For return lines: the sale line being returned against.
    pub original_sale_line: Option<Uuid>,
}

/// Caller input for creating a transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateTransactionInput {
    pub kind: TransactionKind,
    pub buyer_id: Option<BuyerId>,
    pub lines: Vec<LineInput>,
    /// Aggregate shipping to spread across the lines (stock intakes).
    pub total_shipping: Option<Decimal>,
    pub notes: Option<String>,
    /// Standalone payment, or a payment settled together with a sale.
    pub payment: Option<PaymentDetails>,
    /// For returns: the sale being returned against.
    pub original_sale_id: Option<TransactionId>,
}

/// A stock mutation the store applies atomically with the transaction write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockDelta {
    pub item_id: InventoryItemId,
    /// Signed quantity change in the item's native unit.
    pub quantity_delta: Decimal,
    /// Replacement standing per-unit shipping cost (intake allocations).
    pub new_shipping_cost: Option<Decimal>,
}

/// Everything a successful build produces; committed all-or-nothing.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildOutcome {
    pub transaction: Transaction,
    pub stock_deltas: Vec<StockDelta>,
    pub balance_delta: Option<(BuyerId, Decimal)>,
}

/// Normalized lines plus their aggregates and shipping side effects.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct LineSet {
    pub items: Vec<TransactionItem>,
    pub aggregates: Aggregates,
    /// New standing shipping per item (intakes with an allocated rate).
    pub shipping_updates: Vec<(InventoryItemId, Decimal)>,
}

/// Assemble a complete transaction from caller input.
pub fn build(
    ctx: &SessionContext,
    id: TransactionId,
    input: CreateTransactionInput,
    inventory: &HashMap<InventoryItemId, InventoryItem>,
    now: DateTime<Utc>,
) -> DomainResult<BuildOutcome> {
    let mut shipping_updates: Vec<(InventoryItemId, Decimal)> = Vec::new();
    let body = match input.kind {
        TransactionKind::Payment => {
            let buyer_id = input
                .buyer_id
                .ok_or_else(|| DomainError::invalid_input("payment requires a buyer"))?;
            let payment = input
                .payment
                .ok_or_else(|| DomainError::invalid_input("payment requires payment details"))?;
            if payment.amount <= Decimal::ZERO {
                return Err(DomainError::invalid_input(
                    "payment amount must be positive",
                ));
            }
            if !input.lines.is_empty() {
                return Err(DomainError::invalid_input(
                    "payment transactions carry no line items",
                ));
            }
            TransactionBody::Payment(PaymentBody { buyer_id, payment })
        }
        kind => {
            let set = assemble_lines(kind, &input.lines, inventory, input.total_shipping)?;
            if kind == TransactionKind::Sale {
                check_stock(&set.items, inventory)?;
            }
            shipping_updates = set.shipping_updates.clone();
            body_for(kind, &input, set)?
        }
    };

    let stock_deltas = stock_deltas_for_create(&body, &shipping_updates);
    let delta = balance_delta(&body);
    let balance = body.buyer_id().map(|buyer_id| (buyer_id, delta));

    let transaction = Transaction {
        id,
        user_id: ctx.user_id,
        body,
        notes: input.notes,
        created_at: now,
        edited: false,
        prev_values: Vec::new(),
        version: 1,
    };

    tracing::debug!(
        transaction_id = %transaction.id,
        kind = %transaction.kind(),
        lines = transaction.items().len(),
        "assembled transaction"
    );

    Ok(BuildOutcome {
        transaction,
        stock_deltas,
        balance_delta: balance,
    })
}

/// Normalize caller lines into native-unit [`TransactionItem`]s and compute
/// aggregates. Shared by the create and edit paths.
pub(crate) fn assemble_lines(
    kind: TransactionKind,
    lines: &[LineInput],
    inventory: &HashMap<InventoryItemId, InventoryItem>,
    total_shipping: Option<Decimal>,
) -> DomainResult<LineSet> {
    if lines.is_empty() {
        return Err(DomainError::invalid_input(
            "transaction must have at least one line item",
        ));
    }

    // First pass: resolve items and convert everything to native units.
    let mut normalized: Vec<(TransactionItem, &InventoryItem)> = Vec::with_capacity(lines.len());
    for line in lines {
        let item = inventory
            .get(&line.item_id)
            .ok_or_else(|| DomainError::not_found(format!("inventory item {}", line.item_id)))?;

        if line.quantity <= Decimal::ZERO {
            return Err(DomainError::invalid_input(format!(
                "line quantity must be positive for item '{}'",
                item.name()
            )));
        }
        if kind.is_trade() && line.sale_price.is_none() {
            return Err(DomainError::invalid_input(format!(
                "sale price required for item '{}'",
                item.name()
            )));
        }
        if kind == TransactionKind::Return && line.original_sale_line.is_none() {
            return Err(DomainError::invalid_input(format!(
                "return line for item '{}' must reference the originating sale line",
                item.name()
            )));
        }

        let display_unit = line.unit.as_deref().unwrap_or_else(|| item.unit());
        let submitted = UnitAmounts {
            quantity: line.quantity,
            unit_price: line.unit_price.unwrap_or(Decimal::ZERO),
            sale_price: line.sale_price.unwrap_or(Decimal::ZERO),
            shipping_per_unit: Decimal::ZERO,
            markup: Decimal::ZERO,
        };
        let native = units::convert(submitted, display_unit, item.unit());

        let unit_price = if line.unit_price.is_some() {
            native.unit_price
        } else {
            item.unit_price()
        };

        normalized.push((
            TransactionItem {
                line_id: Uuid::now_v7(),
                item_id: item.id(),
                name: item.name().to_string(),
                quantity: native.quantity,
                measurement: line.measurement,
                unit: item.unit().to_string(),
                unit_price,
                sale_price: native.sale_price,
                shipping_per_unit: Decimal::ZERO, // filled below
                original_sale_line: line.original_sale_line,
            },
            item,
        ));
    }

    // Second pass: shipping. Trades carry each item's standing per-unit rate;
    // intakes with an aggregate charge get one blended rate which also
    // becomes the item's standing rate going forward.
    let mut shipping_updates = Vec::new();
    match (kind.is_stock_intake(), total_shipping) {
        (true, Some(total)) => {
            let quantities: Vec<Decimal> =
                normalized.iter().map(|(line, _)| line.quantity).collect();
            let rate = shipping::allocate(total, &quantities);
            for (line, _) in &mut normalized {
                line.shipping_per_unit = rate;
                shipping_updates.push((line.item_id, rate));
            }
        }
        _ => {
            for (line, item) in &mut normalized {
                line.shipping_per_unit = item.shipping_cost();
            }
        }
    }

    let items: Vec<TransactionItem> = normalized.into_iter().map(|(line, _)| line).collect();
    let aggregates = aggregate(kind, &items);

    Ok(LineSet {
        items,
        aggregates,
        shipping_updates,
    })
}

/// Sale-only guard: requested effective quantity per item must not exceed
/// what is on hand. The store re-enforces this at commit time.
fn check_stock(
    items: &[TransactionItem],
    inventory: &HashMap<InventoryItemId, InventoryItem>,
) -> DomainResult<()> {
    let mut requested: HashMap<InventoryItemId, Decimal> = HashMap::new();
    for line in items {
        *requested.entry(line.item_id).or_default() += line.effective_quantity();
    }
    for (item_id, wanted) in requested {
        // Lines only exist for resolved items; missing here cannot happen.
        if let Some(item) = inventory.get(&item_id) {
            if wanted > item.quantity() {
                return Err(DomainError::InsufficientStock {
                    item: item_id,
                    requested: wanted,
                    available: item.quantity(),
                });
            }
        }
    }
    Ok(())
}

fn body_for(
    kind: TransactionKind,
    input: &CreateTransactionInput,
    set: LineSet,
) -> DomainResult<TransactionBody> {
    let body = match kind {
        TransactionKind::Sale => {
            let buyer_id = input
                .buyer_id
                .ok_or_else(|| DomainError::invalid_input("sale requires a buyer"))?;
            if let Some(payment) = &input.payment {
                if payment.amount <= Decimal::ZERO {
                    return Err(DomainError::invalid_input(
                        "payment amount must be positive",
                    ));
                }
            }
            TransactionBody::Sale(SaleBody {
                buyer_id,
                totals: trade_totals(&set.aggregates),
                items: set.items,
                payment: input.payment.clone(),
            })
        }
        TransactionKind::Return => {
            let buyer_id = input
                .buyer_id
                .ok_or_else(|| DomainError::invalid_input("return requires a buyer"))?;
            let original_sale_id = input.original_sale_id.ok_or_else(|| {
                DomainError::invalid_input("return must reference the originating sale")
            })?;
            TransactionBody::Return(ReturnBody {
                buyer_id,
                original_sale_id,
                totals: trade_totals(&set.aggregates),
                items: set.items,
            })
        }
        TransactionKind::Restock => TransactionBody::Restock(stock_body(input, set)),
        TransactionKind::InventoryAddition => {
            TransactionBody::InventoryAddition(stock_body(input, set))
        }
        TransactionKind::Payment => unreachable!("payment handled before line assembly"),
    };
    Ok(body)
}

fn trade_totals(aggregates: &Aggregates) -> TradeTotals {
    TradeTotals {
        price: aggregates.price,
        sale_price: aggregates.sale_price,
        total_shipping: aggregates.total_shipping,
        profit: aggregates.profit.unwrap_or(Decimal::ZERO),
    }
}

fn stock_body(input: &CreateTransactionInput, set: LineSet) -> StockBody {
    StockBody {
        buyer_id: input.buyer_id,
        totals: StockTotals {
            price: set.aggregates.price,
            total_shipping: set.aggregates.total_shipping,
        },
        items: set.items,
    }
}

/// Stock deltas for a freshly created transaction: sales decrement, returns
/// and intakes increment, payments touch nothing. Standing-shipping updates
/// come from the allocation pass, so an intake without an aggregate charge
/// leaves each item's rate untouched.
fn stock_deltas_for_create(
    body: &TransactionBody,
    shipping_updates: &[(InventoryItemId, Decimal)],
) -> Vec<StockDelta> {
    let sign = match body.kind() {
        TransactionKind::Sale => -Decimal::ONE,
        TransactionKind::Payment => return Vec::new(),
        _ => Decimal::ONE,
    };

    let updates: HashMap<InventoryItemId, Decimal> = shipping_updates.iter().copied().collect();

    body.items()
        .iter()
        .map(|line| StockDelta {
            item_id: line.item_id,
            quantity_delta: sign * line.effective_quantity(),
            new_shipping_cost: updates.get(&line.item_id).copied(),
        })
        .collect()
}
