//! Core operations.
//!
//! `LedgerService` is the surface the (out-of-scope) presentation layer calls
//! into. It resolves references, runs the pure domain core, and commits the
//! outcome atomically through the store. Aggregates returned from here are
//! authoritative; callers must never persist their own recomputed totals.

use std::collections::{HashMap, HashSet};

use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use stockbook_buyers::{BuyerAccount, ContactInfo};
use stockbook_core::{
    BuyerId, DomainError, DomainResult, ExpectedVersion, InventoryItemId, SessionContext,
    TransactionId,
};
use stockbook_inventory::{InventoryItem, NewInventoryItem, UnitAmounts, units};
use stockbook_ledger::{
    CreateTransactionInput, LineInput, Transaction, TransactionBody, TransactionItem,
    TransactionKind, apply_edit, build, validate_return,
};

use crate::activity::{ActivityFilter, ActivityLogEntry, project};
use crate::store::{CommitRequest, LedgerStore};

/// The caller's idea of the pre-edit state, used only to detect and log a
/// divergent view; the authoritative before-state is re-read from storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditBaseline {
    pub original_items: Vec<TransactionItem>,
    pub original_total_shipping: Decimal,
}

/// Sales of one item to one buyer, plus what remains returnable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemSalesSummary {
    pub sales: Vec<Transaction>,
    pub available_to_return: Decimal,
}

pub struct LedgerService<S> {
    store: S,
}

impl<S: LedgerStore> LedgerService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Register an inventory item owned by the session user.
    pub fn register_item(
        &self,
        ctx: &SessionContext,
        mut attrs: NewInventoryItem,
    ) -> DomainResult<InventoryItem> {
        attrs.owner_id = ctx.user_id;
        if attrs.unit.trim().is_empty() {
            attrs.unit = ctx.default_unit.clone();
        }
        let item = InventoryItem::register(InventoryItemId::new(), attrs, Utc::now())?;
        self.store.insert_item(item.clone())?;
        Ok(item)
    }

    /// Register a buyer account owned by the session user.
    pub fn register_buyer(
        &self,
        ctx: &SessionContext,
        name: impl Into<String>,
        contact: ContactInfo,
    ) -> DomainResult<BuyerAccount> {
        let buyer =
            BuyerAccount::register(BuyerId::new(), ctx.user_id, name, contact, Utc::now())?;
        self.store.insert_buyer(buyer.clone())?;
        Ok(buyer)
    }

    /// Create and commit a transaction of any kind.
    #[instrument(skip(self, ctx, input), fields(user = %ctx.user_id, kind = %input.kind))]
    pub fn create_transaction(
        &self,
        ctx: &SessionContext,
        input: CreateTransactionInput,
    ) -> DomainResult<Transaction> {
        let buyer = match input.buyer_id {
            Some(buyer_id) => Some(self.resolve_buyer(ctx, buyer_id)?),
            None => None,
        };
        let inventory = self.resolve_inventory(ctx, input.lines.iter().map(|l| l.item_id))?;

        if input.kind == TransactionKind::Return {
            let buyer_id = input
                .buyer_id
                .ok_or_else(|| DomainError::invalid_input("return requires a buyer"))?;
            let original_sale_id = input.original_sale_id.ok_or_else(|| {
                DomainError::invalid_input("return must reference the originating sale")
            })?;
            self.validate_return_lines(
                ctx,
                buyer_id,
                original_sale_id,
                &input.lines,
                &inventory,
                None,
            )?;
        }

        let outcome = build(ctx, TransactionId::new(), input, &inventory, Utc::now())?;

        let request = CommitRequest {
            expected_transaction_version: ExpectedVersion::Exact(0),
            expected_item_versions: inventory
                .values()
                .map(|item| (item.id(), ExpectedVersion::Exact(item.version())))
                .collect(),
            expected_buyer_version: buyer
                .as_ref()
                .map(|b| ExpectedVersion::Exact(b.version())),
            transaction: outcome.transaction,
            stock_deltas: outcome.stock_deltas,
            balance_delta: outcome.balance_delta,
        };
        self.store.commit(request)
    }

    /// Edit a posted transaction, appending the prior state to its history.
    #[instrument(skip_all, fields(user = %ctx.user_id, %transaction_id))]
    pub fn edit_transaction(
        &self,
        ctx: &SessionContext,
        transaction_id: TransactionId,
        new_lines: Vec<LineInput>,
        new_total_shipping: Option<Decimal>,
        client_baseline: Option<EditBaseline>,
    ) -> DomainResult<Transaction> {
        let existing = self.resolve_transaction(ctx, transaction_id)?;

        if let Some(baseline) = client_baseline {
            // Diff-display aid only; storage is the source of truth.
            if baseline.original_items != existing.items()
                || baseline.original_total_shipping != existing.body.total_shipping()
            {
                tracing::warn!(
                    %transaction_id,
                    "caller's before-state diverges from storage; proceeding from storage"
                );
            }
        }

        let touched = new_lines
            .iter()
            .map(|l| l.item_id)
            .chain(existing.items().iter().map(|l| l.item_id));
        let inventory = self.resolve_inventory(ctx, touched)?;

        let buyer = match existing.buyer_id() {
            Some(buyer_id) => Some(self.resolve_buyer(ctx, buyer_id)?),
            None => None,
        };

        // A return edit must still fit within the originating sale; the
        // transaction's own lines are excluded since they are being replaced.
        if let TransactionBody::Return(body) = &existing.body {
            self.validate_return_lines(
                ctx,
                body.buyer_id,
                body.original_sale_id,
                &new_lines,
                &inventory,
                Some(existing.id),
            )?;
        }

        let outcome = apply_edit(&existing, &new_lines, new_total_shipping, &inventory, Utc::now())?;

        let request = CommitRequest {
            expected_transaction_version: ExpectedVersion::Exact(existing.version),
            expected_item_versions: inventory
                .values()
                .map(|item| (item.id(), ExpectedVersion::Exact(item.version())))
                .collect(),
            expected_buyer_version: buyer
                .as_ref()
                .map(|b| ExpectedVersion::Exact(b.version())),
            transaction: outcome.transaction,
            stock_deltas: outcome.stock_deltas,
            balance_delta: outcome.balance_delta,
        };
        self.store.commit(request)
    }

    /// Read one transaction, optionally with its full edit history.
    pub fn get_transaction(
        &self,
        ctx: &SessionContext,
        transaction_id: TransactionId,
        populate_history: bool,
    ) -> DomainResult<Transaction> {
        let mut transaction = self.resolve_transaction(ctx, transaction_id)?;
        if !populate_history {
            transaction.prev_values.clear();
        }
        Ok(transaction)
    }

    /// All sale transactions for a buyer, in insertion order.
    pub fn list_sales_for_buyer(
        &self,
        ctx: &SessionContext,
        buyer_id: BuyerId,
    ) -> DomainResult<Vec<Transaction>> {
        self.resolve_buyer(ctx, buyer_id)?;
        Ok(self
            .store
            .transactions_for_user(ctx.user_id)?
            .into_iter()
            .filter(|txn| txn.kind() == TransactionKind::Sale && txn.buyer_id() == Some(buyer_id))
            .collect())
    }

    /// Sales of one item to one buyer (newest first) and the cumulative
    /// quantity still available to return.
    pub fn recent_sales_for_item(
        &self,
        ctx: &SessionContext,
        buyer_id: BuyerId,
        item_id: InventoryItemId,
    ) -> DomainResult<ItemSalesSummary> {
        self.resolve_buyer(ctx, buyer_id)?;
        let mut sales: Vec<Transaction> = self
            .store
            .transactions_for_user(ctx.user_id)?
            .into_iter()
            .filter(|txn| {
                txn.kind() == TransactionKind::Sale
                    && txn.buyer_id() == Some(buyer_id)
                    && txn.items().iter().any(|line| line.item_id == item_id)
            })
            .collect();
        sales.reverse();
        let available_to_return = self.available_to_return(ctx, buyer_id, item_id)?;
        Ok(ItemSalesSummary {
            sales,
            available_to_return,
        })
    }

    /// Read-only audit projection over the user's transactions.
    pub fn list_activity(
        &self,
        ctx: &SessionContext,
        filter: &ActivityFilter,
    ) -> DomainResult<Vec<ActivityLogEntry>> {
        let transactions = self.store.transactions_for_user(ctx.user_id)?;
        Ok(project(&transactions, filter))
    }

    /// Cumulative effective quantity sold minus already returned, for one
    /// buyer+item pair. Bounds future return requests.
    pub fn available_to_return(
        &self,
        ctx: &SessionContext,
        buyer_id: BuyerId,
        item_id: InventoryItemId,
    ) -> DomainResult<Decimal> {
        self.available_to_return_excluding(ctx, buyer_id, item_id, None)
    }

    fn available_to_return_excluding(
        &self,
        ctx: &SessionContext,
        buyer_id: BuyerId,
        item_id: InventoryItemId,
        exclude: Option<TransactionId>,
    ) -> DomainResult<Decimal> {
        let mut available = Decimal::ZERO;
        for txn in self.store.transactions_for_user(ctx.user_id)? {
            if txn.buyer_id() != Some(buyer_id) || exclude == Some(txn.id) {
                continue;
            }
            let sign = match txn.body {
                TransactionBody::Sale(_) => Decimal::ONE,
                TransactionBody::Return(_) => -Decimal::ONE,
                _ => continue,
            };
            for line in txn.items() {
                if line.item_id == item_id {
                    available += sign * line.effective_quantity();
                }
            }
        }
        Ok(available)
    }

    fn resolve_buyer(&self, ctx: &SessionContext, buyer_id: BuyerId) -> DomainResult<BuyerAccount> {
        let buyer = self.store.get_buyer(buyer_id)?;
        if buyer.owner_id() != ctx.user_id {
            return Err(DomainError::not_found(format!("buyer {buyer_id}")));
        }
        Ok(buyer)
    }

    fn resolve_transaction(
        &self,
        ctx: &SessionContext,
        transaction_id: TransactionId,
    ) -> DomainResult<Transaction> {
        let transaction = self.store.get_transaction(transaction_id)?;
        if transaction.user_id != ctx.user_id {
            return Err(DomainError::not_found(format!(
                "transaction {transaction_id}"
            )));
        }
        Ok(transaction)
    }

    fn resolve_inventory(
        &self,
        ctx: &SessionContext,
        ids: impl Iterator<Item = InventoryItemId>,
    ) -> DomainResult<HashMap<InventoryItemId, InventoryItem>> {
        let mut inventory = HashMap::new();
        for id in ids {
            if inventory.contains_key(&id) {
                continue;
            }
            let item = self.store.get_item(id)?;
            if item.owner_id() != ctx.user_id {
                return Err(DomainError::not_found(format!("inventory item {id}")));
            }
            inventory.insert(id, item);
        }
        Ok(inventory)
    }

    /// Run the return validator for every return line against the
    /// originating sale and the cumulative available-to-return balance.
    ///
    /// The lines are validated as a set: no two lines may reference the same
    /// sale line, and quantities for the same item accumulate against the
    /// available-to-return balance within the request. On edit, the
    /// transaction being edited is excluded from that balance since its
    /// lines are being replaced wholesale.
    fn validate_return_lines(
        &self,
        ctx: &SessionContext,
        buyer_id: BuyerId,
        original_sale_id: TransactionId,
        lines: &[LineInput],
        inventory: &HashMap<InventoryItemId, InventoryItem>,
        exclude: Option<TransactionId>,
    ) -> DomainResult<()> {
        let sale = self.resolve_transaction(ctx, original_sale_id)?;
        if sale.kind() != TransactionKind::Sale {
            return Err(DomainError::invalid_input(
                "returns must reference a sale transaction",
            ));
        }

        let mut seen_lines = HashSet::new();
        let mut requested: HashMap<InventoryItemId, Decimal> = HashMap::new();
        for line in lines {
            let line_ref = line.original_sale_line.ok_or_else(|| {
                DomainError::invalid_input("return line must reference the originating sale line")
            })?;
            if !seen_lines.insert(line_ref) {
                return Err(DomainError::invalid_input(format!(
                    "sale line {line_ref} is referenced more than once"
                )));
            }
            let sold = sale
                .items()
                .iter()
                .find(|sold| sold.line_id == line_ref)
                .ok_or_else(|| {
                    DomainError::not_found(format!("sale line {line_ref} on {original_sale_id}"))
                })?;

            // Compare in the sale line's native unit.
            let native_quantity = match (line.unit.as_deref(), inventory.get(&line.item_id)) {
                (Some(unit), Some(item)) if unit != item.unit() => {
                    let amounts = UnitAmounts {
                        quantity: line.quantity,
                        unit_price: Decimal::ZERO,
                        sale_price: Decimal::ZERO,
                        shipping_per_unit: Decimal::ZERO,
                        markup: Decimal::ZERO,
                    };
                    units::convert(amounts, unit, item.unit()).quantity
                }
                _ => line.quantity,
            };

            let prior = requested
                .get(&line.item_id)
                .copied()
                .unwrap_or(Decimal::ZERO);
            let available = self
                .available_to_return_excluding(ctx, buyer_id, line.item_id, exclude)?
                - prior;
            validate_return(native_quantity, line.measurement, sold, available)?;
            *requested.entry(line.item_id).or_default() +=
                native_quantity * line.measurement.fraction();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::in_memory::InMemoryStore;
    use rust_decimal_macros::dec;
    use stockbook_core::UserId;
    use stockbook_ledger::Measurement;

    fn service() -> LedgerService<InMemoryStore> {
        LedgerService::new(InMemoryStore::new())
    }

    fn ctx() -> SessionContext {
        SessionContext::new(UserId::new())
    }

    fn seed_item(
        service: &LedgerService<InMemoryStore>,
        ctx: &SessionContext,
        quantity: Decimal,
    ) -> InventoryItem {
        service
            .register_item(
                ctx,
                NewInventoryItem {
                    owner_id: ctx.user_id,
                    buyer_id: None,
                    name: "Basmati rice".to_string(),
                    reference_number: None,
                    category: None,
                    unit: "kg".to_string(),
                    quantity,
                    unit_price: dec!(2.00),
                    shipping_cost: dec!(0.10),
                    product_type: None,
                },
            )
            .unwrap()
    }

    fn sale_input(
        buyer_id: BuyerId,
        item: &InventoryItem,
        quantity: Decimal,
    ) -> CreateTransactionInput {
        CreateTransactionInput {
            kind: TransactionKind::Sale,
            buyer_id: Some(buyer_id),
            lines: vec![LineInput {
                item_id: item.id(),
                quantity,
                measurement: Measurement::Full,
                unit: None,
                sale_price: Some(dec!(3.00)),
                unit_price: None,
                original_sale_line: None,
            }],
            total_shipping: None,
            notes: None,
            payment: None,
            original_sale_id: None,
        }
    }

    #[test]
    fn sale_commits_stock_and_balance_together() {
        let service = service();
        let ctx = ctx();
        let item = seed_item(&service, &ctx, dec!(100));
        let buyer = service
            .register_buyer(&ctx, "Al-Noor Traders", ContactInfo::default())
            .unwrap();

        let sale = service
            .create_transaction(&ctx, sale_input(buyer.id(), &item, dec!(10)))
            .unwrap();

        assert_eq!(sale.body.sale_price(), Some(dec!(30.00)));
        assert_eq!(service.store().get_item(item.id()).unwrap().quantity(), dec!(90));
        assert_eq!(
            service.store().get_buyer(buyer.id()).unwrap().balance(),
            dec!(-30.00)
        );
    }

    #[test]
    fn return_flow_validates_against_the_originating_sale() {
        let service = service();
        let ctx = ctx();
        let item = seed_item(&service, &ctx, dec!(100));
        let buyer = service
            .register_buyer(&ctx, "Al-Noor Traders", ContactInfo::default())
            .unwrap();
        let sale = service
            .create_transaction(&ctx, sale_input(buyer.id(), &item, dec!(10)))
            .unwrap();
        let sold_line = sale.items()[0].line_id;

        let return_input = |quantity: Decimal| CreateTransactionInput {
            kind: TransactionKind::Return,
            buyer_id: Some(buyer.id()),
            lines: vec![LineInput {
                item_id: item.id(),
                quantity,
                measurement: Measurement::Full,
                unit: None,
                sale_price: Some(dec!(3.00)),
                unit_price: None,
                original_sale_line: Some(sold_line),
            }],
            total_shipping: None,
            notes: None,
            payment: None,
            original_sale_id: Some(sale.id),
        };

        // 15 exceeds the 10 sold on that line.
        let err = service
            .create_transaction(&ctx, return_input(dec!(15)))
            .unwrap_err();
        assert!(matches!(err, DomainError::ReturnExceedsLimit(_)));

        // 8 is accepted: stock back up, buyer credited 8 × $3.
        service
            .create_transaction(&ctx, return_input(dec!(8)))
            .unwrap();
        assert_eq!(service.store().get_item(item.id()).unwrap().quantity(), dec!(98));
        assert_eq!(
            service.store().get_buyer(buyer.id()).unwrap().balance(),
            dec!(-6.00)
        );

        // Only 2 remain returnable now; the second rule rejects 5.
        let err = service
            .create_transaction(&ctx, return_input(dec!(5)))
            .unwrap_err();
        assert!(matches!(err, DomainError::ReturnExceedsLimit(_)));
    }

    #[test]
    fn edit_path_equals_create_path_for_the_same_lines() {
        let service = service();
        let ctx = ctx();
        let item = seed_item(&service, &ctx, dec!(100));
        let buyer = service
            .register_buyer(&ctx, "Al-Noor Traders", ContactInfo::default())
            .unwrap();
        let sale = service
            .create_transaction(&ctx, sale_input(buyer.id(), &item, dec!(10)))
            .unwrap();

        let edited = service
            .edit_transaction(
                &ctx,
                sale.id,
                vec![LineInput {
                    item_id: item.id(),
                    quantity: dec!(7),
                    measurement: Measurement::Full,
                    unit: None,
                    sale_price: Some(dec!(3.00)),
                    unit_price: None,
                    original_sale_line: None,
                }],
                None,
                None,
            )
            .unwrap();

        // Rebuild from scratch in a parallel world and compare aggregates.
        let parallel = LedgerService::new(InMemoryStore::new());
        let ctx2 = ctx;
        let sibling = seed_item(&parallel, &ctx2, dec!(100));
        let buyer2 = parallel
            .register_buyer(&ctx2, "Al-Noor Traders", ContactInfo::default())
            .unwrap();
        let rebuilt = parallel
            .create_transaction(&ctx2, sale_input(buyer2.id(), &sibling, dec!(7)))
            .unwrap();

        assert_eq!(edited.body.sale_price(), rebuilt.body.sale_price());
        assert_eq!(edited.body.profit(), rebuilt.body.profit());
        assert_eq!(edited.body.price(), rebuilt.body.price());

        // Stock reflects the corrected quantity, balance moved by the diff.
        assert_eq!(service.store().get_item(item.id()).unwrap().quantity(), dec!(93));
        assert_eq!(
            service.store().get_buyer(buyer.id()).unwrap().balance(),
            dec!(-21.00)
        );
        assert_eq!(edited.prev_values.len(), 1);
    }

    #[test]
    fn history_is_elided_unless_requested() {
        let service = service();
        let ctx = ctx();
        let item = seed_item(&service, &ctx, dec!(100));
        let buyer = service
            .register_buyer(&ctx, "Al-Noor Traders", ContactInfo::default())
            .unwrap();
        let sale = service
            .create_transaction(&ctx, sale_input(buyer.id(), &item, dec!(10)))
            .unwrap();
        service
            .edit_transaction(
                &ctx,
                sale.id,
                vec![LineInput {
                    item_id: item.id(),
                    quantity: dec!(9),
                    measurement: Measurement::Full,
                    unit: None,
                    sale_price: Some(dec!(3.00)),
                    unit_price: None,
                    original_sale_line: None,
                }],
                None,
                None,
            )
            .unwrap();

        let bare = service.get_transaction(&ctx, sale.id, false).unwrap();
        assert!(bare.prev_values.is_empty());
        assert!(bare.edited);

        let full = service.get_transaction(&ctx, sale.id, true).unwrap();
        assert_eq!(full.prev_values.len(), 1);
    }

    #[test]
    fn other_users_records_do_not_resolve() {
        let service = service();
        let owner = ctx();
        let intruder = ctx();
        let item = seed_item(&service, &owner, dec!(100));
        let buyer = service
            .register_buyer(&owner, "Al-Noor Traders", ContactInfo::default())
            .unwrap();
        let sale = service
            .create_transaction(&owner, sale_input(buyer.id(), &item, dec!(10)))
            .unwrap();

        let err = service.get_transaction(&intruder, sale.id, false).unwrap_err();
        assert!(matches!(err, DomainError::NotFound(_)));
        let err = service
            .create_transaction(&intruder, sale_input(buyer.id(), &item, dec!(1)))
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound(_)));
    }

    #[test]
    fn activity_projection_filters_by_kind_and_buyer() {
        let service = service();
        let ctx = ctx();
        let item = seed_item(&service, &ctx, dec!(100));
        let buyer = service
            .register_buyer(&ctx, "Al-Noor Traders", ContactInfo::default())
            .unwrap();
        service
            .create_transaction(&ctx, sale_input(buyer.id(), &item, dec!(10)))
            .unwrap();
        service
            .create_transaction(
                &ctx,
                CreateTransactionInput {
                    kind: TransactionKind::Payment,
                    buyer_id: Some(buyer.id()),
                    lines: vec![],
                    total_shipping: None,
                    notes: None,
                    payment: Some(stockbook_ledger::PaymentDetails {
                        amount: dec!(30),
                        direction: stockbook_ledger::PaymentDirection::Received,
                        method: Some("cash".to_string()),
                    }),
                    original_sale_id: None,
                },
            )
            .unwrap();

        let all = service.list_activity(&ctx, &ActivityFilter::default()).unwrap();
        assert_eq!(all.len(), 2);
        // Newest first: the payment leads.
        assert_eq!(all[0].kind, TransactionKind::Payment);
        assert_eq!(all[0].amount, dec!(30));

        let sales_only = service
            .list_activity(
                &ctx,
                &ActivityFilter {
                    kind: Some(TransactionKind::Sale),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(sales_only.len(), 1);
        assert_eq!(sales_only[0].profit, Some(dec!(9.00)));
    }

    #[test]
    fn recent_sales_for_item_reports_available_to_return() {
        let service = service();
        let ctx = ctx();
        let item = seed_item(&service, &ctx, dec!(100));
        let buyer = service
            .register_buyer(&ctx, "Al-Noor Traders", ContactInfo::default())
            .unwrap();
        let first = service
            .create_transaction(&ctx, sale_input(buyer.id(), &item, dec!(10)))
            .unwrap();
        service
            .create_transaction(&ctx, sale_input(buyer.id(), &item, dec!(4)))
            .unwrap();
        service
            .create_transaction(
                &ctx,
                CreateTransactionInput {
                    kind: TransactionKind::Return,
                    buyer_id: Some(buyer.id()),
                    lines: vec![LineInput {
                        item_id: item.id(),
                        quantity: dec!(3),
                        measurement: Measurement::Full,
                        unit: None,
                        sale_price: Some(dec!(3.00)),
                        unit_price: None,
                        original_sale_line: Some(first.items()[0].line_id),
                    }],
                    total_shipping: None,
                    notes: None,
                    payment: None,
                    original_sale_id: Some(first.id),
                },
            )
            .unwrap();

        let summary = service
            .recent_sales_for_item(&ctx, buyer.id(), item.id())
            .unwrap();
        assert_eq!(summary.sales.len(), 2);
        // Sold 14, returned 3.
        assert_eq!(summary.available_to_return, dec!(11));
        // Newest sale first.
        assert_eq!(summary.sales[0].items()[0].quantity, dec!(4));
    }

    #[test]
    fn return_lines_are_validated_as_a_set() {
        let service = service();
        let ctx = ctx();
        let item = seed_item(&service, &ctx, dec!(100));
        let buyer = service
            .register_buyer(&ctx, "Al-Noor Traders", ContactInfo::default())
            .unwrap();

        // A sale with two 6 kg lines of the same item.
        let line = |quantity| LineInput {
            item_id: item.id(),
            quantity,
            measurement: Measurement::Full,
            unit: None,
            sale_price: Some(dec!(3.00)),
            unit_price: None,
            original_sale_line: None,
        };
        let sale = service
            .create_transaction(
                &ctx,
                CreateTransactionInput {
                    kind: TransactionKind::Sale,
                    buyer_id: Some(buyer.id()),
                    lines: vec![line(dec!(6)), line(dec!(6))],
                    total_shipping: None,
                    notes: None,
                    payment: None,
                    original_sale_id: None,
                },
            )
            .unwrap();
        let first = sale.items()[0].line_id;
        let second = sale.items()[1].line_id;

        let return_line = |quantity, sale_line| LineInput {
            item_id: item.id(),
            quantity,
            measurement: Measurement::Full,
            unit: None,
            sale_price: Some(dec!(3.00)),
            unit_price: None,
            original_sale_line: Some(sale_line),
        };
        let return_input = |lines| CreateTransactionInput {
            kind: TransactionKind::Return,
            buyer_id: Some(buyer.id()),
            lines,
            total_shipping: None,
            notes: None,
            payment: None,
            original_sale_id: Some(sale.id),
        };

        // Two lines against the same sale line cannot smuggle 12 units past
        // the 6-unit line cap.
        let err = service
            .create_transaction(
                &ctx,
                return_input(vec![return_line(dec!(6), first), return_line(dec!(6), first)]),
            )
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidInput(_)));

        // After 3 are returned, 9 remain returnable. Each 6-unit line fits
        // its sale line, but together they exceed the cumulative balance.
        service
            .create_transaction(&ctx, return_input(vec![return_line(dec!(3), first)]))
            .unwrap();
        let err = service
            .create_transaction(
                &ctx,
                return_input(vec![return_line(dec!(6), first), return_line(dec!(6), second)]),
            )
            .unwrap_err();
        assert!(matches!(err, DomainError::ReturnExceedsLimit(_)));

        // Only the accepted 3-unit return was applied.
        assert_eq!(service.store().get_item(item.id()).unwrap().quantity(), dec!(91));
        assert_eq!(
            service.store().get_buyer(buyer.id()).unwrap().balance(),
            dec!(-27.00)
        );
    }

    #[test]
    fn editing_a_return_revalidates_against_the_sale() {
        let service = service();
        let ctx = ctx();
        let item = seed_item(&service, &ctx, dec!(100));
        let buyer = service
            .register_buyer(&ctx, "Al-Noor Traders", ContactInfo::default())
            .unwrap();
        let sale = service
            .create_transaction(&ctx, sale_input(buyer.id(), &item, dec!(10)))
            .unwrap();
        let sold_line = sale.items()[0].line_id;

        let return_line = |quantity| LineInput {
            item_id: item.id(),
            quantity,
            measurement: Measurement::Full,
            unit: None,
            sale_price: Some(dec!(3.00)),
            unit_price: None,
            original_sale_line: Some(sold_line),
        };
        let ret = service
            .create_transaction(
                &ctx,
                CreateTransactionInput {
                    kind: TransactionKind::Return,
                    buyer_id: Some(buyer.id()),
                    lines: vec![return_line(dec!(8))],
                    total_shipping: None,
                    notes: None,
                    payment: None,
                    original_sale_id: Some(sale.id),
                },
            )
            .unwrap();

        // Inflating the committed return past the sold quantity is rejected.
        let err = service
            .edit_transaction(&ctx, ret.id, vec![return_line(dec!(15))], None, None)
            .unwrap_err();
        assert!(matches!(err, DomainError::ReturnExceedsLimit(_)));
        assert_eq!(service.store().get_item(item.id()).unwrap().quantity(), dec!(98));

        // Shrinking it is fine: the edited transaction's own lines do not
        // count against the available-to-return balance.
        let edited = service
            .edit_transaction(&ctx, ret.id, vec![return_line(dec!(5))], None, None)
            .unwrap();
        assert_eq!(edited.items()[0].quantity, dec!(5));
        assert_eq!(service.store().get_item(item.id()).unwrap().quantity(), dec!(95));
        assert_eq!(
            service.store().get_buyer(buyer.id()).unwrap().balance(),
            dec!(-15.00)
        );
    }
}
