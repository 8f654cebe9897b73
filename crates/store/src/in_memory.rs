//! In-memory ledger store.
//!
//! Intended for tests/dev. Not optimized for performance. One mutex guards
//! all records; a commit stages every mutation on clones and writes back only
//! after the whole request validated, so a rejected commit leaves nothing
//! applied.

use std::collections::HashMap;
use std::sync::Mutex;

use stockbook_buyers::BuyerAccount;
use stockbook_core::{
    BuyerId, DomainError, DomainResult, InventoryItemId, TransactionId, UserId,
};
use stockbook_inventory::InventoryItem;
use stockbook_ledger::Transaction;

use crate::store::{CommitRequest, LedgerStore};

#[derive(Debug, Default)]
struct Inner {
    items: HashMap<InventoryItemId, InventoryItem>,
    buyers: HashMap<BuyerId, BuyerAccount>,
    transactions: HashMap<TransactionId, Transaction>,
    /// Insertion order of transaction ids, for stable listings.
    order: Vec<TransactionId>,
}

#[derive(Debug, Default)]
pub struct InMemoryStore {
    inner: Mutex<Inner>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> DomainResult<std::sync::MutexGuard<'_, Inner>> {
        // A poisoned lock means a writer panicked mid-commit; whatever it
        // half-applied is unknowable, which is exactly the partial-commit class.
        self.inner.lock().map_err(|_| {
            DomainError::partial_commit("store lock poisoned during a prior write")
        })
    }
}

impl LedgerStore for InMemoryStore {
    fn insert_item(&self, item: InventoryItem) -> DomainResult<()> {
        let mut inner = self.lock()?;
        inner.items.insert(item.id(), item);
        Ok(())
    }

    fn get_item(&self, id: InventoryItemId) -> DomainResult<InventoryItem> {
        let inner = self.lock()?;
        inner
            .items
            .get(&id)
            .cloned()
            .ok_or_else(|| DomainError::not_found(format!("inventory item {id}")))
    }

    fn insert_buyer(&self, buyer: BuyerAccount) -> DomainResult<()> {
        let mut inner = self.lock()?;
        inner.buyers.insert(buyer.id(), buyer);
        Ok(())
    }

    fn get_buyer(&self, id: BuyerId) -> DomainResult<BuyerAccount> {
        let inner = self.lock()?;
        inner
            .buyers
            .get(&id)
            .cloned()
            .ok_or_else(|| DomainError::not_found(format!("buyer {id}")))
    }

    fn get_transaction(&self, id: TransactionId) -> DomainResult<Transaction> {
        let inner = self.lock()?;
        inner
            .transactions
            .get(&id)
            .cloned()
            .ok_or_else(|| DomainError::not_found(format!("transaction {id}")))
    }

    fn transactions_for_user(&self, user_id: UserId) -> DomainResult<Vec<Transaction>> {
        let inner = self.lock()?;
        Ok(inner
            .order
            .iter()
            .filter_map(|id| inner.transactions.get(id))
            .filter(|txn| txn.user_id == user_id)
            .cloned()
            .collect())
    }

    fn commit(&self, request: CommitRequest) -> DomainResult<Transaction> {
        let mut inner = self.lock()?;
        let transaction_id = request.transaction.id;

        // Stage everything first; nothing is written until all checks pass.
        let stored_version = inner
            .transactions
            .get(&transaction_id)
            .map(|t| t.version)
            .unwrap_or(0);
        request
            .expected_transaction_version
            .check(stored_version)
            .inspect_err(|_| {
                tracing::warn!(%transaction_id, "transaction version conflict on commit");
            })?;

        let mut staged_items: HashMap<InventoryItemId, InventoryItem> = HashMap::new();
        for delta in &request.stock_deltas {
            let mut item = match staged_items.remove(&delta.item_id) {
                Some(staged) => staged,
                None => {
                    let item = inner.items.get(&delta.item_id).cloned().ok_or_else(|| {
                        DomainError::not_found(format!("inventory item {}", delta.item_id))
                    })?;
                    request
                        .expected_item_version(delta.item_id)
                        .check(item.version())
                        .inspect_err(|_| {
                            tracing::warn!(item_id = %delta.item_id, "item version conflict on commit");
                        })?;
                    item
                }
            };
            item.apply_stock_delta(delta.quantity_delta)?;
            if let Some(rate) = delta.new_shipping_cost {
                item.set_shipping_cost(rate);
            }
            staged_items.insert(delta.item_id, item);
        }

        let staged_buyer = match request.balance_delta {
            Some((buyer_id, delta)) => {
                let mut buyer = inner
                    .buyers
                    .get(&buyer_id)
                    .cloned()
                    .ok_or_else(|| DomainError::not_found(format!("buyer {buyer_id}")))?;
                if let Some(expected) = request.expected_buyer_version {
                    expected.check(buyer.version())?;
                }
                buyer.apply_balance_delta(delta);
                Some(buyer)
            }
            None => None,
        };

        // All checks passed: write back.
        for (id, item) in staged_items {
            inner.items.insert(id, item);
        }
        if let Some(buyer) = staged_buyer {
            inner.buyers.insert(buyer.id(), buyer);
        }
        let is_new = !inner.transactions.contains_key(&transaction_id);
        if is_new {
            inner.order.push(transaction_id);
        }
        inner
            .transactions
            .insert(transaction_id, request.transaction.clone());

        tracing::info!(
            %transaction_id,
            kind = %request.transaction.kind(),
            stock_mutations = request.stock_deltas.len(),
            balance_applied = request.balance_delta.is_some(),
            "committed transaction"
        );

        Ok(request.transaction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use stockbook_core::ExpectedVersion;
    use stockbook_inventory::NewInventoryItem;
    use stockbook_ledger::{
        PaymentBody, PaymentDetails, PaymentDirection, StockDelta, TransactionBody,
    };

    fn seeded_item(store: &InMemoryStore, quantity: Decimal) -> InventoryItem {
        let item = InventoryItem::register(
            InventoryItemId::new(),
            NewInventoryItem {
                owner_id: UserId::new(),
                buyer_id: None,
                name: "lentils".to_string(),
                reference_number: None,
                category: None,
                unit: "kg".to_string(),
                quantity,
                unit_price: dec!(1.20),
                shipping_cost: dec!(0.05),
                product_type: None,
            },
            Utc::now(),
        )
        .unwrap();
        store.insert_item(item.clone()).unwrap();
        item
    }

    fn payment_transaction(user_id: UserId, buyer_id: BuyerId) -> Transaction {
        Transaction {
            id: TransactionId::new(),
            user_id,
            body: TransactionBody::Payment(PaymentBody {
                buyer_id,
                payment: PaymentDetails {
                    amount: dec!(10),
                    direction: PaymentDirection::Received,
                    method: None,
                },
            }),
            notes: None,
            created_at: Utc::now(),
            edited: false,
            prev_values: Vec::new(),
            version: 1,
        }
    }

    #[test]
    fn rejected_commit_applies_nothing() {
        let store = InMemoryStore::new();
        let item = seeded_item(&store, dec!(10));
        let other = seeded_item(&store, dec!(10));
        let user_id = UserId::new();
        let buyer = BuyerAccount::register(
            BuyerId::new(),
            user_id,
            "Karim Stores",
            Default::default(),
            Utc::now(),
        )
        .unwrap();
        store.insert_buyer(buyer.clone()).unwrap();

        // Second delta overdraws `other`; the whole request must be rejected.
        let request = CommitRequest {
            transaction: payment_transaction(user_id, buyer.id()),
            expected_transaction_version: ExpectedVersion::Exact(0),
            stock_deltas: vec![
                StockDelta {
                    item_id: item.id(),
                    quantity_delta: dec!(-5),
                    new_shipping_cost: None,
                },
                StockDelta {
                    item_id: other.id(),
                    quantity_delta: dec!(-25),
                    new_shipping_cost: None,
                },
            ],
            expected_item_versions: vec![],
            balance_delta: Some((buyer.id(), dec!(10))),
            expected_buyer_version: None,
        };

        let err = store.commit(request).unwrap_err();
        assert!(matches!(err, DomainError::InsufficientStock { .. }));

        // First item untouched, buyer untouched, no transaction recorded.
        assert_eq!(store.get_item(item.id()).unwrap().quantity(), dec!(10));
        assert_eq!(store.get_buyer(buyer.id()).unwrap().balance(), Decimal::ZERO);
        assert!(store.transactions_for_user(user_id).unwrap().is_empty());
    }

    #[test]
    fn stale_item_version_is_a_concurrency_conflict() {
        let store = InMemoryStore::new();
        let item = seeded_item(&store, dec!(10));
        let user_id = UserId::new();
        let buyer = BuyerAccount::register(
            BuyerId::new(),
            user_id,
            "Karim Stores",
            Default::default(),
            Utc::now(),
        )
        .unwrap();
        store.insert_buyer(buyer.clone()).unwrap();
        let read_version = item.version();

        // A concurrent write bumps the item version after our read.
        let mut raced = store.get_item(item.id()).unwrap();
        raced.apply_stock_delta(dec!(-1)).unwrap();
        store.insert_item(raced).unwrap();

        let request = CommitRequest {
            transaction: payment_transaction(user_id, buyer.id()),
            expected_transaction_version: ExpectedVersion::Exact(0),
            stock_deltas: vec![StockDelta {
                item_id: item.id(),
                quantity_delta: dec!(-5),
                new_shipping_cost: None,
            }],
            expected_item_versions: vec![(item.id(), ExpectedVersion::Exact(read_version))],
            balance_delta: None,
            expected_buyer_version: None,
        };

        let err = store.commit(request).unwrap_err();
        assert!(matches!(err, DomainError::ConcurrencyConflict(_)));
    }

    #[test]
    fn duplicate_transaction_id_is_rejected_for_new_writes() {
        let store = InMemoryStore::new();
        let user_id = UserId::new();
        let buyer = BuyerAccount::register(
            BuyerId::new(),
            user_id,
            "Karim Stores",
            Default::default(),
            Utc::now(),
        )
        .unwrap();
        store.insert_buyer(buyer.clone()).unwrap();

        let transaction = payment_transaction(user_id, buyer.id());
        let request = CommitRequest {
            transaction: transaction.clone(),
            expected_transaction_version: ExpectedVersion::Exact(0),
            stock_deltas: vec![],
            expected_item_versions: vec![],
            balance_delta: Some((buyer.id(), dec!(10))),
            expected_buyer_version: None,
        };
        store.commit(request.clone()).unwrap();

        let err = store.commit(request).unwrap_err();
        assert!(matches!(err, DomainError::ConcurrencyConflict(_)));
        // The balance was applied exactly once.
        assert_eq!(store.get_buyer(buyer.id()).unwrap().balance(), dec!(10));
    }
}
