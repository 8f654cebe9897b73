//! Storage abstraction.

use rust_decimal::Decimal;

use stockbook_buyers::BuyerAccount;
use stockbook_core::{
    BuyerId, DomainResult, ExpectedVersion, InventoryItemId, TransactionId, UserId,
};
use stockbook_inventory::InventoryItem;
use stockbook_ledger::{StockDelta, Transaction};

/// One atomic write: the transaction record plus every side effect it
/// carries. A store must apply all of it or none of it; a failure between
/// the transaction write and its side effects is a partial commit and must
/// surface as [`stockbook_core::DomainError::PartialCommitFailure`].
#[derive(Debug, Clone)]
pub struct CommitRequest {
    pub transaction: Transaction,
    /// Version the transaction record is expected to have in the store
    /// (0 when it must not exist yet).
    pub expected_transaction_version: ExpectedVersion,
    pub stock_deltas: Vec<StockDelta>,
    /// Versions the affected inventory items were read at; a mismatch at
    /// commit time means a concurrent write landed in between.
    pub expected_item_versions: Vec<(InventoryItemId, ExpectedVersion)>,
    pub balance_delta: Option<(BuyerId, Decimal)>,
    pub expected_buyer_version: Option<ExpectedVersion>,
}

impl CommitRequest {
    pub fn expected_item_version(&self, id: InventoryItemId) -> ExpectedVersion {
        self.expected_item_versions
            .iter()
            .find(|(item_id, _)| *item_id == id)
            .map(|(_, v)| *v)
            .unwrap_or(ExpectedVersion::Any)
    }
}

/// Persistence seam for the ledger core.
///
/// Concurrent sales against the same item and concurrent edits of the same
/// transaction are serialized through the version expectations in
/// [`CommitRequest`]; implementations reject stale writes with
/// `ConcurrencyConflict`.
pub trait LedgerStore: Send + Sync {
    fn insert_item(&self, item: InventoryItem) -> DomainResult<()>;
    fn get_item(&self, id: InventoryItemId) -> DomainResult<InventoryItem>;

    fn insert_buyer(&self, buyer: BuyerAccount) -> DomainResult<()>;
    fn get_buyer(&self, id: BuyerId) -> DomainResult<BuyerAccount>;

    fn get_transaction(&self, id: TransactionId) -> DomainResult<Transaction>;
    /// All transactions recorded for a seller, in insertion order.
    fn transactions_for_user(&self, user_id: UserId) -> DomainResult<Vec<Transaction>>;

    /// Apply one atomic write and return the stored transaction.
    fn commit(&self, request: CommitRequest) -> DomainResult<Transaction>;
}
