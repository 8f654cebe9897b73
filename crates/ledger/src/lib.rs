//! `stockbook-ledger` — the transaction and reconciliation core.
//!
//! Turns a set of line items into a consistent ledger entry: allocates shared
//! shipping across heterogeneous units, converts display units back to each
//! item's native unit, values lines, validates returns against prior sales,
//! computes buyer balance deltas, and maintains a tamper-evident edit history.

pub mod balance;
pub mod builder;
pub mod edit;
pub mod returns;
pub mod shipping;
pub mod transaction;
pub mod valuation;

pub use balance::balance_delta;
pub use builder::{BuildOutcome, CreateTransactionInput, LineInput, StockDelta, build};
pub use edit::{EditOutcome, apply_edit, items_before_edit};
pub use returns::validate_return;
pub use shipping::allocate;
pub use transaction::{
    EditHistoryEntry, Measurement, PaymentBody, PaymentDetails, PaymentDirection, ReturnBody,
    SaleBody, StockBody, StockTotals, TradeTotals, Transaction, TransactionBody, TransactionItem,
    TransactionKind,
};
pub use valuation::{Aggregates, LineValue, aggregate, value_line};
