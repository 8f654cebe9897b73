use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use stockbook_core::{BuyerId, DomainError, DomainResult, InventoryItemId, TransactionId, UserId};

/// Partial-unit multiplier applied to a line's quantity.
///
/// Only full, half, and quarter units exist in the domain; anything else is
/// unrepresentable by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Measurement {
    Full,
    Half,
    Quarter,
}

impl Measurement {
    pub fn fraction(self) -> Decimal {
        match self {
            Measurement::Full => Decimal::ONE,
            Measurement::Half => Decimal::new(5, 1),
            Measurement::Quarter => Decimal::new(25, 2),
        }
    }

    /// Parse a raw fraction (1, 0.5, 0.25) as recorded by older clients.
    pub fn from_fraction(value: Decimal) -> DomainResult<Self> {
        if value == Decimal::ONE {
            Ok(Measurement::Full)
        } else if value == Decimal::new(5, 1) {
            Ok(Measurement::Half)
        } else if value == Decimal::new(25, 2) {
            Ok(Measurement::Quarter)
        } else {
            Err(DomainError::invalid_input(format!(
                "measurement must be 1, 0.5 or 0.25 (got {value})"
            )))
        }
    }
}

/// Discriminator of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Sale,
    Return,
    Restock,
    InventoryAddition,
    Payment,
}

impl core::fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let s = match self {
            TransactionKind::Sale => "sale",
            TransactionKind::Return => "return",
            TransactionKind::Restock => "restock",
            TransactionKind::InventoryAddition => "inventory_addition",
            TransactionKind::Payment => "payment",
        };
        f.write_str(s)
    }
}

impl TransactionKind {
    /// Kinds whose line totals are valued at sale price and carry profit.
    pub fn is_trade(self) -> bool {
        matches!(self, TransactionKind::Sale | TransactionKind::Return)
    }

    /// Kinds that increase stock and re-derive the standing shipping rate.
    pub fn is_stock_intake(self) -> bool {
        matches!(
            self,
            TransactionKind::Restock | TransactionKind::InventoryAddition
        )
    }
}

/// One line of a transaction, always recorded in the inventory item's
/// native unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionItem {
    /// Line identity, referenced by returns against this line.
    pub line_id: Uuid,
    pub item_id: InventoryItemId,
    pub name: String,
    pub quantity: Decimal,
    pub measurement: Measurement,
    pub unit: String,
    /// Purchase (cost) price per unit.
    pub unit_price: Decimal,
    /// Sale price per unit; zero for stock-intake kinds.
    pub sale_price: Decimal,
    pub shipping_per_unit: Decimal,
    /// For return lines: the sale line being returned against.
    pub original_sale_line: Option<Uuid>,
}

impl TransactionItem {
    /// Quantity after the measurement fraction is applied.
    pub fn effective_quantity(&self) -> Decimal {
        self.quantity * self.measurement.fraction()
    }
}

/// Direction of a standalone payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentDirection {
    Received,
    Given,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentDetails {
    pub amount: Decimal,
    pub direction: PaymentDirection,
    pub method: Option<String>,
}

/// Aggregates for sale/return transactions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TradeTotals {
    /// Cost aggregate (quantity-weighted purchase price).
    pub price: Decimal,
    pub sale_price: Decimal,
    pub total_shipping: Decimal,
    pub profit: Decimal,
}

/// Aggregates for restock/inventory-addition transactions (no profit).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StockTotals {
    pub price: Decimal,
    pub total_shipping: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaleBody {
    pub buyer_id: BuyerId,
    pub items: Vec<TransactionItem>,
    pub totals: TradeTotals,
    /// Payment settled together with the sale, if any.
    pub payment: Option<PaymentDetails>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnBody {
    pub buyer_id: BuyerId,
    pub original_sale_id: TransactionId,
    pub items: Vec<TransactionItem>,
    pub totals: TradeTotals,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockBody {
    /// Attached buyer, if the intake doubles as a sale to them.
    pub buyer_id: Option<BuyerId>,
    pub items: Vec<TransactionItem>,
    pub totals: StockTotals,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentBody {
    pub buyer_id: BuyerId,
    pub payment: PaymentDetails,
}

/// Kind-specific transaction payload.
///
/// Each kind's required fields are enforced at the type level; a payment has
/// no line items and a sale always has a buyer, by construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransactionBody {
    Sale(SaleBody),
    Return(ReturnBody),
    Restock(StockBody),
    InventoryAddition(StockBody),
    Payment(PaymentBody),
}

impl TransactionBody {
    pub fn kind(&self) -> TransactionKind {
        match self {
            TransactionBody::Sale(_) => TransactionKind::Sale,
            TransactionBody::Return(_) => TransactionKind::Return,
            TransactionBody::Restock(_) => TransactionKind::Restock,
            TransactionBody::InventoryAddition(_) => TransactionKind::InventoryAddition,
            TransactionBody::Payment(_) => TransactionKind::Payment,
        }
    }

    pub fn buyer_id(&self) -> Option<BuyerId> {
        match self {
            TransactionBody::Sale(b) => Some(b.buyer_id),
            TransactionBody::Return(b) => Some(b.buyer_id),
            TransactionBody::Restock(b) | TransactionBody::InventoryAddition(b) => b.buyer_id,
            TransactionBody::Payment(b) => Some(b.buyer_id),
        }
    }

    /// Line items; empty for payments.
    pub fn items(&self) -> &[TransactionItem] {
        match self {
            TransactionBody::Sale(b) => &b.items,
            TransactionBody::Return(b) => &b.items,
            TransactionBody::Restock(b) | TransactionBody::InventoryAddition(b) => &b.items,
            TransactionBody::Payment(_) => &[],
        }
    }

    pub fn total_shipping(&self) -> Decimal {
        match self {
            TransactionBody::Sale(b) => b.totals.total_shipping,
            TransactionBody::Return(b) => b.totals.total_shipping,
            TransactionBody::Restock(b) | TransactionBody::InventoryAddition(b) => {
                b.totals.total_shipping
            }
            TransactionBody::Payment(_) => Decimal::ZERO,
        }
    }

    pub fn sale_price(&self) -> Option<Decimal> {
        match self {
            TransactionBody::Sale(b) => Some(b.totals.sale_price),
            TransactionBody::Return(b) => Some(b.totals.sale_price),
            _ => None,
        }
    }

    pub fn profit(&self) -> Option<Decimal> {
        match self {
            TransactionBody::Sale(b) => Some(b.totals.profit),
            TransactionBody::Return(b) => Some(b.totals.profit),
            _ => None,
        }
    }

    pub fn price(&self) -> Option<Decimal> {
        match self {
            TransactionBody::Sale(b) => Some(b.totals.price),
            TransactionBody::Return(b) => Some(b.totals.price),
            TransactionBody::Restock(b) | TransactionBody::InventoryAddition(b) => {
                Some(b.totals.price)
            }
            TransactionBody::Payment(_) => None,
        }
    }
}

/// Immutable record appended to `prev_values` on every edit.
///
/// Entries are never mutated or removed; the most recent entry is the state
/// immediately prior to the last edit, so the chain replays every historical
/// state of the transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditHistoryEntry {
    pub updated_at: DateTime<Utc>,
    pub original_items: Vec<TransactionItem>,
    pub original_total_shipping: Decimal,
}

/// A posted ledger entry.
///
/// Immutable once committed except through the edit path, which appends the
/// prior state to `prev_values` before applying new values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub user_id: UserId,
    #[serde(flatten)]
    pub body: TransactionBody,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub edited: bool,
    /// Ordered, append-only prior-state snapshots. Always a sequence, never
    /// a bare object, regardless of how many edits occurred.
    pub prev_values: Vec<EditHistoryEntry>,
    pub version: u64,
}

impl Transaction {
    pub fn kind(&self) -> TransactionKind {
        self.body.kind()
    }

    pub fn buyer_id(&self) -> Option<BuyerId> {
        self.body.buyer_id()
    }

    pub fn items(&self) -> &[TransactionItem] {
        self.body.items()
    }
}
