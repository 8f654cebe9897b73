use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stockbook_core::{BuyerId, DomainError, DomainResult, InventoryItemId, UserId, round_money};

/// An inventory item owned by a seller, optionally scoped to one buyer.
///
/// Items are never physically deleted; a "removed" item is zeroed out and
/// kept so historical transactions keep resolving.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryItem {
    id: InventoryItemId,
    owner_id: UserId,
    buyer_id: Option<BuyerId>,
    name: String,
    reference_number: Option<String>,
    category: Option<String>,
    /// Unit of measure the item is recorded in (e.g. "kg", "gram", "piece").
    unit: String,
    /// Quantity on hand, in `unit`. Never negative after a committed transaction.
    quantity: Decimal,
    /// Purchase price per unit.
    unit_price: Decimal,
    /// Standing shipping cost per unit, re-derived on restock/addition.
    shipping_cost: Decimal,
    product_type: Option<String>,
    created_at: DateTime<Utc>,
    /// Bumped on every committed mutation (optimistic concurrency).
    version: u64,
}

/// Attributes for registering a new inventory item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewInventoryItem {
    pub owner_id: UserId,
    pub buyer_id: Option<BuyerId>,
    pub name: String,
    pub reference_number: Option<String>,
    pub category: Option<String>,
    pub unit: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub shipping_cost: Decimal,
    pub product_type: Option<String>,
}

impl InventoryItem {
    pub fn register(id: InventoryItemId, attrs: NewInventoryItem, now: DateTime<Utc>) -> DomainResult<Self> {
        if attrs.name.trim().is_empty() {
            return Err(DomainError::invalid_input("item name cannot be empty"));
        }
        if attrs.unit.trim().is_empty() {
            return Err(DomainError::invalid_input("item unit cannot be empty"));
        }
        if attrs.quantity.is_sign_negative() {
            return Err(DomainError::invalid_input("item quantity cannot be negative"));
        }
        Ok(Self {
            id,
            owner_id: attrs.owner_id,
            buyer_id: attrs.buyer_id,
            name: attrs.name,
            reference_number: attrs.reference_number,
            category: attrs.category,
            unit: attrs.unit,
            quantity: attrs.quantity,
            unit_price: attrs.unit_price,
            shipping_cost: round_money(attrs.shipping_cost),
            product_type: attrs.product_type,
            created_at: now,
            version: 1,
        })
    }

    pub fn id(&self) -> InventoryItemId {
        self.id
    }

    pub fn owner_id(&self) -> UserId {
        self.owner_id
    }

    pub fn buyer_id(&self) -> Option<BuyerId> {
        self.buyer_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    pub fn quantity(&self) -> Decimal {
        self.quantity
    }

    pub fn unit_price(&self) -> Decimal {
        self.unit_price
    }

    pub fn shipping_cost(&self) -> Decimal {
        self.shipping_cost
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Apply a signed stock delta in the item's native unit.
    ///
    /// Rejects any delta that would take the quantity below zero.
    pub fn apply_stock_delta(&mut self, delta: Decimal) -> DomainResult<()> {
        let next = self.quantity + delta;
        if next.is_sign_negative() {
            return Err(DomainError::InsufficientStock {
                item: self.id,
                requested: -delta,
                available: self.quantity,
            });
        }
        self.quantity = next;
        self.version += 1;
        Ok(())
    }

    /// Replace the standing per-unit shipping cost (restock/addition path).
    pub fn set_shipping_cost(&mut self, per_unit: Decimal) {
        self.shipping_cost = round_money(per_unit);
        self.version += 1;
    }

    /// Soft-delete: zero the quantity but keep the record for history.
    pub fn zero_out(&mut self) {
        self.quantity = Decimal::ZERO;
        self.version += 1;
    }
}
