//! `stockbook-inventory` — inventory items and measurement-unit conversion.

pub mod item;
pub mod units;

pub use item::{InventoryItem, NewInventoryItem};
pub use units::{UnitAmounts, convert};
