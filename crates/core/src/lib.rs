//! `stockbook-core` — domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod decimal;
pub mod error;
pub mod id;
pub mod session;
pub mod version;

pub use decimal::{round_money, round_quantity};
pub use error::{DomainError, DomainResult, ReturnLimit};
pub use id::{BuyerId, InventoryItemId, TransactionId, UserId};
pub use session::SessionContext;
pub use version::ExpectedVersion;
