//! Domain error model.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::id::InventoryItemId;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Which return-validation rule rejected a return request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnLimit {
    /// The request exceeds the quantity sold on the originating sale line.
    SaleQuantity,
    /// The request exceeds what remains returnable for the buyer+item pair.
    AvailableToReturn,
}

impl core::fmt::Display for ReturnLimit {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ReturnLimit::SaleQuantity => {
                write!(f, "exceeds this transaction's sold quantity")
            }
            ReturnLimit::AvailableToReturn => {
                write!(f, "exceeds total available to return")
            }
        }
    }
}

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures (validation,
/// invariants, conflicts). Infrastructure concerns belong elsewhere.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (e.g. non-positive quantity, empty lines).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A buyer, item, or transaction reference did not resolve.
    #[error("not found: {0}")]
    NotFound(String),

    /// A sale requested more than the item's on-hand quantity.
    #[error("insufficient stock for item {item}: requested {requested}, available {available}")]
    InsufficientStock {
        item: InventoryItemId,
        requested: Decimal,
        available: Decimal,
    },

    /// A return request was rejected by the return validator.
    #[error("return rejected: {0}")]
    ReturnExceedsLimit(ReturnLimit),

    /// An optimistic version check failed during a write.
    #[error("concurrency conflict: {0}")]
    ConcurrencyConflict(String),

    /// A write failed after partial persistence. Not retryable; requires
    /// manual reconciliation by an operator.
    #[error("partial commit failure: {0}")]
    PartialCommitFailure(String),
}

impl DomainError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::ConcurrencyConflict(msg.into())
    }

    pub fn partial_commit(msg: impl Into<String>) -> Self {
        Self::PartialCommitFailure(msg.into())
    }

    /// Whether a caller may retry the operation with corrected input.
    ///
    /// Everything except a partial commit is recoverable at the caller's
    /// discretion.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::PartialCommitFailure(_))
    }
}
