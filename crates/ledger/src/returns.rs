//! Return validation.
//!
//! Pure and side-effect-free: the cumulative available-to-return balance is
//! aggregated by the caller (over all prior sales and returns for the
//! buyer+item pair) and passed in.

use rust_decimal::Decimal;

use stockbook_core::{DomainError, DomainResult, ReturnLimit};

use crate::transaction::{Measurement, TransactionItem};

/// Validate a candidate return against the originating sale line.
///
/// Rules, applied in order:
/// 1. the effective requested quantity must not exceed what the originating
///    sale line sold;
/// 2. it must not exceed what remains returnable once prior returns for the
///    same buyer+item are subtracted from total historical sales.
///
/// Quantities must already be in the sale line's native unit.
pub fn validate_return(
    requested_quantity: Decimal,
    measurement: Measurement,
    originating_sale_line: &TransactionItem,
    available_to_return: Decimal,
) -> DomainResult<()> {
    if requested_quantity <= Decimal::ZERO {
        return Err(DomainError::invalid_input(
            "return quantity must be positive",
        ));
    }

    let requested = requested_quantity * measurement.fraction();

    if requested > originating_sale_line.effective_quantity() {
        return Err(DomainError::ReturnExceedsLimit(ReturnLimit::SaleQuantity));
    }

    if requested > available_to_return {
        return Err(DomainError::ReturnExceedsLimit(
            ReturnLimit::AvailableToReturn,
        ));
    }

    Ok(())
}
