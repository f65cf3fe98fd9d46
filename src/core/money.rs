//! Conversion between decimal amounts and stored minor units.
//!
//! Amounts travel as [`Decimal`] through configuration and the HTTP API and are
//! persisted as whole cents, so arithmetic on the ledger never touches floats.

use crate::errors::{Error, Result};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

/// Converts a decimal amount to cents.
///
/// Rejects negative amounts and amounts with more than two fractional digits.
pub fn to_cents(amount: Decimal) -> Result<i64> {
    if amount < Decimal::ZERO {
        return Err(Error::validation(format!(
            "amount must not be negative, got {amount}"
        )));
    }
    let normalized = amount.normalize();
    if normalized.scale() > 2 {
        return Err(Error::validation(format!(
            "amount must have at most two decimal places, got {amount}"
        )));
    }
    (normalized * Decimal::ONE_HUNDRED)
        .to_i64()
        .ok_or_else(|| Error::validation(format!("amount {amount} is out of range")))
}

/// Converts cents back to a two-place decimal amount.
#[must_use]
pub fn from_cents(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}
