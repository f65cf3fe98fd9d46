//! Core business logic - framework-agnostic listing lifecycle, ledger and reporting.
//!
//! Every operation takes the database handle and, where needed, the
//! [`crate::config::MarketSettings`] explicitly. Nothing here reads global state.

/// Advertisement lifecycle engine: create, feature, purchase, withdraw
pub mod listing;
/// Transaction recorder for the append-only payment ledger
pub mod ledger;
/// Decimal amounts to and from stored cents
pub mod money;
/// Read-side projections and listing queries
pub mod query;
/// Payment reporting for administrators and payers
pub mod report;
/// Shared validation and invariant checks
pub mod rules;
/// Closed enums for status, payment type and role
pub mod status;
/// Actor resolution and user lookups
pub mod user;
/// Vehicle catalog
pub mod vehicle;

use crate::errors::Result;
use sea_orm::DatabaseTransaction;
use tracing::error;

/// Commits `txn` when `outcome` succeeded and rolls it back otherwise.
///
/// The rollback is explicit so the connection is clean before the error reaches
/// the caller.
pub(crate) async fn finish<T>(txn: DatabaseTransaction, outcome: Result<T>) -> Result<T> {
    match outcome {
        Ok(value) => {
            txn.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = txn.rollback().await {
                error!("Rollback failed after '{err}': {rollback_err}");
            }
            Err(err)
        }
    }
}
