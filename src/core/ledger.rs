//! Transaction recorder - Appends immutable payment rows to the ledger.
//!
//! [`record_payment`] is generic over [`ConnectionTrait`] so the lifecycle engine can
//! call it with its open [`sea_orm::DatabaseTransaction`]; the payment then commits or
//! rolls back together with the status change that caused it. This module has no
//! update or delete path: the ledger is append-only.

use crate::{
    core::status::PaymentType,
    entities::{Payment, payment},
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{QueryOrder, Set, prelude::*};
use tracing::{debug, info, instrument};

/// A payment about to be recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPayment {
    /// User the money comes from
    pub payer_id: i64,
    /// User the money goes to
    pub payee_id: i64,
    /// Advertisement that triggered the payment
    pub advertisement_id: Option<i64>,
    /// Amount in cents
    pub amount_cents: i64,
    /// Ledger entry kind
    pub payment_type: PaymentType,
    /// Client-supplied retry guard
    pub idempotency_key: Option<String>,
}

/// Appends a payment row and returns it.
///
/// # Errors
/// `Validation` for a negative amount, `Persistence` when the store rejects the
/// insert. Callers running inside a transaction must abort it on error.
#[instrument(skip(conn, payment), fields(payment_type = %payment.payment_type, amount_cents = payment.amount_cents))]
pub async fn record_payment<C>(conn: &C, payment: NewPayment) -> Result<payment::Model>
where
    C: ConnectionTrait,
{
    if payment.amount_cents < 0 {
        return Err(Error::validation(format!(
            "payment amount must not be negative, got {} cents",
            payment.amount_cents
        )));
    }

    let now = Utc::now();
    let row = payment::ActiveModel {
        payer_id: Set(payment.payer_id),
        payee_id: Set(payment.payee_id),
        advertisement_id: Set(payment.advertisement_id),
        paid_at: Set(now),
        amount_cents: Set(payment.amount_cents),
        payment_type: Set(payment.payment_type.as_str().to_string()),
        idempotency_key: Set(payment.idempotency_key),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    let recorded = row.insert(conn).await?;
    info!(
        "Recorded payment {} of {} cents from user {} to user {} (type '{}', ad {:?})",
        recorded.id,
        recorded.amount_cents,
        recorded.payer_id,
        recorded.payee_id,
        recorded.payment_type,
        recorded.advertisement_id
    );
    Ok(recorded)
}

/// Finds the payment recorded under an idempotency key, if any.
pub async fn find_by_idempotency_key<C>(conn: &C, key: &str) -> Result<Option<payment::Model>>
where
    C: ConnectionTrait,
{
    debug!("Looking up idempotency key '{key}'");
    Payment::find()
        .filter(payment::Column::IdempotencyKey.eq(key))
        .one(conn)
        .await
        .map_err(Into::into)
}

/// All payments tied to an advertisement, oldest first.
pub async fn payments_for_advertisement(
    db: &DatabaseConnection,
    advertisement_id: i64,
) -> Result<Vec<payment::Model>> {
    Payment::find()
        .filter(payment::Column::AdvertisementId.eq(advertisement_id))
        .order_by_asc(payment::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Number of payments of one type tied to an advertisement.
pub async fn count_payments(
    db: &DatabaseConnection,
    advertisement_id: i64,
    payment_type: PaymentType,
) -> Result<u64> {
    Payment::find()
        .filter(payment::Column::AdvertisementId.eq(advertisement_id))
        .filter(payment::Column::PaymentType.eq(payment_type.as_str()))
        .count(db)
        .await
        .map_err(Into::into)
}
