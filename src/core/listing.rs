//! Advertisement lifecycle engine.
//!
//! This is the only module that changes an advertisement's status. The state machine is
//!
//! ```text
//! CreateListing -> Standard --Feature--> Featured
//!                     |                     |
//!                     +------Purchase-------+--> Sold (terminal)
//! ```
//!
//! Feature and purchase run as a single database transaction covering the status
//! write and the ledger entry from [`crate::core::ledger`]. The status write is a
//! conditional update (`... WHERE status <> 'sold' AND buyer_id IS NULL`), so of two
//! racing purchases only the first to commit changes a row; the other sees zero
//! affected rows and gets a `Conflict`.

use crate::{
    config::MarketSettings,
    core::{
        finish,
        ledger::{self, NewPayment},
        rules,
        status::{AdStatus, PaymentType},
        user::{self, Actor},
        vehicle::{self as catalog, VehicleDraft},
    },
    entities::{Advertisement, Vehicle, advertisement, vehicle},
    errors::{Error, Result},
};
use chrono::{Days, NaiveDate, Utc};
use sea_orm::{
    DatabaseTransaction,
    Set,
    TransactionTrait,
    prelude::*,
    sea_query::{Expr, SimpleExpr},
};
use serde::Serialize;
use tracing::{error, info, instrument, warn};

/// Result of [`create_listing`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreatedListing {
    /// The persisted vehicle
    pub vehicle: vehicle::Model,
    /// Its advertisement, in `standard` status
    pub advertisement: advertisement::Model,
}

fn days_after(today: NaiveDate, days: i64) -> Result<NaiveDate> {
    u64::try_from(days)
        .ok()
        .and_then(|days| today.checked_add_days(Days::new(days)))
        .ok_or_else(|| Error::Config {
            message: format!("cannot add {days} days to {today}"),
        })
}

/// Loads an advertisement that has not been withdrawn.
pub async fn get_active_advertisement<C>(conn: &C, ad_id: i64) -> Result<advertisement::Model>
where
    C: ConnectionTrait,
{
    Advertisement::find_by_id(ad_id)
        .filter(advertisement::Column::DeletedAt.is_null())
        .one(conn)
        .await?
        .ok_or(Error::NotFound {
            entity: "advertisement",
            id: ad_id,
        })
}

/// Lists a vehicle: persists the vehicle, then a `standard` advertisement for it.
///
/// Both inserts share one transaction, so a failed advertisement insert leaves no
/// orphaned vehicle behind.
///
/// # Errors
/// `Validation` for bad vehicle input, `NotFound` if the seller does not exist,
/// `Persistence` if the store rejects either write.
#[instrument(skip(db, settings, draft))]
pub async fn create_listing(
    db: &DatabaseConnection,
    settings: &MarketSettings,
    draft: VehicleDraft,
    seller_id: i64,
) -> Result<CreatedListing> {
    let price_cents = rules::validate_vehicle(&draft)?;
    let today = Utc::now().date_naive();
    let expiration_date = days_after(today, settings.listing_days)?;

    let txn = db.begin().await?;
    let outcome = insert_listing(&txn, draft, price_cents, seller_id, today, expiration_date).await;
    let created = finish(txn, outcome).await?;

    info!(
        "Created advertisement {} for vehicle {} by seller {} (expires {})",
        created.advertisement.id, created.vehicle.id, seller_id, expiration_date
    );
    Ok(created)
}

async fn insert_listing(
    txn: &DatabaseTransaction,
    draft: VehicleDraft,
    price_cents: i64,
    seller_id: i64,
    today: NaiveDate,
    expiration_date: NaiveDate,
) -> Result<CreatedListing> {
    user::get_active_user(txn, seller_id).await?;

    let now = Utc::now();
    let vehicle = draft.into_new_vehicle(price_cents, now).insert(txn).await?;

    let advertisement = advertisement::ActiveModel {
        creation_date: Set(today),
        expiration_date: Set(expiration_date),
        featured_price_cents: Set(None),
        vehicle_id: Set(vehicle.id),
        seller_id: Set(seller_id),
        buyer_id: Set(None),
        status: Set(AdStatus::Standard.as_str().to_string()),
        sale_date: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        deleted_at: Set(None),
        ..Default::default()
    }
    .insert(txn)
    .await?;

    Ok(CreatedListing {
        vehicle,
        advertisement,
    })
}

/// Returns the current advertisement if `key` already produced the requested payment.
///
/// A key recorded for a different advertisement, payer or payment type is a conflict:
/// the client reused a key for a different request.
async fn replay_if_recorded(
    db: &DatabaseConnection,
    key: &str,
    ad_id: i64,
    payer_id: i64,
    payment_type: PaymentType,
) -> Result<Option<advertisement::Model>> {
    let Some(payment) = ledger::find_by_idempotency_key(db, key).await? else {
        return Ok(None);
    };

    let same_request = payment.advertisement_id == Some(ad_id)
        && payment.payer_id == payer_id
        && payment.payment_type == payment_type.as_str();
    if !same_request {
        warn!("Idempotency key '{key}' reused for a different operation");
        return Err(Error::conflict(
            "idempotency key was already used for a different operation",
        ));
    }

    info!("Replaying {payment_type} on advertisement {ad_id} for key '{key}'");
    get_active_advertisement(db, ad_id).await.map(Some)
}

/// Features a listing: `Standard -> Featured`, charging the fixed fee.
///
/// Sets `featured_price`, moves the expiration to today plus the featured window and
/// records a `featured_ad` payment from the seller to the system payee, all in one
/// transaction. On any failure nothing is written.
///
/// # Errors
/// - `NotFound` if the advertisement is missing or withdrawn
/// - `Authorization` unless the actor is the seller of record
/// - `Conflict` if the listing is already featured or sold
/// - `Persistence` if the store fails; the transition is rolled back
#[instrument(skip(db, settings, idempotency_key), fields(actor_id = actor.id))]
pub async fn feature_listing(
    db: &DatabaseConnection,
    settings: &MarketSettings,
    ad_id: i64,
    actor: &Actor,
    idempotency_key: Option<String>,
) -> Result<advertisement::Model> {
    let key = rules::normalize_idempotency_key(idempotency_key)?;
    if let Some(key) = &key {
        let replayed =
            replay_if_recorded(db, key, ad_id, actor.id, PaymentType::FeaturedAd).await?;
        if let Some(ad) = replayed {
            return Ok(ad);
        }
    }

    let fee_cents = settings.featured_fee_cents()?;
    let today = Utc::now().date_naive();
    let expiration_date = days_after(today, settings.featured_days)?;

    let txn = db.begin().await?;
    let outcome = apply_feature(
        &txn,
        settings,
        ad_id,
        actor,
        fee_cents,
        expiration_date,
        key,
    )
    .await;
    let featured = match finish(txn, outcome).await {
        Ok(featured) => featured,
        Err(Error::Persistence(cause)) => {
            return Err(explain_failed_feature(db, ad_id, cause).await);
        }
        Err(other) => {
            warn!("Feature of advertisement {ad_id} rejected: {other}");
            return Err(other);
        }
    };

    info!(
        "Advertisement {} featured by seller {} until {}",
        featured.id, actor.id, featured.expiration_date
    );
    Ok(featured)
}

async fn apply_feature(
    txn: &DatabaseTransaction,
    settings: &MarketSettings,
    ad_id: i64,
    actor: &Actor,
    fee_cents: i64,
    expiration_date: NaiveDate,
    idempotency_key: Option<String>,
) -> Result<advertisement::Model> {
    let ad = get_active_advertisement(txn, ad_id).await?;
    rules::ensure_seller(&ad, actor)?;
    rules::ensure_featurable(rules::parse_status(&ad)?)?;

    let updated = Advertisement::update_many()
        .col_expr(
            advertisement::Column::Status,
            Expr::value(AdStatus::Featured.as_str()),
        )
        .col_expr(
            advertisement::Column::FeaturedPriceCents,
            Expr::value(fee_cents),
        )
        .col_expr(
            advertisement::Column::ExpirationDate,
            Expr::value(expiration_date),
        )
        .col_expr(advertisement::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(advertisement::Column::Id.eq(ad_id))
        .filter(advertisement::Column::Status.is_in(AdStatus::standard_strings()))
        .filter(advertisement::Column::DeletedAt.is_null())
        .exec(txn)
        .await?;
    if updated.rows_affected == 0 {
        return Err(Error::conflict("advertisement is no longer standard"));
    }

    ledger::record_payment(
        txn,
        NewPayment {
            payer_id: actor.id,
            payee_id: settings.system_payee_id,
            advertisement_id: Some(ad_id),
            amount_cents: fee_cents,
            payment_type: PaymentType::FeaturedAd,
            idempotency_key,
        },
    )
    .await?;

    get_active_advertisement(txn, ad_id).await
}

/// Sells a listing: `{Standard, Featured} -> Sold`, paying the seller the vehicle price.
///
/// Sets the buyer and sale date and records a `purchase` payment from buyer to seller in
/// one transaction. The status write only succeeds while the row is unsold, which makes
/// it the linearization point between competing buyers.
///
/// # Errors
/// - `NotFound` if the advertisement, its vehicle or the buyer is missing
/// - `Conflict` for a self-purchase, an already sold listing, or (when
///   [`MarketSettings::purchase_requires_active`] is set) an expired one
/// - `Transaction` if the atomic unit failed; nothing was written
#[instrument(skip(db, settings, idempotency_key), fields(buyer_id = buyer.id))]
pub async fn purchase_listing(
    db: &DatabaseConnection,
    settings: &MarketSettings,
    ad_id: i64,
    buyer: &Actor,
    idempotency_key: Option<String>,
) -> Result<advertisement::Model> {
    let key = rules::normalize_idempotency_key(idempotency_key)?;
    if let Some(key) = &key {
        let replayed =
            replay_if_recorded(db, key, ad_id, buyer.id, PaymentType::Purchase).await?;
        if let Some(ad) = replayed {
            return Ok(ad);
        }
    }

    let today = Utc::now().date_naive();
    let txn = db.begin().await?;
    let outcome = apply_purchase(&txn, settings, ad_id, buyer, today, key).await;

    let sold = match finish(txn, outcome).await {
        Ok(sold) => sold,
        Err(Error::Persistence(cause)) => {
            return Err(explain_failed_purchase(db, ad_id, &cause).await);
        }
        Err(other) => {
            warn!("Purchase of advertisement {ad_id} rejected: {other}");
            return Err(other);
        }
    };

    info!(
        "Advertisement {} sold to buyer {} on {}",
        sold.id, buyer.id, today
    );
    Ok(sold)
}

async fn apply_purchase(
    txn: &DatabaseTransaction,
    settings: &MarketSettings,
    ad_id: i64,
    buyer: &Actor,
    today: NaiveDate,
    idempotency_key: Option<String>,
) -> Result<advertisement::Model> {
    let ad = get_active_advertisement(txn, ad_id).await?;
    let vehicle = catalog::get_active_vehicle(txn, ad.vehicle_id).await?;
    user::get_active_user(txn, buyer.id).await?;

    let status = rules::parse_status(&ad)?;
    rules::ensure_purchasable(&ad, status, buyer.id)?;
    if settings.purchase_requires_active && rules::is_expired(status, ad.expiration_date, today) {
        return Err(Error::conflict("advertisement has expired"));
    }

    let updated = Advertisement::update_many()
        .col_expr(
            advertisement::Column::Status,
            Expr::value(AdStatus::Sold.as_str()),
        )
        .col_expr(advertisement::Column::BuyerId, Expr::value(buyer.id))
        .col_expr(advertisement::Column::SaleDate, Expr::value(today))
        .col_expr(advertisement::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(advertisement::Column::Id.eq(ad_id))
        .filter(advertisement::Column::Status.ne(AdStatus::Sold.as_str()))
        .filter(advertisement::Column::BuyerId.is_null())
        .filter(advertisement::Column::DeletedAt.is_null())
        .exec(txn)
        .await?;
    if updated.rows_affected == 0 {
        return Err(Error::conflict("advertisement is already sold"));
    }

    ledger::record_payment(
        txn,
        NewPayment {
            payer_id: buyer.id,
            payee_id: ad.seller_id,
            advertisement_id: Some(ad_id),
            amount_cents: vehicle.price_cents,
            payment_type: PaymentType::Purchase,
            idempotency_key,
        },
    )
    .await?;

    get_active_advertisement(txn, ad_id).await
}

/// Re-reads an advertisement once any competing writer has finished.
///
/// The read runs in a fresh transaction that opens with a no-op write, so it waits on
/// the write lock (up to the pool's busy timeout) and then sees the committed row.
async fn reload_after_writers(
    db: &DatabaseConnection,
    ad_id: i64,
) -> Result<Option<advertisement::Model>> {
    let txn = db.begin().await?;
    let outcome = lock_and_read(&txn, ad_id).await;
    finish(txn, outcome).await
}

async fn lock_and_read(
    txn: &DatabaseTransaction,
    ad_id: i64,
) -> Result<Option<advertisement::Model>> {
    Advertisement::update_many()
        .col_expr(
            advertisement::Column::UpdatedAt,
            SimpleExpr::from(Expr::col(advertisement::Column::UpdatedAt)),
        )
        .filter(advertisement::Column::Id.eq(ad_id))
        .exec(txn)
        .await?;
    Ok(Advertisement::find_by_id(ad_id).one(txn).await?)
}

/// Classifies a store failure during a feature after the rollback.
///
/// A lock or snapshot error caused by a competing transition that has since
/// committed becomes a `Conflict`; anything else stays a `Persistence` error.
async fn explain_failed_feature(db: &DatabaseConnection, ad_id: i64, cause: DbErr) -> Error {
    let current = reload_after_writers(db, ad_id)
        .await
        .ok()
        .flatten()
        .and_then(|ad| rules::parse_status(&ad).ok());
    match current {
        Some(AdStatus::Featured) => {
            warn!("Feature of advertisement {ad_id} lost to a concurrent feature");
            Error::conflict("advertisement is already featured")
        }
        Some(AdStatus::Sold) => {
            warn!("Feature of advertisement {ad_id} lost to a concurrent sale");
            Error::conflict("advertisement is already sold")
        }
        _ => {
            error!("Feature of advertisement {ad_id} rolled back: {cause}");
            Error::Persistence(cause)
        }
    }
}

/// Classifies a store failure during a purchase after the rollback.
///
/// When another buyer committed first the store may report a lock or snapshot error
/// instead of zero affected rows; that loser still gets a `Conflict`.
async fn explain_failed_purchase(db: &DatabaseConnection, ad_id: i64, cause: &DbErr) -> Error {
    match reload_after_writers(db, ad_id).await {
        Ok(Some(ad)) if ad.buyer_id.is_some() => {
            warn!("Purchase of advertisement {ad_id} lost to buyer {:?}", ad.buyer_id);
            Error::conflict("advertisement is already sold")
        }
        _ => {
            error!("Purchase of advertisement {ad_id} rolled back: {cause}");
            Error::Transaction {
                message: cause.to_string(),
            }
        }
    }
}

/// Withdraws a listing: soft-deletes the advertisement and its vehicle.
///
/// # Errors
/// `NotFound` if already withdrawn, `Authorization` unless seller or administrator,
/// `Conflict` once sold (sold listings are part of the sales record).
#[instrument(skip(db), fields(actor_id = actor.id))]
pub async fn withdraw_listing(
    db: &DatabaseConnection,
    ad_id: i64,
    actor: &Actor,
) -> Result<advertisement::Model> {
    let txn = db.begin().await?;
    let outcome = apply_withdraw(&txn, ad_id, actor).await;
    let withdrawn = finish(txn, outcome).await?;

    info!("Advertisement {ad_id} withdrawn by user {}", actor.id);
    Ok(withdrawn)
}

async fn apply_withdraw(
    txn: &DatabaseTransaction,
    ad_id: i64,
    actor: &Actor,
) -> Result<advertisement::Model> {
    let ad = get_active_advertisement(txn, ad_id).await?;
    rules::ensure_seller_or_admin(&ad, actor)?;
    if rules::parse_status(&ad)? == AdStatus::Sold {
        return Err(Error::conflict("cannot withdraw a sold advertisement"));
    }

    let now = Utc::now();
    let updated = Advertisement::update_many()
        .col_expr(advertisement::Column::DeletedAt, Expr::value(now))
        .col_expr(advertisement::Column::UpdatedAt, Expr::value(now))
        .filter(advertisement::Column::Id.eq(ad_id))
        .filter(advertisement::Column::Status.ne(AdStatus::Sold.as_str()))
        .filter(advertisement::Column::DeletedAt.is_null())
        .exec(txn)
        .await?;
    if updated.rows_affected == 0 {
        return Err(Error::conflict("advertisement changed while withdrawing"));
    }

    Vehicle::update_many()
        .col_expr(vehicle::Column::DeletedAt, Expr::value(now))
        .col_expr(vehicle::Column::UpdatedAt, Expr::value(now))
        .filter(vehicle::Column::Id.eq(ad.vehicle_id))
        .exec(txn)
        .await?;

    Advertisement::find_by_id(ad_id)
        .one(txn)
        .await?
        .ok_or(Error::NotFound {
            entity: "advertisement",
            id: ad_id,
        })
}
