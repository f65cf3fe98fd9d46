//! Shared validation and invariant checks.
//!
//! Every precondition the lifecycle engine, vehicle catalog and read side agree on
//! lives here, so a rule is stated once and the error it produces is the same no
//! matter which operation trips it.

use crate::{
    core::{money, status::AdStatus, user::Actor, vehicle::VehicleDraft},
    entities::advertisement,
    errors::{Error, Result},
};
use chrono::{Datelike, NaiveDate, Utc};

/// Longest accepted idempotency key.
pub const MAX_IDEMPOTENCY_KEY_LEN: usize = 128;

/// Earliest plausible year of manufacture.
const FIRST_MODEL_YEAR: i32 = 1886;

/// Parses the stored status of an advertisement.
pub fn parse_status(ad: &advertisement::Model) -> Result<AdStatus> {
    ad.status.parse()
}

/// A listing is expired when it is still open but its last day has passed.
///
/// This is a derived view. The stored status is never changed by expiry.
#[must_use]
pub fn is_expired(status: AdStatus, expiration_date: NaiveDate, today: NaiveDate) -> bool {
    status.is_open() && expiration_date < today
}

/// Fails unless `actor` is the seller of record.
pub fn ensure_seller(ad: &advertisement::Model, actor: &Actor) -> Result<()> {
    if ad.seller_id == actor.id {
        Ok(())
    } else {
        Err(Error::unauthorized(format!(
            "user {} is not the seller of advertisement {}",
            actor.id, ad.id
        )))
    }
}

/// Fails unless `actor` is the seller of record or an administrator.
pub fn ensure_seller_or_admin(ad: &advertisement::Model, actor: &Actor) -> Result<()> {
    if actor.is_admin() {
        return Ok(());
    }
    ensure_seller(ad, actor)
}

/// Detail records are visible to the seller, the buyer and administrators only.
pub fn ensure_can_view(ad: &advertisement::Model, actor: &Actor) -> Result<()> {
    if actor.is_admin() || ad.seller_id == actor.id || ad.buyer_id == Some(actor.id) {
        Ok(())
    } else {
        Err(Error::unauthorized(format!(
            "user {} has no access to advertisement {}",
            actor.id, ad.id
        )))
    }
}

/// Fails unless `actor` is an administrator.
pub fn ensure_admin(actor: &Actor) -> Result<()> {
    if actor.is_admin() {
        Ok(())
    } else {
        Err(Error::unauthorized("administrator access required"))
    }
}

/// `Standard -> Featured` is the only legal feature transition.
pub fn ensure_featurable(status: AdStatus) -> Result<()> {
    match status {
        AdStatus::Standard => Ok(()),
        AdStatus::Featured => Err(Error::conflict("advertisement is already featured")),
        AdStatus::Sold => Err(Error::conflict("advertisement is already sold")),
    }
}

/// Checks the purchase preconditions that depend on the stored row.
pub fn ensure_purchasable(
    ad: &advertisement::Model,
    status: AdStatus,
    buyer_id: i64,
) -> Result<()> {
    if ad.seller_id == buyer_id {
        return Err(Error::conflict("cannot buy own listing"));
    }
    if status == AdStatus::Sold || ad.buyer_id.is_some() {
        return Err(Error::conflict("advertisement is already sold"));
    }
    Ok(())
}

/// Vehicle details become read-only once the listing is sold.
pub fn ensure_vehicle_mutable(status: AdStatus) -> Result<()> {
    if status == AdStatus::Sold {
        Err(Error::conflict("cannot modify sold vehicle"))
    } else {
        Ok(())
    }
}

/// Trims and bounds a client-supplied idempotency key. Blank keys count as absent.
pub fn normalize_idempotency_key(key: Option<String>) -> Result<Option<String>> {
    let Some(key) = key else {
        return Ok(None);
    };
    let trimmed = key.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    if trimmed.len() > MAX_IDEMPOTENCY_KEY_LEN {
        return Err(Error::validation(format!(
            "idempotency key must be at most {MAX_IDEMPOTENCY_KEY_LEN} characters"
        )));
    }
    Ok(Some(trimmed.to_string()))
}

/// Validates the descriptive attributes of a vehicle and returns its price in cents.
pub fn validate_vehicle(draft: &VehicleDraft) -> Result<i64> {
    let required = [
        ("make", &draft.make),
        ("model", &draft.model),
        ("fuel_type", &draft.fuel_type),
        ("body_type", &draft.body_type),
        ("condition", &draft.condition),
        ("location", &draft.location),
        ("climate_control", &draft.climate_control),
        ("transmission", &draft.transmission),
        ("emission_class", &draft.emission_class),
    ];
    if let Some((field, _)) = required.iter().find(|(_, value)| value.trim().is_empty()) {
        return Err(Error::validation(format!("{field} is required")));
    }

    let latest_year = Utc::now().year() + 1;
    if !(FIRST_MODEL_YEAR..=latest_year).contains(&draft.year) {
        return Err(Error::validation(format!(
            "year must be between {FIRST_MODEL_YEAR} and {latest_year}, got {}",
            draft.year
        )));
    }
    if draft.mileage_km < 0 {
        return Err(Error::validation("mileage_km must not be negative"));
    }
    if !draft.power_kw.is_finite() || draft.power_kw < 0.0 {
        return Err(Error::validation("power_kw must be a non-negative number"));
    }
    if draft.displacement_cc < 0 {
        return Err(Error::validation("displacement_cc must not be negative"));
    }
    if draft.images.iter().any(|image| image.contains(',')) {
        return Err(Error::validation("image references must not contain commas"));
    }

    let price_cents = money::to_cents(draft.price)?;
    if price_cents == 0 {
        return Err(Error::validation("price must be greater than zero"));
    }
    Ok(price_cents)
}
