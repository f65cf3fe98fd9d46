//! Vehicle catalog - Descriptive attributes of listed vehicles.
//!
//! Vehicles are created by [`crate::core::listing::create_listing`] together with their
//! advertisement. Afterwards they only change through [`update_vehicle`], which is plain
//! field replacement with one hard rule: a sold vehicle is read-only.

use crate::{
    core::{finish, query::VehicleAdStatus, rules, user::Actor},
    entities::{Advertisement, Vehicle, advertisement, vehicle},
    errors::{Error, Result},
};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{DatabaseTransaction, Set, TransactionTrait, prelude::*};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

/// Descriptive attributes supplied when listing or editing a vehicle.
///
/// Every field defaults to empty so that absent input surfaces as a validation
/// error from [`rules::validate_vehicle`] rather than a decoding failure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VehicleDraft {
    /// Manufacturer
    pub make: String,
    /// Model name
    pub model: String,
    /// Year of manufacture
    pub year: i32,
    /// Asking price
    pub price: Decimal,
    /// Fuel type
    pub fuel_type: String,
    /// Odometer reading in kilometres
    pub mileage_km: i64,
    /// Body type
    pub body_type: String,
    /// Engine power in kilowatts
    pub power_kw: f64,
    /// Condition
    pub condition: String,
    /// Free-form description
    pub description: String,
    /// Image references
    pub images: Vec<String>,
    /// Location
    pub location: String,
    /// Climate control kind
    pub climate_control: String,
    /// Transmission kind
    pub transmission: String,
    /// Whether the vehicle is damaged
    pub damaged: bool,
    /// Emissions class
    pub emission_class: String,
    /// Engine displacement in cubic centimetres
    pub displacement_cc: i32,
}

impl VehicleDraft {
    /// Builds an insertable row. `price_cents` must come from validation.
    pub(crate) fn into_new_vehicle(
        self,
        price_cents: i64,
        now: DateTime<Utc>,
    ) -> vehicle::ActiveModel {
        let mut active = vehicle::ActiveModel {
            created_at: Set(now),
            deleted_at: Set(None),
            ..Default::default()
        };
        self.apply_to(&mut active, price_cents, now);
        active
    }

    fn apply_to(self, active: &mut vehicle::ActiveModel, price_cents: i64, now: DateTime<Utc>) {
        active.make = Set(self.make.trim().to_string());
        active.model_name = Set(self.model.trim().to_string());
        active.year = Set(self.year);
        active.price_cents = Set(price_cents);
        active.fuel_type = Set(self.fuel_type.trim().to_string());
        active.mileage_km = Set(self.mileage_km);
        active.body_type = Set(self.body_type.trim().to_string());
        active.power_kw = Set(self.power_kw);
        active.condition = Set(self.condition.trim().to_string());
        active.description = Set(self.description);
        active.images = Set(join_images(&self.images));
        active.location = Set(self.location.trim().to_string());
        active.climate_control = Set(self.climate_control.trim().to_string());
        active.transmission = Set(self.transmission.trim().to_string());
        active.damaged = Set(self.damaged);
        active.emission_class = Set(self.emission_class.trim().to_string());
        active.displacement_cc = Set(self.displacement_cc);
        active.updated_at = Set(now);
    }
}

fn join_images(images: &[String]) -> String {
    images
        .iter()
        .map(|image| image.trim())
        .filter(|image| !image.is_empty())
        .collect::<Vec<_>>()
        .join(",")
}

/// Splits the stored image list back into references.
#[must_use]
pub fn image_refs(vehicle: &vehicle::Model) -> Vec<String> {
    vehicle
        .images
        .split(',')
        .filter(|image| !image.is_empty())
        .map(str::to_string)
        .collect()
}

/// A vehicle together with the derived status of its advertisement.
#[derive(Debug, Clone, Serialize)]
pub struct VehicleDetail {
    /// The stored vehicle
    pub vehicle: vehicle::Model,
    /// Read-side view of its listing
    pub ad_status: VehicleAdStatus,
}

/// Loads a vehicle that has not been soft-deleted.
pub async fn get_active_vehicle<C>(conn: &C, vehicle_id: i64) -> Result<vehicle::Model>
where
    C: ConnectionTrait,
{
    Vehicle::find_by_id(vehicle_id)
        .filter(vehicle::Column::DeletedAt.is_null())
        .one(conn)
        .await?
        .ok_or(Error::NotFound {
            entity: "vehicle",
            id: vehicle_id,
        })
}

/// Reads a vehicle and projects its listing status without touching the stored rows.
pub async fn get_vehicle(
    db: &DatabaseConnection,
    vehicle_id: i64,
    today: NaiveDate,
) -> Result<VehicleDetail> {
    let vehicle = get_active_vehicle(db, vehicle_id).await?;
    let ad = Advertisement::find()
        .filter(advertisement::Column::VehicleId.eq(vehicle_id))
        .filter(advertisement::Column::DeletedAt.is_null())
        .one(db)
        .await?;
    let ad_status = VehicleAdStatus::project(ad.as_ref(), today)?;
    Ok(VehicleDetail { vehicle, ad_status })
}

/// Replaces the descriptive attributes of a vehicle.
///
/// # Errors
/// - `NotFound` if the vehicle is missing or deleted
/// - `Conflict` if its advertisement is sold, regardless of who asks
/// - `Authorization` unless the actor is the seller of record or an administrator
/// - `Validation` for the same input rules as listing creation
#[instrument(skip(db, draft), fields(actor_id = actor.id))]
pub async fn update_vehicle(
    db: &DatabaseConnection,
    vehicle_id: i64,
    actor: &Actor,
    draft: VehicleDraft,
) -> Result<vehicle::Model> {
    let price_cents = rules::validate_vehicle(&draft)?;

    let txn = db.begin().await?;
    let outcome = replace_fields(&txn, vehicle_id, actor, draft, price_cents).await;
    let updated = finish(txn, outcome).await?;

    info!("Updated vehicle {}", updated.id);
    Ok(updated)
}

async fn replace_fields(
    txn: &DatabaseTransaction,
    vehicle_id: i64,
    actor: &Actor,
    draft: VehicleDraft,
    price_cents: i64,
) -> Result<vehicle::Model> {
    let vehicle = get_active_vehicle(txn, vehicle_id).await?;
    let ad = Advertisement::find()
        .filter(advertisement::Column::VehicleId.eq(vehicle_id))
        .one(txn)
        .await?;

    match &ad {
        Some(ad) => {
            rules::ensure_vehicle_mutable(rules::parse_status(ad)?)?;
            rules::ensure_seller_or_admin(ad, actor)?;
        }
        None => rules::ensure_admin(actor)?,
    }

    let mut active: vehicle::ActiveModel = vehicle.into();
    draft.apply_to(&mut active, price_cents, Utc::now());
    active.update(txn).await.map_err(Into::into)
}
