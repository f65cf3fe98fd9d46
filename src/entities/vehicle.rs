//! Vehicle entity - The item being advertised and sold.
//!
//! A vehicle is created together with its advertisement and is owned by exactly
//! one advertisement. Prices are stored in minor currency units (cents).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Vehicle database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "vehicles")]
pub struct Model {
    /// Unique identifier for the vehicle
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Manufacturer (e.g., "Volkswagen")
    pub make: String,
    /// Model name (e.g., "Golf")
    pub model_name: String,
    /// Year of manufacture
    pub year: i32,
    /// Listed price in cents
    pub price_cents: i64,
    /// Fuel type (e.g., "diesel")
    pub fuel_type: String,
    /// Odometer reading in kilometres
    pub mileage_km: i64,
    /// Body type (e.g., "hatchback")
    pub body_type: String,
    /// Engine power in kilowatts
    pub power_kw: f64,
    /// Condition (e.g., "used")
    pub condition: String,
    /// Free-form description
    #[sea_orm(column_type = "Text")]
    pub description: String,
    /// Comma-separated image references
    #[sea_orm(column_type = "Text")]
    pub images: String,
    /// Where the vehicle can be seen
    pub location: String,
    /// Climate control kind (e.g., "automatic")
    pub climate_control: String,
    /// Transmission kind (e.g., "manual")
    pub transmission: String,
    /// Whether the vehicle is damaged
    pub damaged: bool,
    /// Emissions class (e.g., "Euro 6")
    pub emission_class: String,
    /// Engine displacement in cubic centimetres
    pub displacement_cc: i32,
    /// When the vehicle was created
    pub created_at: DateTimeUtc,
    /// When the vehicle was last modified
    pub updated_at: DateTimeUtc,
    /// Soft delete marker
    pub deleted_at: Option<DateTimeUtc>,
}

/// Defines relationships between Vehicle and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// A vehicle is listed by one advertisement
    #[sea_orm(has_one = "super::advertisement::Entity")]
    Advertisement,
}

impl Related<super::advertisement::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Advertisement.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
