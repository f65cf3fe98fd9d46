//! Advertisement entity - The public listing of a vehicle by a seller.
//!
//! The `status` column holds one of `"standard"`, `"featured"` or `"sold"`; it is
//! parsed into [`crate::core::status::AdStatus`] before any decision is made on it.
//! Only the lifecycle engine in [`crate::core::listing`] writes to this table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Advertisement database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "advertisements")]
pub struct Model {
    /// Unique identifier for the advertisement
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Calendar day the listing was created
    pub creation_date: Date,
    /// Last calendar day the listing is shown
    pub expiration_date: Date,
    /// Feature surcharge paid, in cents
    pub featured_price_cents: Option<i64>,
    /// Listed vehicle (at most one advertisement per vehicle)
    #[sea_orm(unique)]
    pub vehicle_id: i64,
    /// Seller of record
    pub seller_id: i64,
    /// Buyer, set once when the listing is sold
    pub buyer_id: Option<i64>,
    /// Lifecycle status string
    pub status: String,
    /// Calendar day of the sale
    pub sale_date: Option<Date>,
    /// When the advertisement was created
    pub created_at: DateTimeUtc,
    /// When the advertisement was last modified
    pub updated_at: DateTimeUtc,
    /// Soft delete marker
    pub deleted_at: Option<DateTimeUtc>,
}

/// Defines relationships between Advertisement and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each advertisement lists one vehicle
    #[sea_orm(
        belongs_to = "super::vehicle::Entity",
        from = "Column::VehicleId",
        to = "super::vehicle::Column::Id"
    )]
    Vehicle,
    /// The seller who posted the listing
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::SellerId",
        to = "super::user::Column::Id"
    )]
    Seller,
    /// The buyer, once sold
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::BuyerId",
        to = "super::user::Column::Id"
    )]
    Buyer,
    /// Ledger entries produced by this listing
    #[sea_orm(has_many = "super::payment::Entity")]
    Payments,
}

impl Related<super::vehicle::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Vehicle.def()
    }
}

impl Related<super::payment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Payments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
