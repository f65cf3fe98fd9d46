//! Payment entity - Append-only ledger of money movements.
//!
//! Rows are written by [`crate::core::ledger`] in the same database transaction as the
//! lifecycle transition that caused them, and are never updated or deleted.
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Payment database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "payments")]
pub struct Model {
    /// Unique identifier for the payment
    #[sea_orm(primary_key)]
    pub id: i64,
    /// User the money came from
    pub payer_id: i64,
    /// User the money went to
    pub payee_id: i64,
    /// Advertisement that triggered the payment
    pub advertisement_id: Option<i64>,
    /// When the payment happened
    pub paid_at: DateTimeUtc,
    /// Amount in cents
    pub amount_cents: i64,
    /// Type string: `"featured_ad"`, `"purchase"` or `"wallet"`
    pub payment_type: String,
    /// Client-supplied key guarding against duplicate payment-producing requests
    #[sea_orm(unique)]
    pub idempotency_key: Option<String>,
    /// When the row was created
    pub created_at: DateTimeUtc,
    /// Equal to `created_at`; ledger rows are never modified
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Payment and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Payer account
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::PayerId",
        to = "super::user::Column::Id"
    )]
    Payer,
    /// Payee account
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::PayeeId",
        to = "super::user::Column::Id"
    )]
    Payee,
    /// Related advertisement, if any
    #[sea_orm(
        belongs_to = "super::advertisement::Entity",
        from = "Column::AdvertisementId",
        to = "super::advertisement::Column::Id"
    )]
    Advertisement,
}

impl Related<super::advertisement::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Advertisement.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
