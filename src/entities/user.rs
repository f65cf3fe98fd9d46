//! User entity - Marketplace accounts acting as sellers, buyers or administrators.
//!
//! Registration and credentials live outside this crate; the core only needs the
//! identity, role and soft-delete marker to resolve actors and counterparties.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// User database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    /// Unique identifier for the user
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Display name
    pub username: String,
    /// Contact e-mail
    pub email: String,
    /// Role string: `"buyer"`, `"seller"` or `"admin"`
    pub role: String,
    /// When the account was created
    pub created_at: DateTimeUtc,
    /// When the account was last modified
    pub updated_at: DateTimeUtc,
    /// Soft delete marker
    pub deleted_at: Option<DateTimeUtc>,
}

/// `User` is referenced by advertisements and payments but owns no relation itself
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
