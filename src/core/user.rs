//! User lookups and actor resolution.
//!
//! Registration and authentication are handled elsewhere. The core only resolves
//! a verified user id into an [`Actor`] and checks that counterparties exist.

use crate::{
    config::MarketSettings,
    core::status::Role,
    entities::{User, user},
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{Set, prelude::*};
use tracing::info;

/// Verified identity performing an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    /// User id
    pub id: i64,
    /// Role of that user
    pub role: Role,
}

impl Actor {
    /// Whether the actor is an administrator.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Creates a user account.
pub async fn create_user(
    db: &DatabaseConnection,
    username: &str,
    email: &str,
    role: Role,
) -> Result<user::Model> {
    if username.trim().is_empty() {
        return Err(Error::validation("username cannot be empty"));
    }
    if email.trim().is_empty() {
        return Err(Error::validation("email cannot be empty"));
    }

    let now = Utc::now();
    let user = user::ActiveModel {
        username: Set(username.trim().to_string()),
        email: Set(email.trim().to_string()),
        role: Set(role.as_str().to_string()),
        created_at: Set(now),
        updated_at: Set(now),
        deleted_at: Set(None),
        ..Default::default()
    };
    user.insert(db).await.map_err(Into::into)
}

/// Loads a user that has not been soft-deleted.
///
/// Generic over the connection so it can run inside a lifecycle transaction.
pub async fn get_active_user<C>(conn: &C, user_id: i64) -> Result<user::Model>
where
    C: ConnectionTrait,
{
    User::find_by_id(user_id)
        .filter(user::Column::DeletedAt.is_null())
        .one(conn)
        .await?
        .ok_or(Error::NotFound {
            entity: "user",
            id: user_id,
        })
}

/// Resolves a verified user id into an [`Actor`].
pub async fn resolve_actor(db: &DatabaseConnection, user_id: i64) -> Result<Actor> {
    let user = get_active_user(db, user_id).await?;
    Ok(Actor {
        id: user.id,
        role: user.role.parse()?,
    })
}

/// Makes sure the account receiving feature fees exists, creating it if needed.
pub async fn ensure_system_payee(
    db: &DatabaseConnection,
    settings: &MarketSettings,
) -> Result<user::Model> {
    if let Some(existing) = User::find_by_id(settings.system_payee_id).one(db).await? {
        return Ok(existing);
    }

    let now = Utc::now();
    let payee = user::ActiveModel {
        id: Set(settings.system_payee_id),
        username: Set("system".to_string()),
        email: Set("system@localhost".to_string()),
        role: Set(Role::Admin.as_str().to_string()),
        created_at: Set(now),
        updated_at: Set(now),
        deleted_at: Set(None),
    };
    let created = payee.insert(db).await?;
    info!("Seeded system payee account with id {}", created.id);
    Ok(created)
}
