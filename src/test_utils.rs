//! Shared test utilities for the marketplace.
//!
//! This module provides common helper functions for setting up test databases
//! and creating users, vehicles and listings with sensible defaults.

use crate::{
    config::{MarketSettings, database},
    core::{
        listing::{self, CreatedListing},
        status::Role,
        user::{self, Actor},
        vehicle::VehicleDraft,
    },
    entities::{Advertisement, User, UserColumn, advertisement},
    errors::Result,
};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ColumnTrait, ConnectOptions, ConnectionTrait, Database, DatabaseConnection, EntityTrait,
    QueryFilter, sea_query::Expr,
};
use tempfile::TempDir;

/// Creates an in-memory `SQLite` database with all tables initialized and the
/// system payee seeded.
///
/// The pool holds exactly one connection: every connection to `sqlite::memory:`
/// opens its own empty database.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);
    let db = Database::connect(options).await?;
    database::create_tables(&db).await?;
    user::ensure_system_payee(&db, &MarketSettings::default()).await?;
    Ok(db)
}

/// Creates a file-backed database in a temporary directory, served by a pool of
/// several connections configured like production.
///
/// Keep the returned [`TempDir`] alive for as long as the database is used.
pub async fn setup_file_test_db() -> Result<(TempDir, DatabaseConnection)> {
    let dir = tempfile::tempdir()?;
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("market.sqlite").display());
    let mut options = database::connect_options(&url);
    options.max_connections(8).sqlx_logging(false);
    let db = Database::connect(options).await?;
    database::create_tables(&db).await?;
    user::ensure_system_payee(&db, &MarketSettings::default()).await?;
    Ok((dir, db))
}

/// Creates a user named `name` with `name@example.com` as email.
pub async fn create_test_user(
    db: &DatabaseConnection,
    name: &str,
    role: Role,
) -> Result<crate::entities::user::Model> {
    user::create_user(db, name, &format!("{name}@example.com"), role).await
}

/// Creates a user and returns it as an [`Actor`].
pub async fn create_test_actor(db: &DatabaseConnection, name: &str, role: Role) -> Result<Actor> {
    let created = create_test_user(db, name, role).await?;
    Ok(Actor {
        id: created.id,
        role,
    })
}

/// A complete, valid vehicle description with the given price.
#[must_use]
pub fn sample_draft(price: Decimal) -> VehicleDraft {
    VehicleDraft {
        make: "Skoda".to_string(),
        model: "Octavia".to_string(),
        year: 2018,
        price,
        fuel_type: "diesel".to_string(),
        mileage_km: 98_000,
        body_type: "karavan".to_string(),
        power_kw: 110.0,
        condition: "used".to_string(),
        description: "One owner, full service history".to_string(),
        images: vec!["front.jpg".to_string(), "interior.jpg".to_string()],
        location: "Zagreb".to_string(),
        climate_control: "automatic".to_string(),
        transmission: "manual".to_string(),
        damaged: false,
        emission_class: "Euro 6".to_string(),
        displacement_cc: 1968,
    }
}

/// Database, settings and two counterparties for lifecycle tests.
pub struct TestMarket {
    /// In-memory database
    pub db: DatabaseConnection,
    /// Default settings
    pub settings: MarketSettings,
    /// Seller who owns the test listings
    pub seller: Actor,
    /// A different user who buys them
    pub buyer: Actor,
}

/// Sets up a database with a seller and a buyer.
pub async fn setup_marketplace() -> Result<TestMarket> {
    market_on(setup_test_db().await?).await
}

/// Like [`setup_marketplace`], but on [`setup_file_test_db`] so transactions really
/// run on separate connections.
pub async fn setup_file_marketplace() -> Result<(TempDir, TestMarket)> {
    let (dir, db) = setup_file_test_db().await?;
    Ok((dir, market_on(db).await?))
}

async fn market_on(db: DatabaseConnection) -> Result<TestMarket> {
    let seller = create_test_actor(&db, "prodavac", Role::Seller).await?;
    let buyer = create_test_actor(&db, "kupac", Role::Buyer).await?;
    Ok(TestMarket {
        db,
        settings: MarketSettings::default(),
        seller,
        buyer,
    })
}

/// Lists [`sample_draft`] at `price` for the market's seller.
pub async fn create_test_listing(market: &TestMarket, price: Decimal) -> Result<CreatedListing> {
    listing::create_listing(
        &market.db,
        &market.settings,
        sample_draft(price),
        market.seller.id,
    )
    .await
}

/// Moves an advertisement's expiration date, bypassing the lifecycle engine.
pub async fn backdate_expiration(
    db: &DatabaseConnection,
    ad_id: i64,
    expiration_date: NaiveDate,
) -> Result<()> {
    Advertisement::update_many()
        .col_expr(advertisement::Column::ExpirationDate, Expr::value(expiration_date))
        .filter(advertisement::Column::Id.eq(ad_id))
        .exec(db)
        .await?;
    Ok(())
}

/// Makes every following insert into `payments` fail.
pub async fn fail_payment_inserts(db: &DatabaseConnection) -> Result<()> {
    db.execute_unprepared(
        "CREATE TRIGGER reject_payments BEFORE INSERT ON payments \
         BEGIN SELECT RAISE(ABORT, 'ledger offline'); END;",
    )
    .await?;
    Ok(())
}

/// Soft-deletes a user account, bypassing the API.
pub async fn soft_delete_user(db: &DatabaseConnection, user_id: i64) -> Result<()> {
    let now = Utc::now();
    User::update_many()
        .col_expr(UserColumn::DeletedAt, Expr::value(now))
        .col_expr(UserColumn::UpdatedAt, Expr::value(now))
        .filter(UserColumn::Id.eq(user_id))
        .exec(db)
        .await?;
    Ok(())
}
