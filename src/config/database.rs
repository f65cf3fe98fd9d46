//! Database configuration module.
//!
//! This module handles the `SQLite` connection and table creation using `SeaORM`.
//! Tables are generated from the entity definitions with `Schema::create_table_from_entity`,
//! so the schema (including the unique `advertisements.vehicle_id` and
//! `payments.idempotency_key` columns and all foreign keys) always matches the Rust structs.

use crate::entities::{Advertisement, Payment, User, Vehicle};
use crate::errors::Result;
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, EntityTrait, Schema,
    sqlx::sqlite::SqliteJournalMode,
};
use std::time::Duration;
use tracing::{debug, info};

const DEFAULT_DATABASE_URL: &str = "sqlite://data/car_market.sqlite?mode=rwc";

/// How long a writer waits for another connection's write lock before failing.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Gets the database URL from the `DATABASE_URL` environment variable or returns the
/// default local `SQLite` path.
#[must_use]
pub fn get_database_url() -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string())
}

/// Pool options for `database_url`.
///
/// Every connection runs in WAL mode with [`BUSY_TIMEOUT`], so a transaction that
/// opens with a write queues behind a competing writer instead of failing with
/// `SQLITE_BUSY`.
#[must_use]
pub fn connect_options(database_url: &str) -> ConnectOptions {
    let mut options = ConnectOptions::new(database_url);
    options.map_sqlx_sqlite_opts(|opts| {
        opts.journal_mode(SqliteJournalMode::Wal).busy_timeout(BUSY_TIMEOUT)
    });
    options
}

/// Establishes a connection to the database at `database_url`.
pub async fn create_connection(database_url: &str) -> Result<DatabaseConnection> {
    debug!("Connecting to database at {database_url}");
    Database::connect(connect_options(database_url))
        .await
        .map_err(Into::into)
}

/// Creates all tables if they do not exist yet.
///
/// Order matters: users first, then vehicles, advertisements and payments, so every
/// foreign key points at an existing table.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let schema = Schema::new(db.get_database_backend());

    create_table(db, &schema, User).await?;
    create_table(db, &schema, Vehicle).await?;
    create_table(db, &schema, Advertisement).await?;
    create_table(db, &schema, Payment).await?;

    info!("Database tables ensured");
    Ok(())
}

async fn create_table<E: EntityTrait>(
    db: &DatabaseConnection,
    schema: &Schema,
    entity: E,
) -> Result<()> {
    let builder = db.get_database_backend();
    let mut statement = schema.create_table_from_entity(entity);
    statement.if_not_exists();
    db.execute(builder.build(&statement)).await?;
    Ok(())
}
