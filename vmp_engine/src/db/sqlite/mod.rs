pub mod db;
mod errors;

pub mod accounts;
pub mod entitlements;
pub mod items;
pub mod orders;
pub mod payments;
pub mod vendors;

use std::{env, str::FromStr, time::Duration};

pub use db::SqliteDatabase;
pub use errors::SqliteDatabaseError;
use log::info;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};

const SQLITE_DB_URL: &str = "sqlite://data/vmp_ledger.db";

/// How long a connection waits for the database write lock before giving up.
const BUSY_TIMEOUT: Duration = Duration::from_secs(10);

pub fn db_url() -> String {
    let result = env::var("VMP_DATABASE_URL").unwrap_or_else(|_| {
        info!("VMP_DATABASE_URL is not set. Using the default.");
        SQLITE_DB_URL.to_string()
    });
    info!("Using database URL: {result}");
    result
}

/// Opens a connection pool.
///
/// SQLite only has a database-wide write lock. Every connection waits for it (up to [`BUSY_TIMEOUT`]) rather than
/// failing straight away, so concurrent ledger writers queue up behind each other.
pub async fn new_pool(url: &str, max_connections: u32) -> Result<SqlitePool, SqliteDatabaseError> {
    let options = SqliteConnectOptions::from_str(url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .busy_timeout(BUSY_TIMEOUT);
    let pool = SqlitePoolOptions::new().max_connections(max_connections).connect_with(options).await?;
    Ok(pool)
}
