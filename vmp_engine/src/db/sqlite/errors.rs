use thiserror::Error;

/// Errors raised while setting up the SQLite backend. Errors from ledger operations are reported as
/// [`crate::traits::LedgerError`].
#[derive(Debug, Error)]
pub enum SqliteDatabaseError {
    #[error("Database connection error: {0}")]
    DriverError(#[from] sqlx::Error),
    #[error("Could not run database migrations: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),
}
