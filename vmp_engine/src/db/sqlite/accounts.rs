//! Account storage and the two ways an account balance changes: incremental deltas ([`mutate_balance`]) and full
//! recomputation ([`open_balance`] + [`set_balance`]).
use chrono::Utc;
use log::*;
use sqlx::SqliteConnection;

use crate::{
    db_types::{Account, AccountType, Cents},
    traits::LedgerError,
};

const ACCOUNT_COLUMNS: &str = "id, name, account_type, vendor_id, user_id, balance, created_at, updated_at";

pub async fn insert_account(
    name: &str,
    account_type: AccountType,
    vendor_id: Option<i64>,
    user_id: Option<&str>,
    conn: &mut SqliteConnection,
) -> Result<i64, LedgerError> {
    let now = Utc::now();
    let id: i64 = sqlx::query_scalar(
        r#"
            INSERT INTO accounts (name, account_type, vendor_id, user_id, balance, created_at, updated_at)
            VALUES ($1, $2, $3, $4, 0, $5, $5)
            RETURNING id;
        "#,
    )
    .bind(name)
    .bind(account_type)
    .bind(vendor_id)
    .bind(user_id)
    .bind(now)
    .fetch_one(conn)
    .await?;
    debug!("🧾️ Created {account_type} account #{id} ({name})");
    Ok(id)
}

pub async fn fetch_account(account_id: i64, conn: &mut SqliteConnection) -> Result<Option<Account>, LedgerError> {
    let account = sqlx::query_as::<_, Account>(&format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1"))
        .bind(account_id)
        .fetch_optional(conn)
        .await?;
    Ok(account)
}

pub async fn fetch_account_by_user_id(
    user_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Account>, LedgerError> {
    let account = sqlx::query_as::<_, Account>(&format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE user_id = $1"))
        .bind(user_id)
        .fetch_optional(conn)
        .await?;
    Ok(account)
}

pub async fn fetch_account_for_vendor(
    vendor_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<Account>, LedgerError> {
    let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE vendor_id = $1");
    let account = sqlx::query_as::<_, Account>(&sql)
        .bind(vendor_id)
        .fetch_optional(conn)
        .await?;
    Ok(account)
}

pub async fn fetch_accounts(conn: &mut SqliteConnection) -> Result<Vec<Account>, LedgerError> {
    let accounts = sqlx::query_as::<_, Account>(&format!("SELECT {ACCOUNT_COLUMNS} FROM accounts ORDER BY id"))
        .fetch_all(conn)
        .await?;
    Ok(accounts)
}

/// Returns the id of the (first) account with the given type. Only meaningful for singleton types.
pub async fn fetch_account_id_by_type(
    account_type: AccountType,
    conn: &mut SqliteConnection,
) -> Result<Option<i64>, LedgerError> {
    let id = sqlx::query_scalar("SELECT id FROM accounts WHERE account_type = $1 ORDER BY id LIMIT 1")
        .bind(account_type)
        .fetch_optional(conn)
        .await?;
    Ok(id)
}

/// Applies `delta` to the account balance and returns the new balance.
///
/// The row is written before the balance is read, so the write lock is held from the moment the current balance is
/// known until the enclosing transaction commits. No other writer can slip an update in between the read and the
/// write. Call this inside a transaction.
pub async fn mutate_balance(account_id: i64, delta: Cents, conn: &mut SqliteConnection) -> Result<Cents, LedgerError> {
    let current: Option<Cents> =
        sqlx::query_scalar("UPDATE accounts SET updated_at = $1 WHERE id = $2 RETURNING balance")
            .bind(Utc::now())
            .bind(account_id)
            .fetch_optional(&mut *conn)
            .await?;
    let current = current.ok_or(LedgerError::AccountNotFound(account_id))?;
    let balance = current + delta;
    sqlx::query("UPDATE accounts SET balance = $1 WHERE id = $2").bind(balance).bind(account_id).execute(conn).await?;
    trace!("🧾️ Account #{account_id}: {current} + {delta} = {balance}");
    Ok(balance)
}

/// Locks the vendor's account row (see [`mutate_balance`]) and returns its id and current balance.
pub async fn lock_vendor_account(vendor_id: i64, conn: &mut SqliteConnection) -> Result<(i64, Cents), LedgerError> {
    let row: Option<(i64, Cents)> =
        sqlx::query_as("UPDATE accounts SET updated_at = $1 WHERE vendor_id = $2 RETURNING id, balance")
            .bind(Utc::now())
            .bind(vendor_id)
            .fetch_optional(conn)
            .await?;
    row.ok_or(LedgerError::VendorAccountNotFound(vendor_id))
}

/// Recomputes what the account balance should be from its open payments: amounts received minus amounts sent, over
/// payments that have not been paid out yet and were not received by the Cash account (those are the payouts
/// themselves).
pub async fn open_balance(
    account_id: i64,
    cash_account_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Cents, LedgerError> {
    let balance: i64 = sqlx::query_scalar(
        r#"
            SELECT
                COALESCE(SUM(CASE WHEN receiver = $1 THEN amount ELSE 0 END), 0) -
                COALESCE(SUM(CASE WHEN sender = $1 THEN amount ELSE 0 END), 0)
            FROM payments
            WHERE payout_id IS NULL AND receiver != $2 AND (sender = $1 OR receiver = $1)
        "#,
    )
    .bind(account_id)
    .bind(cash_account_id)
    .fetch_one(conn)
    .await?;
    Ok(Cents::from(balance))
}

pub async fn set_balance(account_id: i64, balance: Cents, conn: &mut SqliteConnection) -> Result<(), LedgerError> {
    let result = sqlx::query("UPDATE accounts SET balance = $1, updated_at = $2 WHERE id = $3")
        .bind(balance)
        .bind(Utc::now())
        .bind(account_id)
        .execute(conn)
        .await?;
    if result.rows_affected() == 0 {
        return Err(LedgerError::AccountNotFound(account_id));
    }
    Ok(())
}

pub async fn delete_vendor_account(vendor_id: i64, conn: &mut SqliteConnection) -> Result<u64, LedgerError> {
    let result = sqlx::query("DELETE FROM accounts WHERE vendor_id = $1").bind(vendor_id).execute(conn).await?;
    Ok(result.rows_affected())
}
