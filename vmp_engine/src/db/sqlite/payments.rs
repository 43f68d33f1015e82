//! Payments are the only way money moves in the ledger. [`create_payment_tx`] is the single place where a payment is
//! written, and it always applies the payment to both balances in the same transaction.
use chrono::Utc;
use log::*;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

use crate::{
    db::sqlite::accounts,
    db_types::{EntryRole, NewPayment, Payment},
    traits::LedgerError,
    vmp_api::payment_objects::PaymentQueryFilter,
};

const PAYMENT_COLUMNS: &str = "id, created_at, sender, receiver, amount, authorized_by, order_id, order_entry_id, \
                               payout_id, role, item_id, quantity, price";

/// Inserts the payment, debits the sender and credits the receiver. Run this inside a transaction so that all three
/// writes commit or roll back together.
pub async fn create_payment_tx(payment: NewPayment, conn: &mut SqliteConnection) -> Result<Payment, LedgerError> {
    if !payment.amount.is_positive() {
        return Err(LedgerError::NonPositiveAmount(payment.amount));
    }
    let payment = insert_payment(payment, &mut *conn).await?;
    accounts::mutate_balance(payment.sender, -payment.amount, &mut *conn).await?;
    accounts::mutate_balance(payment.receiver, payment.amount, conn).await?;
    debug!(
        "💸️ Payment #{}: {} from account #{} to account #{}",
        payment.id, payment.amount, payment.sender, payment.receiver
    );
    Ok(payment)
}

async fn insert_payment(payment: NewPayment, conn: &mut SqliteConnection) -> Result<Payment, LedgerError> {
    let payment = sqlx::query_as::<_, Payment>(&format!(
        r#"
            INSERT INTO payments (
                created_at, sender, receiver, amount, authorized_by, order_id, order_entry_id, role, item_id, quantity,
                price
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {PAYMENT_COLUMNS};
        "#
    ))
    .bind(Utc::now())
    .bind(payment.sender)
    .bind(payment.receiver)
    .bind(payment.amount)
    .bind(payment.authorized_by)
    .bind(payment.order_id)
    .bind(payment.order_entry_id)
    .bind(payment.role)
    .bind(payment.item_id)
    .bind(payment.quantity)
    .bind(payment.price)
    .fetch_one(conn)
    .await?;
    Ok(payment)
}

pub async fn fetch_payment(payment_id: i64, conn: &mut SqliteConnection) -> Result<Option<Payment>, LedgerError> {
    let payment = sqlx::query_as::<_, Payment>(&format!("SELECT {PAYMENT_COLUMNS} FROM payments WHERE id = $1"))
        .bind(payment_id)
        .fetch_optional(conn)
        .await?;
    Ok(payment)
}

/// The number of payments that settle the given order entry. Zero or one, unless something has gone very wrong.
pub async fn payment_count_for_entry(entry_id: i64, conn: &mut SqliteConnection) -> Result<i64, LedgerError> {
    let count = sqlx::query_scalar("SELECT COUNT(*) FROM payments WHERE order_entry_id = $1")
        .bind(entry_id)
        .fetch_one(conn)
        .await?;
    Ok(count)
}

/// Fetches payments according to criteria specified in the `PaymentQueryFilter`
///
/// Resulting payments are ordered by `created_at` in ascending order
pub async fn fetch_payments(
    query: PaymentQueryFilter,
    conn: &mut SqliteConnection,
) -> Result<Vec<Payment>, LedgerError> {
    let mut builder = QueryBuilder::<Sqlite>::new(format!("SELECT {PAYMENT_COLUMNS} FROM payments "));
    if !query.is_empty() {
        builder.push("WHERE ");
    }
    let mut where_clause = builder.separated(" AND ");
    if let Some(id) = query.account_id {
        where_clause.push("(sender = ");
        where_clause.push_bind_unseparated(id);
        where_clause.push_unseparated(" OR receiver = ");
        where_clause.push_bind_unseparated(id);
        where_clause.push_unseparated(")");
    }
    if let Some(since) = query.since {
        where_clause.push("created_at >= ");
        where_clause.push_bind_unseparated(since);
    }
    if let Some(until) = query.until {
        where_clause.push("created_at <= ");
        where_clause.push_bind_unseparated(until);
    }
    if query.open_only {
        where_clause.push("payout_id IS NULL");
    }
    if query.sales_only {
        where_clause.push("role = ");
        where_clause.push_bind_unseparated(EntryRole::Sale);
    }
    if let Some(payout_id) = query.payout_id {
        where_clause.push("payout_id = ");
        where_clause.push_bind_unseparated(payout_id);
    }
    if let Some(order_id) = query.order_id {
        where_clause.push("order_id = ");
        where_clause.push_bind_unseparated(order_id);
    }
    if let Some(receiver) = query.exclude_receiver {
        where_clause.push("receiver != ");
        where_clause.push_bind_unseparated(receiver);
    }
    builder.push(" ORDER BY created_at ASC, id ASC");

    trace!("💸️ Executing query: {}", builder.sql());
    let payments = builder.build_query_as::<Payment>().fetch_all(conn).await?;
    trace!("💸️ Result of fetch_payments: {}", payments.len());
    Ok(payments)
}

/// Points every payment in `payment_ids` at `payout_id`, skipping payments that already belong to a payout. Returns
/// the number of payments that were updated.
pub async fn assign_payout(
    payout_id: i64,
    payment_ids: &[i64],
    conn: &mut SqliteConnection,
) -> Result<u64, LedgerError> {
    if payment_ids.is_empty() {
        return Ok(0);
    }
    let mut builder = QueryBuilder::<Sqlite>::new("UPDATE payments SET payout_id = ");
    builder.push_bind(payout_id);
    builder.push(" WHERE payout_id IS NULL AND id IN (");
    let mut ids = builder.separated(", ");
    for id in payment_ids {
        ids.push_bind(*id);
    }
    ids.push_unseparated(")");
    let result = builder.build().execute(conn).await?;
    Ok(result.rows_affected())
}
