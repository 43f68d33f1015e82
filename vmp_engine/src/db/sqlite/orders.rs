use chrono::Utc;
use log::*;
use sqlx::SqliteConnection;

use crate::{
    db_types::{EntryRole, NewOrder, NewOrderEntry, Order, OrderCode, OrderEntry},
    traits::{LedgerError, SettlementDetails},
};

const ORDER_COLUMNS: &str =
    "id, order_code, transaction_id, verified, verified_at, transaction_type_id, created_at, vendor_id, customer_email, \
     user_id";
const ENTRY_COLUMNS: &str = "id, order_id, item_id, quantity, price, sender, receiver, role";

/// Inserts the order row (without entries) and returns its id. This is not atomic. Embed it in a transaction
/// together with [`insert_entry`].
pub async fn insert_order(order: &NewOrder, conn: &mut SqliteConnection) -> Result<i64, LedgerError> {
    let result: Result<i64, sqlx::Error> = sqlx::query_scalar(
        r#"
            INSERT INTO orders (order_code, created_at, vendor_id, customer_email, user_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id;
        "#,
    )
    .bind(order.order_code)
    .bind(Utc::now())
    .bind(order.vendor_id)
    .bind(&order.customer_email)
    .bind(&order.user_id)
    .fetch_one(conn)
    .await;
    match result {
        Ok(id) => Ok(id),
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
            Err(LedgerError::OrderAlreadyExists(order.order_code))
        },
        Err(e) => Err(e.into()),
    }
}

/// Inserts an order entry, copying the item's *current* price into the entry in the same statement. If the item is
/// disabled, nothing is inserted and [`LedgerError::ItemDisabled`] is returned.
pub async fn insert_entry(
    order_id: i64,
    entry: &NewOrderEntry,
    role: EntryRole,
    conn: &mut SqliteConnection,
) -> Result<OrderEntry, LedgerError> {
    let inserted = sqlx::query_as::<_, OrderEntry>(&format!(
        r#"
            INSERT INTO order_entries (order_id, item_id, quantity, price, sender, receiver, role)
            SELECT $1, id, $2, price, $3, $4, $5 FROM items WHERE id = $6 AND disabled = 0
            RETURNING {ENTRY_COLUMNS};
        "#
    ))
    .bind(order_id)
    .bind(entry.quantity)
    .bind(entry.sender)
    .bind(entry.receiver)
    .bind(role)
    .bind(entry.item_id)
    .fetch_optional(&mut *conn)
    .await?;
    match inserted {
        Some(e) if e.price.checked_mul(e.quantity).is_none() => Err(LedgerError::AmountOverflow(e.item_id)),
        Some(e) => {
            trace!("🛒️ Order #{order_id}: {} x item {} at {} ({role})", e.quantity, e.item_id, e.price);
            Ok(e)
        },
        None => {
            let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM items WHERE id = $1")
                .bind(entry.item_id)
                .fetch_optional(conn)
                .await?;
            match exists {
                Some(_) => Err(LedgerError::ItemDisabled(entry.item_id)),
                None => Err(LedgerError::ItemNotFound(entry.item_id)),
            }
        },
    }
}

pub async fn fetch_entries(order_id: i64, conn: &mut SqliteConnection) -> Result<Vec<OrderEntry>, LedgerError> {
    let sql = format!("SELECT {ENTRY_COLUMNS} FROM order_entries WHERE order_id = $1 ORDER BY id");
    let entries = sqlx::query_as::<_, OrderEntry>(&sql).bind(order_id).fetch_all(conn).await?;
    Ok(entries)
}

pub async fn fetch_order_by_id(order_id: i64, conn: &mut SqliteConnection) -> Result<Option<Order>, LedgerError> {
    let order = sqlx::query_as::<_, Order>(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
        .bind(order_id)
        .fetch_optional(&mut *conn)
        .await?;
    with_entries(order, conn).await
}

pub async fn fetch_order_by_code(
    order_code: OrderCode,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, LedgerError> {
    let order = sqlx::query_as::<_, Order>(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE order_code = $1"))
        .bind(order_code)
        .fetch_optional(&mut *conn)
        .await?;
    with_entries(order, conn).await
}

pub async fn fetch_unverified_orders(conn: &mut SqliteConnection) -> Result<Vec<Order>, LedgerError> {
    let orders = sqlx::query_as::<_, Order>(&format!(
        "SELECT {ORDER_COLUMNS} FROM orders WHERE verified = 0 ORDER BY created_at ASC"
    ))
    .fetch_all(&mut *conn)
    .await?;
    let mut result = Vec::with_capacity(orders.len());
    for mut order in orders {
        order.entries = fetch_entries(order.id, conn).await?;
        result.push(order);
    }
    Ok(result)
}

async fn with_entries(order: Option<Order>, conn: &mut SqliteConnection) -> Result<Option<Order>, LedgerError> {
    match order {
        Some(mut order) => {
            order.entries = fetch_entries(order.id, conn).await?;
            Ok(Some(order))
        },
        None => Ok(None),
    }
}

/// Flips the order's `verified` flag and records the transaction details. Returns `false` if the order was already
/// verified (or does not exist), in which case nothing was changed.
pub async fn mark_verified(
    order_id: i64,
    details: &SettlementDetails,
    conn: &mut SqliteConnection,
) -> Result<bool, LedgerError> {
    let result = sqlx::query(
        r#"
            UPDATE orders SET verified = 1, verified_at = $1, transaction_id = $2, transaction_type_id = $3
            WHERE id = $4 AND verified = 0
        "#,
    )
    .bind(Utc::now())
    .bind(&details.transaction_id)
    .bind(details.transaction_type_id)
    .bind(order_id)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() == 1)
}

/// Takes the write lock on the database without changing the order. Returns `false` if the order does not exist.
/// Run this first in a transaction whose later checks must not race with another writer.
pub async fn lock_order(order_id: i64, conn: &mut SqliteConnection) -> Result<bool, LedgerError> {
    let result = sqlx::query("UPDATE orders SET verified = verified WHERE id = $1").bind(order_id).execute(conn).await?;
    Ok(result.rows_affected() == 1)
}

/// Whether the order already carries a transaction-cost entry from `sender` to `receiver`.
pub async fn transaction_cost_booked(
    order_id: i64,
    sender: i64,
    receiver: i64,
    conn: &mut SqliteConnection,
) -> Result<bool, LedgerError> {
    let count: i64 = sqlx::query_scalar(
        r#"
            SELECT COUNT(*) FROM order_entries
            WHERE order_id = $1 AND role = $2 AND sender = $3 AND receiver = $4
        "#,
    )
    .bind(order_id)
    .bind(EntryRole::TransactionCost)
    .bind(sender)
    .bind(receiver)
    .fetch_one(conn)
    .await?;
    Ok(count > 0)
}
