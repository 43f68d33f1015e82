use sqlx::SqliteConnection;

use crate::{
    db_types::{Item, NewItem},
    traits::LedgerError,
};

const ITEM_COLUMNS: &str = "id, name, description, price, kind, disabled, license_item, license_group, pdf_id";

pub async fn insert_item(item: &NewItem, conn: &mut SqliteConnection) -> Result<Item, LedgerError> {
    if !item.price.is_positive() {
        return Err(LedgerError::InvalidItemPrice(item.price));
    }
    let item = sqlx::query_as::<_, Item>(&format!(
        r#"
            INSERT INTO items (name, description, price, kind, license_item, license_group, pdf_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {ITEM_COLUMNS};
        "#
    ))
    .bind(&item.name)
    .bind(&item.description)
    .bind(item.price)
    .bind(item.kind)
    .bind(item.license_item)
    .bind(&item.license_group)
    .bind(item.pdf_id)
    .fetch_one(conn)
    .await?;
    Ok(item)
}

pub async fn fetch_item(item_id: i64, conn: &mut SqliteConnection) -> Result<Option<Item>, LedgerError> {
    let item = sqlx::query_as::<_, Item>(&format!("SELECT {ITEM_COLUMNS} FROM items WHERE id = $1"))
        .bind(item_id)
        .fetch_optional(conn)
        .await?;
    Ok(item)
}

pub async fn fetch_item_by_name(name: &str, conn: &mut SqliteConnection) -> Result<Option<Item>, LedgerError> {
    let item = sqlx::query_as::<_, Item>(&format!("SELECT {ITEM_COLUMNS} FROM items WHERE name = $1"))
        .bind(name)
        .fetch_optional(conn)
        .await?;
    Ok(item)
}

pub async fn set_disabled(item_id: i64, disabled: bool, conn: &mut SqliteConnection) -> Result<Item, LedgerError> {
    let item = sqlx::query_as::<_, Item>(&format!(
        "UPDATE items SET disabled = $1 WHERE id = $2 RETURNING {ITEM_COLUMNS}"
    ))
    .bind(disabled)
    .bind(item_id)
    .fetch_optional(conn)
    .await?;
    item.ok_or(LedgerError::ItemNotFound(item_id))
}
