use chrono::Utc;
use log::*;
use sqlx::SqliteConnection;

use crate::{
    db_types::{Entitlement, EntitlementKind, Item},
    traits::LedgerError,
};

const ENTITLEMENT_COLUMNS: &str = "id, order_id, item_id, kind, pdf_id, link_id, license_group, created_at";

pub async fn fetch_entitlement(
    order_id: i64,
    item_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<Entitlement>, LedgerError> {
    let sql = format!("SELECT {ENTITLEMENT_COLUMNS} FROM entitlements WHERE order_id = $1 AND item_id = $2");
    let entitlement =
        sqlx::query_as::<_, Entitlement>(&sql).bind(order_id).bind(item_id).fetch_optional(conn).await?;
    Ok(entitlement)
}

pub async fn fetch_entitlements_for_order(
    order_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<Entitlement>, LedgerError> {
    let sql = format!("SELECT {ENTITLEMENT_COLUMNS} FROM entitlements WHERE order_id = $1 ORDER BY id");
    let entitlements = sqlx::query_as::<_, Entitlement>(&sql).bind(order_id).fetch_all(conn).await?;
    Ok(entitlements)
}

/// Records the entitlement the customer earns by buying `item` in this order.
///
/// Returns `None` if the item does not carry an entitlement, or if one has already been recorded for this order and
/// item. In the latter case the existing record is left untouched, so the side effects attached to it are only ever
/// triggered once.
pub async fn grant_for_item(
    order_id: i64,
    item: &Item,
    conn: &mut SqliteConnection,
) -> Result<Option<Entitlement>, LedgerError> {
    let Some(kind) = item.entitlement_kind() else {
        return Ok(None);
    };
    if let Some(existing) = fetch_entitlement(order_id, item.id, &mut *conn).await? {
        debug!("🔎️ Order #{order_id} already has entitlement #{} for item {}. Skipping.", existing.id, item.id);
        return Ok(None);
    }
    let (pdf_id, link_id, license_group) = match kind {
        EntitlementKind::PdfDownload => (item.pdf_id, Some(new_link_id()), None),
        EntitlementKind::LicenseGroup => (None, None, item.license_group.clone()),
    };
    let sql = format!(
        r#"
            INSERT INTO entitlements (order_id, item_id, kind, pdf_id, link_id, license_group, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {ENTITLEMENT_COLUMNS};
        "#
    );
    let entitlement = sqlx::query_as::<_, Entitlement>(&sql)
        .bind(order_id)
        .bind(item.id)
        .bind(kind)
        .bind(pdf_id)
        .bind(link_id)
        .bind(license_group)
        .bind(Utc::now())
        .fetch_one(conn)
        .await?;
    debug!("🔎️ Granted {kind:?} entitlement #{} for item {} in order #{order_id}", entitlement.id, item.id);
    Ok(Some(entitlement))
}

/// An unguessable identifier for a download link.
fn new_link_id() -> String {
    format!("{:032x}", rand::random::<u128>())
}
