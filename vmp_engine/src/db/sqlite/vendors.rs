use chrono::Utc;
use log::*;
use sqlx::SqliteConnection;

use crate::{
    db_types::{NewVendor, Vendor},
    traits::LedgerError,
};

const VENDOR_COLUMNS: &str = "id, license_id, email, first_name, last_name, is_disabled, last_payout, created_at";

pub async fn insert_vendor(vendor: &NewVendor, conn: &mut SqliteConnection) -> Result<Vendor, LedgerError> {
    let vendor = sqlx::query_as::<_, Vendor>(&format!(
        r#"
            INSERT INTO vendors (license_id, email, first_name, last_name, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {VENDOR_COLUMNS};
        "#
    ))
    .bind(&vendor.license_id)
    .bind(&vendor.email)
    .bind(&vendor.first_name)
    .bind(&vendor.last_name)
    .bind(Utc::now())
    .fetch_one(conn)
    .await?;
    debug!("🧾️ Vendor {} saved with id {}", vendor.license_id, vendor.id);
    Ok(vendor)
}

pub async fn fetch_vendor(vendor_id: i64, conn: &mut SqliteConnection) -> Result<Option<Vendor>, LedgerError> {
    let vendor = sqlx::query_as::<_, Vendor>(&format!("SELECT {VENDOR_COLUMNS} FROM vendors WHERE id = $1"))
        .bind(vendor_id)
        .fetch_optional(conn)
        .await?;
    Ok(vendor)
}

pub async fn fetch_vendor_by_license_id(
    license_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Vendor>, LedgerError> {
    let vendor = sqlx::query_as::<_, Vendor>(&format!("SELECT {VENDOR_COLUMNS} FROM vendors WHERE license_id = $1"))
        .bind(license_id)
        .fetch_optional(conn)
        .await?;
    Ok(vendor)
}

pub async fn update_last_payout(vendor_id: i64, conn: &mut SqliteConnection) -> Result<(), LedgerError> {
    let result = sqlx::query("UPDATE vendors SET last_payout = $1 WHERE id = $2")
        .bind(Utc::now())
        .bind(vendor_id)
        .execute(conn)
        .await?;
    if result.rows_affected() == 0 {
        return Err(LedgerError::VendorNotFound(vendor_id.to_string()));
    }
    Ok(())
}

pub async fn delete_vendor(vendor_id: i64, conn: &mut SqliteConnection) -> Result<(), LedgerError> {
    let result = sqlx::query("DELETE FROM vendors WHERE id = $1").bind(vendor_id).execute(conn).await?;
    if result.rows_affected() == 0 {
        return Err(LedgerError::VendorNotFound(vendor_id.to_string()));
    }
    Ok(())
}
