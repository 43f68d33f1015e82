use std::time::Duration;

use log::*;
use sqlx::{migrate::MigrateDatabase, Sqlite};
use vmp_engine::{
    config::LedgerConfig,
    db_types::{Account, AccountType, Cents, Item, ItemKind, NewItem, NewVendor, Vendor},
    LedgerManagement,
    SqliteDatabase,
    VendorManagement,
};

pub fn random_db_url() -> String {
    format!("sqlite://{}/vmp_test_{}.db", std::env::temp_dir().display(), rand::random::<u64>())
}

/// A fresh, migrated database with nothing but the singleton accounts in it.
pub async fn prepare_test_env() -> SqliteDatabase {
    dotenvy::from_filename(".env.test").ok();
    let _ = env_logger::try_init();
    let url = random_db_url();
    Sqlite::create_database(&url).await.expect("Error creating database");
    let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating connection to database");
    db.migrate().await.expect("Error running DB migrations");
    debug!("🚀️ Test database ready at {url}");
    db
}

/// Retries without waiting, so that tests exercising the retry paths stay fast.
pub fn test_config() -> LedgerConfig {
    LedgerConfig {
        verify_retry_delay: Duration::from_millis(1),
        order_lookup_delay: Duration::from_millis(1),
        frontend_url: "https://shop.example".to_string(),
        ..LedgerConfig::default()
    }
}

pub struct Catalog {
    pub vendor: Vendor,
    pub vendor_account: Account,
    /// Plain product, €20.00
    pub newspaper: Item,
    /// License fee item, €5.00
    pub license: Item,
    /// Licensed product granting a group, €20.00
    pub digital_edition: Item,
    /// Licensed product granting a PDF download, €3.00
    pub pdf_edition: Item,
    /// One-cent item used to book gateway fees
    pub transaction_cost: Item,
}

pub async fn seed_catalog(db: &SqliteDatabase) -> Catalog {
    let vendor = db
        .create_vendor(NewVendor::new("VE-042").with_email("vendor@example.org").with_name("Anna", "Huber"))
        .await
        .expect("Error creating vendor");
    let vendor_account = db.fetch_account_for_vendor(vendor.id).await.unwrap().expect("Vendor has no account");
    let newspaper = db.create_item(NewItem::new("Newspaper", Cents::from(2000))).await.unwrap();
    let license =
        db.create_item(NewItem::new("License fee", Cents::from(500)).with_kind(ItemKind::License)).await.unwrap();
    let digital_edition = db
        .create_item(
            NewItem::new("Digital edition", Cents::from(2000)).with_license(license.id).with_license_group("newspaper"),
        )
        .await
        .unwrap();
    let pdf_edition = db
        .create_item(NewItem::new("PDF edition", Cents::from(300)).with_license(license.id).with_pdf(7))
        .await
        .unwrap();
    let transaction_cost = db
        .create_item(NewItem::new("transactionCost", Cents::from(1)).with_kind(ItemKind::TransactionCost))
        .await
        .unwrap();
    Catalog { vendor, vendor_account, newspaper, license, digital_edition, pdf_edition, transaction_cost }
}

pub async fn balance_of(db: &SqliteDatabase, account_id: i64) -> Cents {
    db.fetch_account(account_id).await.unwrap().expect("Account does not exist").balance
}

pub async fn singleton(db: &SqliteDatabase, account_type: AccountType) -> Account {
    db.fetch_account_by_type(account_type).await.expect("Singleton account missing")
}

/// The sum of every balance in the ledger. Payments only move money, so this is always zero.
pub async fn ledger_sum(db: &SqliteDatabase) -> Cents {
    db.fetch_accounts().await.unwrap().iter().map(|a| a.balance).sum()
}

pub async fn count_rows(db: &SqliteDatabase, table: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}")).fetch_one(db.pool()).await.unwrap()
}
