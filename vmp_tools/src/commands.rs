use anyhow::Result;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use log::*;
use vmp_common::Cents;
use vmp_engine::{
    config::{GatewayConfig, LedgerConfig},
    events::EventProducers,
    gateway::VivaWalletApi,
    payment_objects::PaymentsResult,
    AccountApi,
    PayoutApi,
    SqliteDatabase,
    VerificationApi,
};

use crate::{
    formatting::{format_accounts, format_order, format_payments, format_vendor_account},
    OpenPaymentsParams,
    PayoutParams,
};

pub struct Context {
    pub db: SqliteDatabase,
    pub config: LedgerConfig,
}

impl Context {
    pub async fn new(database_url: Option<String>) -> Result<Self> {
        let mut config = LedgerConfig::from_env_or_default();
        if let Some(url) = database_url {
            config.database_url = url;
        }
        let db = SqliteDatabase::new_with_url(&config.database_url, config.max_connections).await?;
        Ok(Self { db, config })
    }

    pub async fn close(self) {
        self.db.close().await;
    }
}

pub async fn migrate(ctx: &Context) -> Result<String> {
    ctx.db.migrate().await?;
    Ok(format!("Database at {} is up to date", ctx.db.url()))
}

pub async fn accounts(ctx: &Context) -> Result<String> {
    let accounts = AccountApi::new(ctx.db.clone()).accounts().await?;
    let total = accounts.iter().map(|a| a.balance).sum::<Cents>();
    if total != Cents::default() {
        warn!("🧾️ Account balances add up to {total} instead of zero");
    }
    Ok(format_accounts(&accounts))
}

pub async fn balance(ctx: &Context, license_id: &str) -> Result<String> {
    let api = AccountApi::new(ctx.db.clone());
    let (vendor, account) = api.vendor_account(license_id).await?;
    Ok(format_vendor_account(&vendor, &account))
}

pub async fn reconcile(ctx: &Context, license_id: &str) -> Result<String> {
    let api = AccountApi::new(ctx.db.clone());
    let (_, before) = api.vendor_account(license_id).await?;
    let balance = api.reconcile_vendor(license_id).await?;
    let result = if balance == before.balance {
        format!("Balance of {license_id} is {balance}. No correction needed.")
    } else {
        format!("Balance of {license_id} corrected from {} to {balance}", before.balance)
    };
    Ok(result)
}

pub async fn open_payments(ctx: &Context, params: OpenPaymentsParams) -> Result<String> {
    let api = PayoutApi::new(ctx.db.clone(), EventProducers::default());
    let vendor = params.vendor.as_deref();
    let payments = api.list_payments_for_payout(params.range.from, params.range.to, vendor).await?;
    let mut result = format_payments(&payments);
    if let Some(license_id) = vendor {
        let (_, account) = AccountApi::new(ctx.db.clone()).vendor_account(license_id).await?;
        let summary = PaymentsResult::new(account.id, payments);
        result.push_str(&format!("\nNet for {license_id}: {}", summary.net));
    }
    Ok(result)
}

pub async fn payout(ctx: &Context, params: PayoutParams) -> Result<String> {
    let api = PayoutApi::new(ctx.db.clone(), EventProducers::default());
    let PayoutParams { license_id, authorized_by, range } = params;
    let payout = api.create_payout(&license_id, &authorized_by, range.from, range.to).await?;
    Ok(format!("Payout #{} of {} to {license_id}, authorized by {authorized_by}", payout.id, payout.amount))
}

/// Settles the order paid by the transaction, if the gateway confirms it. Entitlements are recorded in the ledger,
/// but nothing is delivered from here.
pub async fn verify(ctx: &Context, transaction_id: &str) -> Result<String> {
    let gateway = VivaWalletApi::new(GatewayConfig::from_env_or_default())?;
    let api = VerificationApi::new(ctx.db.clone(), gateway, ctx.config.clone(), EventProducers::default());
    let order = api.poll_transaction(transaction_id).await?;
    Ok(format_order(&order))
}

pub fn parse_date(value: &str) -> Result<DateTime<Utc>, String> {
    parse_date_with_time(value, NaiveTime::MIN)
}

/// Like [`parse_date`], but a bare date means the end of that day.
pub fn parse_end_date(value: &str) -> Result<DateTime<Utc>, String> {
    let end_of_day = NaiveTime::from_hms_milli_opt(23, 59, 59, 999).ok_or("Invalid time of day")?;
    parse_date_with_time(value, end_of_day)
}

fn parse_date_with_time(value: &str, time: NaiveTime) -> Result<DateTime<Utc>, String> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map(|d| d.and_time(time).and_utc())
        .map_err(|e| format!("'{value}' is not a date: {e}"))
}
