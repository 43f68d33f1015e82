//! Pays vendors out in cash for the payments they have accumulated since their last payout.
use std::fmt::Debug;

use chrono::{DateTime, Utc};
use log::*;

use crate::{
    db_types::{AccountType, Payment, Vendor},
    events::{EventProducers, PayoutCreatedEvent},
    traits::{LedgerManagement, SettlementManagement, VendorManagement},
    vmp_api::{
        errors::PayoutError,
        payment_objects::{PaymentQueryFilter, PaymentsResult},
    },
};

pub struct PayoutApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B> Debug for PayoutApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PayoutApi")
    }
}

impl<B> PayoutApi<B>
where B: LedgerManagement + VendorManagement + SettlementManagement
{
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }

    /// Lists the open payments in the (inclusive) date range, oldest first. With a vendor, only payments sent or
    /// received by that vendor's account are listed.
    pub async fn list_payments_for_payout(
        &self,
        since: Option<DateTime<Utc>>,
        until: Option<DateTime<Utc>>,
        vendor_license_id: Option<&str>,
    ) -> Result<Vec<Payment>, PayoutError> {
        let cash = self.db.fetch_account_by_type(AccountType::Cash).await?;
        let mut filter =
            PaymentQueryFilter::default().open_only().excluding_receiver(cash.id).with_date_range(since, until);
        if let Some(license_id) = vendor_license_id {
            let (_, account_id) = self.vendor_and_account(license_id).await?;
            filter = filter.with_account_id(account_id);
        }
        let payments = self.db.fetch_payments(filter).await?;
        trace!("🏦️ {} open payments found", payments.len());
        Ok(payments)
    }

    /// Pays the vendor the net of their open payments in the date range: everything received minus everything sent.
    /// A net of zero or less is rejected.
    pub async fn create_payout(
        &self,
        vendor_license_id: &str,
        authorized_by: &str,
        since: Option<DateTime<Utc>>,
        until: Option<DateTime<Utc>>,
    ) -> Result<Payment, PayoutError> {
        let (vendor, account_id) = self.vendor_and_account(vendor_license_id).await?;
        let payments = self.list_payments_for_payout(since, until, Some(vendor_license_id)).await?;
        let summary = PaymentsResult::new(account_id, payments);
        if !summary.net.is_positive() {
            info!("🏦️ No payout for {vendor_license_id}. Net amount is {}", summary.net);
            return Err(PayoutError::PayoutAmountError(summary.net));
        }
        let source = summary.payment_ids();
        let payout =
            self.db.create_payment_payout(vendor.id, account_id, authorized_by, summary.net, &source).await?;
        info!("🏦️ {authorized_by} paid out {} to {vendor_license_id} ({} payments)", payout.amount, source.len());
        self.producers.publish_payout_created(PayoutCreatedEvent::new(vendor, payout.clone())).await;
        Ok(payout)
    }

    async fn vendor_and_account(&self, license_id: &str) -> Result<(Vendor, i64), PayoutError> {
        let vendor = self
            .db
            .fetch_vendor_by_license_id(license_id)
            .await?
            .ok_or_else(|| PayoutError::VendorNotFound(license_id.to_string()))?;
        let account = self
            .db
            .fetch_account_for_vendor(vendor.id)
            .await?
            .ok_or_else(|| PayoutError::VendorAccountNotFound(license_id.to_string()))?;
        Ok((vendor, account.id))
    }
}
