//! Unifies API for reading accounts and correcting their balances.
use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{Account, AccountType, Cents, Vendor},
    traits::{LedgerManagement, SettlementManagement, VendorManagement},
    vmp_api::{
        errors::AccountApiError,
        payment_objects::{PaymentQueryFilter, PaymentsResult},
    },
};

pub struct AccountApi<B> {
    db: B,
}

impl<B: Debug> Debug for AccountApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AccountApi ({:?})", self.db)
    }
}

impl<B> AccountApi<B>
where B: LedgerManagement + VendorManagement + SettlementManagement
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    pub async fn account_by_id(&self, account_id: i64) -> Result<Option<Account>, AccountApiError> {
        Ok(self.db.fetch_account(account_id).await?)
    }

    /// The account of an authenticated customer, created on first use.
    pub async fn account_for_user(&self, user_id: &str) -> Result<Account, AccountApiError> {
        Ok(self.db.fetch_or_create_account_for_user(user_id).await?)
    }

    pub async fn account_by_type(&self, account_type: AccountType) -> Result<Account, AccountApiError> {
        Ok(self.db.fetch_account_by_type(account_type).await?)
    }

    pub async fn accounts(&self) -> Result<Vec<Account>, AccountApiError> {
        Ok(self.db.fetch_accounts().await?)
    }

    /// Fetches the vendor with the given license id, along with its account.
    pub async fn vendor_account(&self, license_id: &str) -> Result<(Vendor, Account), AccountApiError> {
        let vendor = self
            .db
            .fetch_vendor_by_license_id(license_id)
            .await?
            .ok_or_else(|| AccountApiError::VendorNotFound(license_id.to_string()))?;
        let account = self
            .db
            .fetch_account_for_vendor(vendor.id)
            .await?
            .ok_or_else(|| AccountApiError::VendorNotFound(license_id.to_string()))?;
        Ok((vendor, account))
    }

    /// Recomputes the vendor's balance from its open payments and stores the result. The stored balance is only
    /// ever replaced here.
    pub async fn reconcile_vendor(&self, license_id: &str) -> Result<Cents, AccountApiError> {
        let (vendor, account) = self.vendor_account(license_id).await?;
        let balance = self.db.reconcile_vendor_balance(vendor.id).await?;
        if balance != account.balance {
            info!("🧾️ Reconciled {license_id}: {} -> {balance}", account.balance);
        }
        Ok(balance)
    }

    /// Payments involving the account, with their net effect on it.
    pub async fn payments_for_account(
        &self,
        account_id: i64,
        filter: PaymentQueryFilter,
    ) -> Result<PaymentsResult, AccountApiError> {
        let payments = self.db.fetch_payments(filter.with_account_id(account_id)).await?;
        trace!("🧾️ {} payments fetched for account #{account_id}", payments.len());
        Ok(PaymentsResult::new(account_id, payments))
    }
}
