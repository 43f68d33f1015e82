use std::fmt::Debug;

use log::*;
use sqlx::SqlitePool;

use super::{accounts, db_url, entitlements, items, new_pool, orders, payments, vendors, SqliteDatabaseError};
use crate::{
    db_types::{
        Account,
        AccountType,
        Cents,
        Entitlement,
        EntryRole,
        Item,
        NewItem,
        NewOrder,
        NewOrderEntry,
        NewPayment,
        NewVendor,
        Order,
        OrderCode,
        Payment,
        Vendor,
    },
    helpers::AccountTypeCache,
    traits::{
        LedgerError,
        LedgerManagement,
        OrderManagement,
        SettlementDetails,
        SettlementManagement,
        SettlementResult,
        VendorManagement,
    },
    vmp_api::payment_objects::PaymentQueryFilter,
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
    account_types: AccountTypeCache,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object, using the URL in `VMP_DATABASE_URL`
    pub async fn new(max_connections: u32) -> Result<Self, SqliteDatabaseError> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, SqliteDatabaseError> {
        trace!("Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool, account_types: AccountTypeCache::default() })
    }

    /// Replaces the singleton account id cache, so that several backends can share one.
    pub fn with_account_type_cache(mut self, cache: AccountTypeCache) -> Self {
        self.account_types = cache;
        self
    }

    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn account_type_cache(&self) -> &AccountTypeCache {
        &self.account_types
    }

    /// Brings the schema up to date and creates the singleton accounts, if necessary.
    pub async fn migrate(&self) -> Result<(), SqliteDatabaseError> {
        sqlx::migrate!("./src/db/sqlite/migrations").run(&self.pool).await?;
        info!("🚀️ Migrations complete");
        Ok(())
    }

    pub async fn close(self) {
        self.pool.close().await;
    }

    async fn account_id_for_type(&self, account_type: AccountType) -> Result<i64, LedgerError> {
        if let Some(id) = self.account_types.get(account_type) {
            return Ok(id);
        }
        let mut conn = self.pool.acquire().await?;
        let id = accounts::fetch_account_id_by_type(account_type, &mut conn)
            .await?
            .ok_or(LedgerError::AccountTypeNotFound(account_type))?;
        self.account_types.insert(account_type, id);
        trace!("🧾️ Cached account #{id} for {account_type}");
        Ok(id)
    }

    /// The ledger role of each entry, taken from the item kind. Item kinds never change, so these can be read
    /// outside the transaction that writes the entries.
    async fn entry_roles(&self, entries: &[NewOrderEntry]) -> Result<Vec<EntryRole>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        let mut roles = Vec::with_capacity(entries.len());
        for entry in entries {
            let item = items::fetch_item(entry.item_id, &mut conn).await?;
            let item = item.ok_or(LedgerError::ItemNotFound(entry.item_id))?;
            roles.push(EntryRole::from(item.kind));
        }
        Ok(roles)
    }
}

impl LedgerManagement for SqliteDatabase {
    async fn create_account(
        &self,
        name: &str,
        account_type: AccountType,
        vendor_id: Option<i64>,
    ) -> Result<i64, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        accounts::insert_account(name, account_type, vendor_id, None, &mut conn).await
    }

    async fn fetch_account(&self, account_id: i64) -> Result<Option<Account>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        accounts::fetch_account(account_id, &mut conn).await
    }

    async fn fetch_or_create_account_for_user(&self, user_id: &str) -> Result<Account, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        if let Some(account) = accounts::fetch_account_by_user_id(user_id, &mut conn).await? {
            return Ok(account);
        }
        let id = accounts::insert_account(user_id, AccountType::UserAuth, None, Some(user_id), &mut conn).await?;
        accounts::fetch_account(id, &mut conn).await?.ok_or(LedgerError::AccountNotFound(id))
    }

    async fn fetch_account_by_type(&self, account_type: AccountType) -> Result<Account, LedgerError> {
        if !account_type.is_singleton() {
            return Err(LedgerError::NotSingletonType(account_type));
        }
        let id = self.account_id_for_type(account_type).await?;
        let mut conn = self.pool.acquire().await?;
        accounts::fetch_account(id, &mut conn).await?.ok_or(LedgerError::AccountNotFound(id))
    }

    async fn fetch_account_for_vendor(&self, vendor_id: i64) -> Result<Option<Account>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        accounts::fetch_account_for_vendor(vendor_id, &mut conn).await
    }

    async fn fetch_accounts(&self) -> Result<Vec<Account>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        accounts::fetch_accounts(&mut conn).await
    }

    async fn reconcile_vendor_balance(&self, vendor_id: i64) -> Result<Cents, LedgerError> {
        let cash = self.account_id_for_type(AccountType::Cash).await?;
        let mut tx = self.pool.begin().await?;
        let (account_id, stored) = accounts::lock_vendor_account(vendor_id, &mut tx).await?;
        let balance = accounts::open_balance(account_id, cash, &mut tx).await?;
        accounts::set_balance(account_id, balance, &mut tx).await?;
        tx.commit().await?;
        if stored == balance {
            debug!("🧾️ Vendor #{vendor_id} balance of {balance} is consistent with its open payments");
        } else {
            warn!("🧾️ Vendor #{vendor_id} balance drifted. Stored {stored}, recomputed {balance}. Overwritten.");
        }
        Ok(balance)
    }
}

impl VendorManagement for SqliteDatabase {
    async fn create_vendor(&self, vendor: NewVendor) -> Result<Vendor, LedgerError> {
        let mut tx = self.pool.begin().await?;
        let vendor = vendors::insert_vendor(&vendor, &mut tx).await?;
        accounts::insert_account(&vendor.license_id, AccountType::Vendor, Some(vendor.id), None, &mut tx).await?;
        tx.commit().await?;
        info!("🧾️ Vendor {} registered", vendor.license_id);
        Ok(vendor)
    }

    async fn fetch_vendor(&self, vendor_id: i64) -> Result<Option<Vendor>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        vendors::fetch_vendor(vendor_id, &mut conn).await
    }

    async fn fetch_vendor_by_license_id(&self, license_id: &str) -> Result<Option<Vendor>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        vendors::fetch_vendor_by_license_id(license_id, &mut conn).await
    }

    async fn delete_vendor(&self, vendor_id: i64) -> Result<(), LedgerError> {
        let mut tx = self.pool.begin().await?;
        accounts::delete_vendor_account(vendor_id, &mut tx).await?;
        vendors::delete_vendor(vendor_id, &mut tx).await?;
        tx.commit().await?;
        info!("🧾️ Vendor #{vendor_id} and its account have been removed");
        Ok(())
    }

    async fn create_item(&self, item: NewItem) -> Result<Item, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        items::insert_item(&item, &mut conn).await
    }

    async fn fetch_item(&self, item_id: i64) -> Result<Option<Item>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        items::fetch_item(item_id, &mut conn).await
    }

    async fn fetch_item_by_name(&self, name: &str) -> Result<Option<Item>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        items::fetch_item_by_name(name, &mut conn).await
    }

    async fn set_item_disabled(&self, item_id: i64, disabled: bool) -> Result<Item, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        items::set_disabled(item_id, disabled, &mut conn).await
    }
}

impl OrderManagement for SqliteDatabase {
    async fn create_order(&self, order: NewOrder) -> Result<i64, LedgerError> {
        let roles = self.entry_roles(&order.entries).await?;
        let mut tx = self.pool.begin().await?;
        let order_id = orders::insert_order(&order, &mut tx).await?;
        let mut total = Cents::default();
        for (entry, role) in order.entries.iter().zip(roles) {
            let entry = orders::insert_entry(order_id, entry, role, &mut tx).await?;
            if entry.is_sale() {
                total = total.checked_add(entry.amount()).ok_or(LedgerError::AmountOverflow(entry.item_id))?;
            }
        }
        tx.commit().await?;
        debug!("🛒️ Order {} has been saved in the DB with id {order_id}", order.order_code);
        Ok(order_id)
    }

    async fn fetch_order_by_id(&self, order_id: i64) -> Result<Option<Order>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_order_by_id(order_id, &mut conn).await
    }

    async fn fetch_order_by_code(&self, order_code: OrderCode) -> Result<Option<Order>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_order_by_code(order_code, &mut conn).await
    }

    async fn fetch_unverified_orders(&self) -> Result<Vec<Order>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_unverified_orders(&mut conn).await
    }

    async fn add_paid_entries(&self, order_id: i64, entries: Vec<NewOrderEntry>) -> Result<Vec<Payment>, LedgerError> {
        let roles = self.entry_roles(&entries).await?;
        let mut tx = self.pool.begin().await?;
        // Writing first takes the lock, so a concurrent call sees our entries before it looks for its own.
        if !orders::lock_order(order_id, &mut tx).await? {
            return Err(LedgerError::OrderNotFound(order_id.to_string()));
        }
        let mut result = Vec::with_capacity(entries.len());
        for (entry, role) in entries.iter().zip(roles) {
            let booked = role == EntryRole::TransactionCost
                && orders::transaction_cost_booked(order_id, entry.sender, entry.receiver, &mut tx).await?;
            if booked {
                debug!("🛒️ Order #{order_id} already has costs from {} to {}", entry.sender, entry.receiver);
                continue;
            }
            let entry = orders::insert_entry(order_id, entry, role, &mut tx).await?;
            let payment = payments::create_payment_tx(NewPayment::for_entry(&entry), &mut tx).await?;
            result.push(payment);
        }
        tx.commit().await?;
        debug!("🛒️ {} paid entries added to order #{order_id}", result.len());
        Ok(result)
    }
}

impl SettlementManagement for SqliteDatabase {
    async fn create_payment(&self, payment: NewPayment) -> Result<Payment, LedgerError> {
        let mut tx = self.pool.begin().await?;
        let payment = payments::create_payment_tx(payment, &mut tx).await?;
        tx.commit().await?;
        Ok(payment)
    }

    async fn fetch_payment(&self, payment_id: i64) -> Result<Option<Payment>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        payments::fetch_payment(payment_id, &mut conn).await
    }

    async fn fetch_payments(&self, filter: PaymentQueryFilter) -> Result<Vec<Payment>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        payments::fetch_payments(filter, &mut conn).await
    }

    async fn settle_order(&self, order_id: i64, details: SettlementDetails) -> Result<SettlementResult, LedgerError> {
        let mut tx = self.pool.begin().await?;
        // The verified flag is flipped first. This takes the write lock, and a concurrent settlement of the same
        // order finds the flag already set once it gets its turn.
        if !orders::mark_verified(order_id, &details, &mut tx).await? {
            let order = orders::fetch_order_by_id(order_id, &mut tx).await?;
            return match order {
                Some(order) => Err(LedgerError::AlreadyVerified(order.order_code)),
                None => Err(LedgerError::OrderNotFound(order_id.to_string())),
            };
        }
        let order = orders::fetch_order_by_id(order_id, &mut tx)
            .await?
            .ok_or_else(|| LedgerError::OrderNotFound(order_id.to_string()))?;

        let mut grants = Vec::new();
        for entry in &order.entries {
            let item =
                items::fetch_item(entry.item_id, &mut tx).await?.ok_or(LedgerError::ItemNotFound(entry.item_id))?;
            if let Some(grant) = entitlements::grant_for_item(order_id, &item, &mut tx).await? {
                grants.push(grant);
            }
        }

        let mut created = Vec::with_capacity(order.entries.len());
        for entry in &order.entries {
            if payments::payment_count_for_entry(entry.id, &mut tx).await? > 0 {
                debug!("💸️ Entry #{} of order {} has already been paid. Skipping.", entry.id, order.order_code);
                continue;
            }
            let payment = payments::create_payment_tx(NewPayment::for_entry(entry), &mut tx).await?;
            created.push(payment);
        }
        tx.commit().await?;
        info!(
            "💸️ Order {} settled. {} payments created, {} entitlements granted",
            order.order_code,
            created.len(),
            grants.len()
        );
        Ok(SettlementResult { order, payments: created, grants })
    }

    async fn create_payment_payout(
        &self,
        vendor_id: i64,
        vendor_account_id: i64,
        authorized_by: &str,
        amount: Cents,
        source_payments: &[i64],
    ) -> Result<Payment, LedgerError> {
        if !amount.is_positive() {
            return Err(LedgerError::NonPositiveAmount(amount));
        }
        let cash = self.account_id_for_type(AccountType::Cash).await?;
        let mut tx = self.pool.begin().await?;
        let payout = NewPayment::new(vendor_account_id, cash, amount).authorized_by(authorized_by);
        let payout = payments::create_payment_tx(payout, &mut tx).await?;
        let updated = payments::assign_payout(payout.id, source_payments, &mut tx).await?;
        let missing = source_payments.len().saturating_sub(usize::try_from(updated).unwrap_or(usize::MAX));
        if missing > 0 {
            warn!("🏦️ Payout for vendor #{vendor_id} aborted. {missing} payments were already paid out.");
            return Err(LedgerError::PayoutConflict(missing));
        }
        vendors::update_last_payout(vendor_id, &mut tx).await?;
        tx.commit().await?;
        info!(
            "🏦️ Payout #{} of {amount} for vendor #{vendor_id} covers {} payments",
            payout.id,
            source_payments.len()
        );
        Ok(payout)
    }

    async fn fetch_entitlements_for_order(&self, order_id: i64) -> Result<Vec<Entitlement>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        entitlements::fetch_entitlements_for_order(order_id, &mut conn).await
    }
}
