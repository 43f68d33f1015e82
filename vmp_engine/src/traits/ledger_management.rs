use thiserror::Error;

use crate::db_types::{Account, AccountType, Cents, OrderCode};

#[derive(Debug, Clone, Error)]
pub enum LedgerError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("The requested account id {0} does not exist")]
    AccountNotFound(i64),
    #[error("There is no account of type {0}")]
    AccountTypeNotFound(AccountType),
    #[error("{0} is not a singleton account type")]
    NotSingletonType(AccountType),
    #[error("Vendor {0} does not exist")]
    VendorNotFound(String),
    #[error("Vendor {0} does not have an account")]
    VendorAccountNotFound(i64),
    #[error("Item {0} does not exist")]
    ItemNotFound(i64),
    #[error("Item {0} is disabled")]
    ItemDisabled(i64),
    #[error("Item prices must be positive. Got {0}")]
    InvalidItemPrice(Cents),
    #[error("The amount for item {0} is too large to be represented")]
    AmountOverflow(i64),
    #[error("Order {0} does not exist")]
    OrderNotFound(String),
    #[error("Cannot insert order, since order {0} already exists")]
    OrderAlreadyExists(OrderCode),
    #[error("Order {0} has already been verified")]
    AlreadyVerified(OrderCode),
    #[error("Payment {0} does not exist")]
    PaymentNotFound(i64),
    #[error("Payment amounts must be positive. Got {0}")]
    NonPositiveAmount(Cents),
    #[error("{0} of the payments in this payout have already been paid out")]
    PayoutConflict(usize),
}

impl From<sqlx::Error> for LedgerError {
    fn from(e: sqlx::Error) -> Self {
        LedgerError::DatabaseError(e.to_string())
    }
}

/// The `LedgerManagement` trait defines behaviour for managing accounts and their balances.
///
/// Balances are maintained incrementally by every payment (see [`crate::traits::SettlementManagement`]). The stored
/// balance is the canonical value; [`LedgerManagement::reconcile_vendor_balance`] recomputes it from the open payments
/// and overwrites it when asked to.
#[allow(async_fn_in_trait)]
pub trait LedgerManagement: Clone {
    /// Creates a new account with a zero balance and returns its id.
    async fn create_account(
        &self,
        name: &str,
        account_type: AccountType,
        vendor_id: Option<i64>,
    ) -> Result<i64, LedgerError>;

    async fn fetch_account(&self, account_id: i64) -> Result<Option<Account>, LedgerError>;

    /// Fetches the account belonging to the external user id, creating a `UserAuth` account if there isn't one yet.
    ///
    /// Two concurrent calls for the same new user race on the unique user id. The loser receives an error and should
    /// retry.
    async fn fetch_or_create_account_for_user(&self, user_id: &str) -> Result<Account, LedgerError>;

    /// Fetches the account of a singleton type. The account id is cached for the lifetime of the process.
    async fn fetch_account_by_type(&self, account_type: AccountType) -> Result<Account, LedgerError>;

    async fn fetch_account_for_vendor(&self, vendor_id: i64) -> Result<Option<Account>, LedgerError>;

    async fn fetch_accounts(&self) -> Result<Vec<Account>, LedgerError>;

    /// Recomputes the vendor account's balance from its open payments (no payout assigned, not received by the Cash
    /// account), stores it and returns it.
    async fn reconcile_vendor_balance(&self, vendor_id: i64) -> Result<Cents, LedgerError>;
}
