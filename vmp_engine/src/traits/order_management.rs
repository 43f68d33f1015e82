use crate::{
    db_types::{NewOrder, NewOrderEntry, Order, OrderCode, Payment},
    traits::LedgerError,
};

/// The `OrderManagement` trait defines the behaviour for storing and querying orders.
#[allow(async_fn_in_trait)]
pub trait OrderManagement {
    /// Stores the order and its entries in a single transaction and returns the new order id.
    ///
    /// Each entry's price is read from its item inside the transaction; caller-supplied prices do not exist. If any
    /// item is disabled, the whole order is rejected with [`LedgerError::ItemDisabled`] and nothing is written. The
    /// same holds for [`LedgerError::AmountOverflow`] if an entry or the order total is too large.
    async fn create_order(&self, order: NewOrder) -> Result<i64, LedgerError>;

    /// Fetches an order, including its entries.
    async fn fetch_order_by_id(&self, order_id: i64) -> Result<Option<Order>, LedgerError>;

    /// Fetches an order by its gateway order code, including its entries.
    async fn fetch_order_by_code(&self, order_code: OrderCode) -> Result<Option<Order>, LedgerError>;

    async fn fetch_unverified_orders(&self) -> Result<Vec<Order>, LedgerError>;

    /// Appends entries to an existing order and creates their payments in the same transaction.
    ///
    /// An order carries at most one transaction-cost entry per sender and receiver. Transaction-cost entries that are
    /// already on the order are skipped and not part of the result, also when two calls for the same order race.
    async fn add_paid_entries(&self, order_id: i64, entries: Vec<NewOrderEntry>) -> Result<Vec<Payment>, LedgerError>;
}
