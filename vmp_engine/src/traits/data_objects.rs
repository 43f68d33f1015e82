use crate::db_types::{Entitlement, Order, Payment};

/// What the gateway told us about the transaction that paid for an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettlementDetails {
    pub transaction_id: String,
    pub transaction_type_id: i64,
}

impl SettlementDetails {
    pub fn new<S: Into<String>>(transaction_id: S, transaction_type_id: i64) -> Self {
        Self { transaction_id: transaction_id.into(), transaction_type_id }
    }
}

/// The outcome of settling a verified order.
#[derive(Debug, Clone)]
pub struct SettlementResult {
    /// The order, as it stands after verification
    pub order: Order,
    /// Payments created by this settlement. Entries that already had a payment are not included.
    pub payments: Vec<Payment>,
    /// Entitlements granted by this settlement. Previously granted entitlements are not included.
    pub grants: Vec<Entitlement>,
}
