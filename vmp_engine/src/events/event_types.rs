use crate::db_types::{Entitlement, Order, Payment, Vendor};

/// Published once an order has been verified and settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderVerifiedEvent {
    pub order: Order,
    /// Entitlements created by this verification. Empty on every delivery after the first.
    pub grants: Vec<Entitlement>,
}

impl OrderVerifiedEvent {
    pub fn new(order: Order, grants: Vec<Entitlement>) -> Self {
        Self { order, grants }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayoutCreatedEvent {
    pub vendor: Vendor,
    pub payout: Payment,
}

impl PayoutCreatedEvent {
    pub fn new(vendor: Vendor, payout: Payment) -> Self {
        Self { vendor, payout }
    }
}
