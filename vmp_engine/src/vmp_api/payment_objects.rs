use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db_types::{Cents, Payment};

/// Selects payments from the ledger. All criteria are combined with `AND`; an empty filter selects everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PaymentQueryFilter {
    /// Payments where this account is either the sender or the receiver
    pub account_id: Option<i64>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    /// Only payments that have not been grouped into a payout yet
    pub open_only: bool,
    pub sales_only: bool,
    pub payout_id: Option<i64>,
    pub order_id: Option<i64>,
    /// Leave out payments received by this account
    pub exclude_receiver: Option<i64>,
}

impl PaymentQueryFilter {
    pub fn with_account_id(mut self, account_id: i64) -> Self {
        self.account_id = Some(account_id);
        self
    }

    pub fn since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    pub fn until(mut self, until: DateTime<Utc>) -> Self {
        self.until = Some(until);
        self
    }

    pub fn with_date_range(mut self, since: Option<DateTime<Utc>>, until: Option<DateTime<Utc>>) -> Self {
        self.since = since;
        self.until = until;
        self
    }

    pub fn open_only(mut self) -> Self {
        self.open_only = true;
        self
    }

    pub fn sales_only(mut self) -> Self {
        self.sales_only = true;
        self
    }

    pub fn with_payout_id(mut self, payout_id: i64) -> Self {
        self.payout_id = Some(payout_id);
        self
    }

    pub fn with_order_id(mut self, order_id: i64) -> Self {
        self.order_id = Some(order_id);
        self
    }

    pub fn excluding_receiver(mut self, account_id: i64) -> Self {
        self.exclude_receiver = Some(account_id);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.account_id.is_none() &&
            self.since.is_none() &&
            self.until.is_none() &&
            !self.open_only &&
            !self.sales_only &&
            self.payout_id.is_none() &&
            self.order_id.is_none() &&
            self.exclude_receiver.is_none()
    }
}

/// A set of payments, along with their net effect on one account.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PaymentsResult {
    pub account_id: i64,
    /// Received minus sent
    pub net: Cents,
    pub payments: Vec<Payment>,
}

impl PaymentsResult {
    pub fn new(account_id: i64, payments: Vec<Payment>) -> Self {
        let net = payments.iter().map(|p| p.delta_for(account_id)).sum();
        Self { account_id, net, payments }
    }

    pub fn payment_ids(&self) -> Vec<i64> {
        self.payments.iter().map(|p| p.id).collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::db_types::EntryRole;

    fn payment(id: i64, sender: i64, receiver: i64, amount: i64) -> Payment {
        Payment {
            id,
            created_at: Utc::now(),
            sender,
            receiver,
            amount: Cents::from(amount),
            authorized_by: String::new(),
            order_id: Some(1),
            order_entry_id: Some(id),
            payout_id: None,
            role: Some(EntryRole::Sale),
            item_id: None,
            quantity: 1,
            price: Cents::from(amount),
        }
    }

    #[test]
    fn net_is_received_minus_sent() {
        let vendor = 5;
        let result = PaymentsResult::new(vendor, vec![payment(1, 3, vendor, 314), payment(2, vendor, 2, 1)]);
        assert_eq!(result.net, Cents::from(313));
        assert_eq!(result.payment_ids(), vec![1, 2]);
    }

    #[test]
    fn empty_filter() {
        assert!(PaymentQueryFilter::default().is_empty());
        assert!(!PaymentQueryFilter::default().open_only().is_empty());
        assert!(!PaymentQueryFilter::default().excluding_receiver(1).is_empty());
    }
}
