use crate::{
    db_types::{Cents, Entitlement, NewPayment, Payment},
    traits::{LedgerError, SettlementDetails, SettlementResult},
    vmp_api::payment_objects::PaymentQueryFilter,
};

/// Everything that moves money between accounts goes through this trait.
///
/// Every payment debits its sender and credits its receiver by exactly its amount, in the same transaction that
/// stores the payment.
#[allow(async_fn_in_trait)]
pub trait SettlementManagement {
    /// Stores a payment and applies it to both balances atomically.
    async fn create_payment(&self, payment: NewPayment) -> Result<Payment, LedgerError>;

    async fn fetch_payment(&self, payment_id: i64) -> Result<Option<Payment>, LedgerError>;

    /// Fetches payments according to the filter, ordered by creation time.
    async fn fetch_payments(&self, filter: PaymentQueryFilter) -> Result<Vec<Payment>, LedgerError>;

    /// Marks the order as verified and settles it, in a single transaction:
    /// * the `verified` flag is flipped and the transaction details are recorded. If the order was already verified,
    ///   [`LedgerError::AlreadyVerified`] is returned and nothing else happens.
    /// * an entitlement record is created for every entry whose item carries one, unless the order already has one
    ///   for that item.
    /// * a payment is created for every entry that does not already have one.
    async fn settle_order(&self, order_id: i64, details: SettlementDetails) -> Result<SettlementResult, LedgerError>;

    /// Pays out `amount` from the vendor account to the Cash account and marks every source payment as paid out by
    /// the new payment. The vendor's last payout time is updated.
    ///
    /// If any of the source payments has been paid out in the meantime, the whole payout is rolled back with
    /// [`LedgerError::PayoutConflict`].
    async fn create_payment_payout(
        &self,
        vendor_id: i64,
        vendor_account_id: i64,
        authorized_by: &str,
        amount: Cents,
        source_payments: &[i64],
    ) -> Result<Payment, LedgerError>;

    async fn fetch_entitlements_for_order(&self, order_id: i64) -> Result<Vec<Entitlement>, LedgerError>;
}
