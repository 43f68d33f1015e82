//! Turns gateway notices into settled orders.
//!
//! A notice (webhook or storefront poll) is only a claim. Before anything is written, the claim is checked against the
//! gateway's own record of the transaction and against the order stored in the ledger. Gateways deliver webhooks at
//! least once, so every path through here must be safe to repeat: a second delivery for an order that has already been
//! settled is reported as [`VerificationError::AlreadyVerified`] and changes nothing.
use std::fmt::Debug;

use log::*;
use tokio::time::sleep;

use crate::{
    config::LedgerConfig,
    db_types::{AccountType, Cents, NewOrderEntry, Order, OrderCode, Payment},
    events::{EventProducers, OrderVerifiedEvent},
    gateway::{GatewayError, PaymentGateway, TransactionNotice, TransactionPriceNotice, TransactionRecord},
    traits::{
        LedgerError,
        LedgerManagement,
        OrderManagement,
        SettlementDetails,
        SettlementManagement,
        SettlementResult,
        VendorManagement,
    },
    vmp_api::errors::{GatewayMismatch, VerificationError},
};

pub struct VerificationApi<B, G> {
    db: B,
    gateway: G,
    config: LedgerConfig,
    producers: EventProducers,
}

impl<B, G> Debug for VerificationApi<B, G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "VerificationApi")
    }
}

impl<B, G> VerificationApi<B, G>
where
    B: LedgerManagement + VendorManagement + OrderManagement + SettlementManagement,
    G: PaymentGateway,
{
    pub fn new(db: B, gateway: G, config: LedgerConfig, producers: EventProducers) -> Self {
        Self { db, gateway, config, producers }
    }

    /// Verifies a "payment created" webhook and settles the order it refers to.
    ///
    /// On success the order is marked as verified, every entry has been paid and an [`OrderVerifiedEvent`] has been
    /// queued for the entitlement hook.
    pub async fn process_webhook(&self, notice: TransactionNotice) -> Result<SettlementResult, VerificationError> {
        debug!("🔎️ Verifying transaction {} for order {}", notice.transaction_id, notice.order_code);
        let record = self.authoritative_record(&notice.transaction_id, Some(notice.order_code)).await?;
        check_notice(&record, &notice)?;

        let order = self.find_order(notice.order_code).await?;
        if order.verified {
            debug!("🔎️ Order {} was verified before. Nothing to do.", order.order_code);
            return Err(VerificationError::AlreadyVerified(order.order_code));
        }
        let paid = to_cents(notice.amount)?;
        let expected = order.total();
        if expected != paid {
            warn!("🔎️ Order {} totals {expected}, but the gateway notice says {paid}", order.order_code);
            return Err(GatewayMismatch::Total { expected, actual: paid }.into());
        }

        let details = SettlementDetails::new(notice.transaction_id.as_str(), notice.transaction_type_id);
        let result = self.db.settle_order(order.id, details).await?;
        info!(
            "🔎️ Order {} verified with transaction {}. {} payments, {} grants.",
            result.order.order_code,
            notice.transaction_id,
            result.payments.len(),
            result.grants.len()
        );
        let event = OrderVerifiedEvent::new(result.order.clone(), result.grants.clone());
        self.producers.publish_order_verified(event).await;
        Ok(result)
    }

    /// The storefront asks whether its customer's payment went through. Runs the same verification as a webhook,
    /// using the gateway's record as the notice. An order that has already been verified is a success.
    pub async fn poll_transaction(&self, transaction_id: &str) -> Result<Order, VerificationError> {
        let record = self.authoritative_record(transaction_id, None).await?;
        match self.process_webhook(record.as_notice(transaction_id)).await {
            Ok(result) => Ok(result.order),
            Err(VerificationError::AlreadyVerified(code)) => self.find_order(code).await,
            Err(e) => Err(e),
        }
    }

    /// Books the gateway's fee for a transaction against the vendor that sold the order. Returns the payments that
    /// were created, which is none if the fee is zero or has been booked before.
    pub async fn record_transaction_costs(
        &self,
        notice: TransactionPriceNotice,
    ) -> Result<Vec<Payment>, VerificationError> {
        self.authoritative_record(&notice.transaction_id, Some(notice.order_code)).await?;
        let order = self.find_order(notice.order_code).await?;
        let commission = notice.commission().map_err(|e| VerificationError::InvalidAmount(e.to_string()))?;
        if !commission.is_positive() {
            debug!("🔎️ No transaction costs for order {}", order.order_code);
            return Ok(Vec::new());
        }
        let provider = self.db.fetch_account_by_type(AccountType::VivaWallet).await?;
        let item_name = self.config.transaction_cost_item.as_str();
        let item = self
            .db
            .fetch_item_by_name(item_name)
            .await?
            .ok_or_else(|| VerificationError::TransactionCostItemMissing(item_name.to_string()))?;
        if !item.price.is_positive() || commission.value() % item.price.value() != 0 {
            return Err(VerificationError::InvalidAmount(format!(
                "{commission} cannot be expressed in units of {}",
                item.price
            )));
        }
        let quantity = commission.value() / item.price.value();
        let vendor_account = self
            .db
            .fetch_account_for_vendor(order.vendor_id)
            .await?
            .ok_or(LedgerError::VendorAccountNotFound(order.vendor_id))?;

        let mut entries = vec![NewOrderEntry::new(item.id, quantity, vendor_account.id, provider.id)];
        if self.config.orga_covers_transaction_costs {
            let organization = self.db.fetch_account_by_type(AccountType::Organization).await?;
            entries.push(NewOrderEntry::new(item.id, quantity, organization.id, vendor_account.id));
        }
        let payments = self.db.add_paid_entries(order.id, entries).await?;
        if payments.is_empty() {
            debug!("🔎️ Transaction costs for order {} were booked before", order.order_code);
        } else {
            info!("🔎️ Booked {commission} of transaction costs for order {}", order.order_code);
        }
        Ok(payments)
    }

    /// Asks the gateway about the transaction until it answers, retrying on failure. When `expected` is given, an
    /// answer for a different order code also counts as a failure.
    async fn authoritative_record(
        &self,
        transaction_id: &str,
        expected: Option<OrderCode>,
    ) -> Result<TransactionRecord, VerificationError> {
        let attempts = self.config.verify_attempts.max(1);
        let mut mismatch = None;
        let mut last_error = None;
        for attempt in 1..=attempts {
            match self.gateway.fetch_transaction(transaction_id).await {
                Ok(record) => match expected {
                    Some(code) if code != record.order_code => {
                        warn!(
                            "🔎️ Gateway places transaction {transaction_id} in order {}, not {code}. Attempt \
                             {attempt}/{attempts}",
                            record.order_code
                        );
                        mismatch = Some(GatewayMismatch::OrderCode { expected: record.order_code, actual: code });
                    },
                    _ => return Ok(record),
                },
                Err(e) => {
                    warn!("🔎️ Could not fetch transaction {transaction_id}: {e}. Attempt {attempt}/{attempts}");
                    last_error = Some(e);
                },
            }
            if attempt < attempts {
                sleep(self.config.verify_retry_delay).await;
            }
        }
        match mismatch {
            Some(mismatch) => Err(mismatch.into()),
            None => {
                let last_error =
                    last_error.unwrap_or_else(|| GatewayError::TransactionNotFound(transaction_id.to_string()));
                Err(VerificationError::GatewayUnavailable { attempts, last_error })
            },
        }
    }

    /// Looks the order up by code, retrying a few times. The gateway can call back before the checkout that
    /// created the order has committed.
    async fn find_order(&self, order_code: OrderCode) -> Result<Order, VerificationError> {
        let attempts = self.config.order_lookup_attempts.max(1);
        for attempt in 1..=attempts {
            if let Some(order) = self.db.fetch_order_by_code(order_code).await? {
                return Ok(order);
            }
            trace!("🔎️ Order {order_code} not found. Attempt {attempt}/{attempts}");
            if attempt < attempts {
                sleep(self.config.order_lookup_delay).await;
            }
        }
        warn!("🔎️ Order {order_code} could not be found");
        Err(VerificationError::OrderNotFound(order_code))
    }
}

/// Compares a notice against the gateway's record of the same transaction.
fn check_notice(record: &TransactionRecord, notice: &TransactionNotice) -> Result<(), GatewayMismatch> {
    if record.order_code != notice.order_code {
        return Err(GatewayMismatch::OrderCode { expected: record.order_code, actual: notice.order_code });
    }
    let expected = to_cents(record.amount).map_err(|_| amount_mismatch(record.amount, notice.amount))?;
    let actual = to_cents(notice.amount).map_err(|_| amount_mismatch(record.amount, notice.amount))?;
    if expected != actual {
        return Err(GatewayMismatch::Amount { expected, actual });
    }
    if record.status_id != notice.status_id {
        return Err(GatewayMismatch::Status { expected: record.status_id.clone(), actual: notice.status_id.clone() });
    }
    if !record.is_success() {
        return Err(GatewayMismatch::Unsuccessful(record.status_id.clone()));
    }
    Ok(())
}

fn to_cents(major: f64) -> Result<Cents, VerificationError> {
    Cents::try_from_major(major).map_err(|e| VerificationError::InvalidAmount(e.to_string()))
}

fn amount_mismatch(expected: f64, actual: f64) -> GatewayMismatch {
    let expected = Cents::try_from_major(expected).unwrap_or_default();
    let actual = Cents::try_from_major(actual).unwrap_or_default();
    GatewayMismatch::Amount { expected, actual }
}
