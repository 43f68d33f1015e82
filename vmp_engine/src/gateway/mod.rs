//! The card payment gateway, seen from the ledger.
//!
//! Only the gateway's wire contract is modelled here: creating a payment order at checkout and fetching the
//! authoritative record of a transaction during verification. [`VivaWalletApi`] is the HTTP implementation.
mod api;
pub mod data_objects;
mod errors;

pub use api::VivaWalletApi;
pub use data_objects::{
    is_success_status,
    PaymentOrderRequest,
    TransactionNotice,
    TransactionPriceNotice,
    TransactionRecord,
    WebhookEnvelope,
};
pub use errors::GatewayError;

use crate::db_types::OrderCode;

#[allow(async_fn_in_trait)]
pub trait PaymentGateway {
    /// Registers a payment with the gateway and returns the order code the customer pays against.
    async fn create_payment_order(&self, request: PaymentOrderRequest) -> Result<OrderCode, GatewayError>;

    /// Fetches the gateway's own record of a transaction.
    async fn fetch_transaction(&self, transaction_id: &str) -> Result<TransactionRecord, GatewayError>;
}
