//! Vendor Marketplace Ledger engine
//!
//! Goods are sold through a card payment gateway on behalf of vendors. This library keeps the books: a double-entry
//! ledger of accounts and payments, the orders customers place, their verification against the gateway and the cash
//! payouts that vendors eventually receive.
//!
//! The library is divided into:
//! 1. Storage ([`traits`] and the SQLite backend, [`SqliteDatabase`]). Every change to a balance happens inside a
//!    single database transaction, together with the payment that causes it.
//! 2. The public API ([`vmp_api`]), generic over the storage traits.
//! 3. The gateway client ([`gateway`]) and background event hooks ([`events`]) for side effects that happen after a
//!    settlement has been committed.
mod db;

pub mod config;
pub mod db_types;
pub mod events;
pub mod gateway;
pub mod helpers;
pub mod traits;
pub mod vmp_api;

#[cfg(feature = "sqlite")]
pub use db::sqlite::{SqliteDatabase, SqliteDatabaseError};
pub use traits::{
    DispatchError,
    EntitlementDispatcher,
    LedgerError,
    LedgerManagement,
    Notifier,
    OrderManagement,
    SettlementDetails,
    SettlementManagement,
    SettlementResult,
    VendorManagement,
};
pub use vmp_api::{
    accounts_api::AccountApi,
    entitlement_hook::entitlement_hook,
    errors::{AccountApiError, GatewayMismatch, OrderApiError, PayoutError, ValidationError, VerificationError},
    order_api::OrderApi,
    order_objects,
    payment_objects,
    payout_api::PayoutApi,
    verification_api::VerificationApi,
};
