//! # Ledger backend contracts
//!
//! This module defines the behaviour a storage backend must expose in order to drive the ledger. The public APIs in
//! [`crate::vmp_api`] are generic over these traits, and the SQLite backend in [`crate::SqliteDatabase`] implements
//! all of them.
//!
//! * [`LedgerManagement`] covers accounts and their balances: creation, singleton lookups and reconciliation.
//! * [`VendorManagement`] stores vendors and the items they sell.
//! * [`OrderManagement`] persists orders, snapshotting item prices as the order is written.
//! * [`SettlementManagement`] creates payments, settles verified orders and groups payments into payouts.
//!
//! The dispatch traits ([`EntitlementDispatcher`], [`Notifier`]) describe the external collaborators that receive the
//! non-monetary side effects of a settlement.
mod data_objects;
mod dispatch;
mod ledger_management;
mod order_management;
mod settlement_management;
mod vendor_management;

pub use data_objects::{SettlementDetails, SettlementResult};
pub use dispatch::{DispatchError, EntitlementDispatcher, Notifier};
pub use ledger_management::{LedgerError, LedgerManagement};
pub use order_management::OrderManagement;
pub use settlement_management::SettlementManagement;
pub use vendor_management::VendorManagement;
