//! # Vendor marketplace ledger public API
//!
//! The APIs in this module are what the HTTP layer and the operations CLI talk to. Each one is generic over the
//! backend traits it needs, so any storage backend implementing [`crate::traits`] can drive it.
//!
//! * [`accounts_api`] reads accounts and their payments, and reconciles vendor balances.
//! * [`order_api`] runs checkout: validation, license fee expansion, the gateway order and the stored order.
//! * [`verification_api`] verifies gateway notices and settles orders exactly once.
//! * [`payout_api`] lists open payments and pays vendors out.
//! * [`entitlement_hook`] delivers licences and download links after an order has been verified.
//!
//! ```rust,ignore
//! use vmp_engine::{PayoutApi, SqliteDatabase, events::EventProducers};
//! let db = SqliteDatabase::new_with_url("sqlite://data/vmp_ledger.db", 5).await?;
//! let api = PayoutApi::new(db, EventProducers::default());
//! let payout = api.create_payout("VE-042", "admin@example.org", None, None).await?;
//! ```
pub mod accounts_api;
pub mod entitlement_hook;
pub mod errors;
pub mod order_api;
pub mod order_objects;
pub mod payment_objects;
pub mod payout_api;
pub mod verification_api;
