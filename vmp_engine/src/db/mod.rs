//! Database backends for the ledger.
//!
//! Backend implementations live in their own submodules. Each backend is a set of plain functions taking a
//! `&mut SqliteConnection` (so that they can be composed inside a single transaction), tied together by a struct that
//! implements the traits in [`crate::traits`].
#[cfg(feature = "sqlite")]
pub mod sqlite;
