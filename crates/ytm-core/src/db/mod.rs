//! Database layer for ytm
//!
//! Every table is row-versioned: a row carries the store version that
//! introduced it (`valid_from`) and the version that superseded it
//! (`valid_to`, NULL while current). Reads pick the rows visible at one
//! committed version, so history is never rewritten and uncommitted writes
//! stay invisible.

mod connection;
mod migrations;
mod record;
mod store;
mod transaction;

pub use crate::models::VersionId;
pub use connection::Database;
pub use record::{Record, RowVersion, Table};
pub use store::{AsOf, VersionedStore};
pub use transaction::SyncTransaction;
