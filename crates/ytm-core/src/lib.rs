//! ytm-core - Core library for ytm
//!
//! This crate contains the versioned playlist store, the reconciliation logic
//! that merges fetched snapshots into it, and the read-only consumers built on
//! its history (diffs, retention selection, export, restore).

pub mod backup;
pub mod config;
pub mod db;
pub mod diff;
pub mod error;
pub mod export;
pub mod models;
pub mod prune;
pub mod reconcile;
pub mod restore;
pub mod retention;
pub mod source;
pub mod util;

pub use db::{AsOf, SyncTransaction, Table, VersionId, VersionedStore};
pub use error::{Error, Result};
pub use models::{Playlist, PlaylistEntry, PlaylistItem, StoreVersion, Video};
