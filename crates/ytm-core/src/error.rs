//! Error types for ytm-core

use thiserror::Error;

use crate::db::VersionId;
use crate::source::FetchError;

/// Result type alias using ytm-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in ytm-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// `SQLite` error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Requested store version has never been committed
    #[error("Version not found: {0}")]
    VersionNotFound(VersionId),

    /// Entity not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Source collaborator failed
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// A synchronization run failed and every write since `begin` was discarded
    #[error("Backup aborted, rolled back {rolled_back_playlists} playlist(s): {reason}")]
    TransactionAborted {
        rolled_back_playlists: usize,
        reason: String,
    },
}
