use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] ytm_core::Error),
    #[error(transparent)]
    Fetch(#[from] ytm_core::source::FetchError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Unrecognized time '{0}': use RFC 3339 or YYYY-MM-DD [HH:MM:SS]")]
    InvalidTime(String),
    #[error("Specify one of --older-than, --count or --all")]
    MissingPrunePolicy,
    #[error("Prune executor failed: {0}")]
    PruneExecutor(String),
    #[error("Restore executor failed: {0}")]
    RestoreExecutor(String),
    #[error("No backup at {}: run `ytm backup` first", .0.display())]
    StoreNotFound(PathBuf),
}
