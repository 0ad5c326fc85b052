//! Store version model

use serde::{Deserialize, Serialize};

/// Monotonically increasing store version number.
///
/// Version `0` is the empty store that exists before the first committed run.
pub type VersionId = i64;

/// An immutable, fully committed state of the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreVersion {
    pub version: VersionId,
    /// Commit wall-clock time (Unix ms)
    pub committed_at: i64,
    /// Number of row versions written by the run
    pub changes: i64,
}
