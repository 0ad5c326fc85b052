//! Set differences between two committed versions

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::db::{AsOf, Table, VersionedStore};
use crate::error::Result;
use crate::models::VersionId;

/// Identities that appeared and disappeared between two versions of one table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetDiff {
    pub added: BTreeSet<String>,
    pub removed: BTreeSet<String>,
}

impl SetDiff {
    fn between(from: &BTreeSet<String>, to: &BTreeSet<String>) -> Self {
        Self {
            added: to.difference(from).cloned().collect(),
            removed: from.difference(to).cloned().collect(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Differences between versions `from` and `to` across every versioned table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreDiff {
    pub from: VersionId,
    pub to: VersionId,
    pub playlists: SetDiff,
    pub videos: SetDiff,
    pub playlist_items: SetDiff,
}

impl StoreDiff {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.playlists.is_empty() && self.videos.is_empty() && self.playlist_items.is_empty()
    }

    /// Per-table diff
    #[must_use]
    pub const fn table(&self, table: Table) -> &SetDiff {
        match table {
            Table::Playlists => &self.playlists,
            Table::Videos => &self.videos,
            Table::PlaylistItems => &self.playlist_items,
        }
    }
}

/// Compute what was added and removed going from version `from` to `to`.
///
/// Rows marked as removed upstream count as absent. Both versions must have
/// been committed (or be `0`, the empty store).
pub fn diff(store: &VersionedStore, from: VersionId, to: VersionId) -> Result<StoreDiff> {
    // Resolve both ends before reading anything so a bad version yields no partial result.
    store.resolve(AsOf::Version(from))?;
    store.resolve(AsOf::Version(to))?;

    let mut result = StoreDiff {
        from,
        to,
        ..StoreDiff::default()
    };
    for table in Table::ALL {
        let before = store.read_set(table, from)?;
        let after = store.read_set(table, to)?;
        let set_diff = SetDiff::between(&before, &after);
        match table {
            Table::Playlists => result.playlists = set_diff,
            Table::Videos => result.videos = set_diff,
            Table::PlaylistItems => result.playlist_items = set_diff,
        }
    }

    tracing::debug!(
        "Diffed version {from} -> {to}: +{} / -{} items",
        result.playlist_items.added.len(),
        result.playlist_items.removed.len()
    );
    Ok(result)
}
