//! Planning remote removals from a backed-up playlist.
//!
//! The store is read to decide what to remove but never written: the local
//! backup keeps every membership, and remote deletions show up as removals
//! after the next synchronization run.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::db::{AsOf, VersionedStore};
use crate::error::{Error, Result};
use crate::models::{Playlist, PlaylistEntry, VersionId};
use crate::retention::{select_older_than, RetentionThreshold};

/// Default number of removals attempted per executor session
pub const DEFAULT_BATCH_SIZE: usize = 50;

/// Which memberships to remove
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PrunePolicy {
    /// Everything strictly older than the threshold
    OlderThan(RetentionThreshold),
    /// The `n` oldest memberships
    Oldest(usize),
    /// Every live membership
    All,
}

/// One membership selected for removal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PruneTarget {
    pub item_id: String,
    pub video_id: String,
    pub title: Option<String>,
    /// Effective age timestamp (Unix ms), if resolvable
    pub age_timestamp: Option<i64>,
}

/// Removals to hand to an executor, oldest first
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrunePlan {
    pub playlist_id: String,
    /// Version the selection was made against
    pub version: VersionId,
    pub policy: PrunePolicy,
    /// This batch
    pub targets: Vec<PruneTarget>,
    /// How many memberships the policy selected before batching
    pub selected: usize,
}

impl PrunePlan {
    /// Whether the policy selected more than one batch holds
    #[must_use]
    pub fn has_more(&self) -> bool {
        self.selected > self.targets.len()
    }
}

/// Result of executing a plan
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PruneOutcome {
    pub removed: Vec<String>,
    pub failed: Vec<String>,
}

/// Remote removal collaborator (browser automation or similar)
pub trait PruneExecutor {
    /// Attempt to remove every target; return the item ids actually removed
    fn remove(&mut self, plan: &PrunePlan) -> Result<Vec<String>>;
}

/// Select the memberships of `playlist_id` to remove under `policy`.
///
/// Selection is made against the latest committed version, ignoring
/// memberships already marked as removed, and capped at `batch_size`.
pub fn plan_prune(
    store: &VersionedStore,
    playlist_id: &str,
    policy: PrunePolicy,
    batch_size: usize,
    now: i64,
) -> Result<PrunePlan> {
    if batch_size == 0 {
        return Err(Error::InvalidInput(
            "Prune batch size must be at least 1".to_string(),
        ));
    }

    let version = store.resolve(AsOf::Latest)?;
    let mut entries = store.list_playlist_entries(playlist_id, AsOf::Version(version), false)?;
    if entries.is_empty()
        && store
            .get::<Playlist>(playlist_id, AsOf::Version(version))?
            .is_none()
    {
        return Err(Error::NotFound(format!(
            "Playlist {playlist_id} is not in the backup"
        )));
    }

    // Oldest first; memberships without any timestamp go last.
    entries.sort_by_key(|entry| {
        (
            entry.item.age_timestamp().unwrap_or(i64::MAX),
            entry.item.position,
        )
    });

    let selected: Vec<&PlaylistEntry> = match policy {
        PrunePolicy::OlderThan(threshold) => {
            let old = select_older_than(entries.iter().map(|entry| &entry.item), threshold, now)
                .into_iter()
                .map(|item| item.item_id.as_str())
                .collect::<HashSet<_>>();
            entries
                .iter()
                .filter(|entry| old.contains(entry.item.item_id.as_str()))
                .collect()
        }
        PrunePolicy::Oldest(count) => entries.iter().take(count).collect(),
        PrunePolicy::All => entries.iter().collect(),
    };

    let plan = PrunePlan {
        playlist_id: playlist_id.to_string(),
        version,
        policy,
        selected: selected.len(),
        targets: selected
            .into_iter()
            .take(batch_size)
            .map(|entry| PruneTarget {
                item_id: entry.item.item_id.clone(),
                video_id: entry.item.video_id.clone(),
                title: entry.title().map(str::to_string),
                age_timestamp: entry.item.age_timestamp(),
            })
            .collect(),
    };

    tracing::info!(
        "Planned {} of {} removal(s) from {playlist_id} at version {version}",
        plan.targets.len(),
        plan.selected
    );
    Ok(plan)
}

/// Run a plan through an executor and sort targets into removed and failed
pub fn execute<E>(executor: &mut E, plan: &PrunePlan) -> Result<PruneOutcome>
where
    E: PruneExecutor + ?Sized,
{
    if plan.targets.is_empty() {
        return Ok(PruneOutcome::default());
    }

    let removed = executor.remove(plan)?.into_iter().collect::<HashSet<_>>();
    let mut outcome = PruneOutcome::default();
    for target in &plan.targets {
        if removed.contains(&target.item_id) {
            outcome.removed.push(target.item_id.clone());
        } else {
            outcome.failed.push(target.item_id.clone());
        }
    }

    if !outcome.failed.is_empty() {
        tracing::warn!(
            "{} of {} removal(s) from {} failed",
            outcome.failed.len(),
            plan.targets.len(),
            plan.playlist_id
        );
    }
    Ok(outcome)
}
