//! Restoring a playlist as it stood at an earlier version.
//!
//! Planning reads the live memberships at the requested point in time; the
//! executor adds those videos to a remote playlist. Like pruning, the store
//! is never written.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::db::{AsOf, VersionedStore};
use crate::error::{Error, Result};
use crate::models::{Playlist, VersionId, WATCH_LATER_PLAYLIST_ID};

/// Where restored videos go
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RestoreTarget {
    /// An existing remote playlist
    Existing(String),
    /// A playlist the executor creates with this title
    New(String),
}

/// One video to add, in playlist order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestoreVideo {
    pub video_id: String,
    pub title: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestorePlan {
    pub source_playlist_id: String,
    /// Version the memberships were read at
    pub version: VersionId,
    pub target: RestoreTarget,
    pub videos: Vec<RestoreVideo>,
}

impl RestorePlan {
    /// Description for a playlist created by the restore
    #[must_use]
    pub fn created_description(&self) -> String {
        format!(
            "Restored from {} (version {})",
            self.source_playlist_id, self.version
        )
    }
}

/// What an executor reports back
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestoreReceipt {
    /// Playlist the videos were added to (the new id when one was created)
    pub playlist_id: String,
    /// Video ids actually added
    pub added: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestoreOutcome {
    pub playlist_id: String,
    pub added: Vec<String>,
    pub failed: Vec<String>,
}

/// Remote playlist writer
pub trait RestoreExecutor {
    /// Create the target if needed and add every video in order
    fn restore(&mut self, plan: &RestorePlan) -> Result<RestoreReceipt>;
}

/// Whether `playlist_id` names Watch Later, which cannot be written to
fn is_watch_later(playlist_id: &str, watch_later_playlist_id: &str) -> bool {
    playlist_id.eq_ignore_ascii_case(WATCH_LATER_PLAYLIST_ID)
        || playlist_id == watch_later_playlist_id
}

/// Collect the videos of `playlist_id` live at `at`, ordered by position.
///
/// Watch Later may be restored from but never to. A playlist with no live
/// memberships at that point is `NotFound`.
pub fn plan_restore(
    store: &VersionedStore,
    playlist_id: &str,
    at: AsOf,
    target: RestoreTarget,
    watch_later_playlist_id: &str,
) -> Result<RestorePlan> {
    match &target {
        RestoreTarget::Existing(id) if is_watch_later(id, watch_later_playlist_id) => {
            return Err(Error::InvalidInput(
                "Cannot restore to Watch Later; pick another playlist".to_string(),
            ));
        }
        RestoreTarget::Existing(id) if id.trim().is_empty() => {
            return Err(Error::InvalidInput(
                "Target playlist id is empty".to_string(),
            ));
        }
        RestoreTarget::New(title) if title.trim().is_empty() => {
            return Err(Error::InvalidInput(
                "New playlist title is empty".to_string(),
            ));
        }
        _ => {}
    }

    let version = store.resolve(at)?;
    let entries = store.list_playlist_entries(playlist_id, AsOf::Version(version), false)?;
    if entries.is_empty() {
        let known = store
            .get::<Playlist>(playlist_id, AsOf::Version(version))?
            .is_some();
        return Err(Error::NotFound(if known {
            format!("Playlist {playlist_id} has no items at version {version}")
        } else {
            format!("Playlist {playlist_id} is not in the backup at version {version}")
        }));
    }

    let plan = RestorePlan {
        source_playlist_id: playlist_id.to_string(),
        version,
        target,
        videos: entries
            .iter()
            .map(|entry| RestoreVideo {
                video_id: entry.item.video_id.clone(),
                title: entry.title().map(str::to_string),
            })
            .collect(),
    };

    tracing::info!(
        "Planned restore of {} video(s) from {playlist_id} at version {version}",
        plan.videos.len()
    );
    Ok(plan)
}

/// Run a plan through an executor and sort videos into added and failed
pub fn execute_restore<E>(executor: &mut E, plan: &RestorePlan) -> Result<RestoreOutcome>
where
    E: RestoreExecutor + ?Sized,
{
    let receipt = executor.restore(plan)?;

    // A video can sit in a playlist more than once.
    let mut added = HashMap::<&str, usize>::new();
    for video_id in &receipt.added {
        *added.entry(video_id.as_str()).or_default() += 1;
    }

    let mut outcome = RestoreOutcome {
        playlist_id: receipt.playlist_id.clone(),
        ..RestoreOutcome::default()
    };
    for video in &plan.videos {
        match added.get_mut(video.video_id.as_str()) {
            Some(count) if *count > 0 => {
                *count -= 1;
                outcome.added.push(video.video_id.clone());
            }
            _ => outcome.failed.push(video.video_id.clone()),
        }
    }

    if !outcome.failed.is_empty() {
        tracing::warn!(
            "{} of {} video(s) could not be restored to {}",
            outcome.failed.len(),
            plan.videos.len(),
            outcome.playlist_id
        );
    }
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PlaylistItem, Video};
    use pretty_assertions::assert_eq;

    /// Adds everything except unavailable videos.
    struct SkipUnavailable;

    impl RestoreExecutor for SkipUnavailable {
        fn restore(&mut self, plan: &RestorePlan) -> Result<RestoreReceipt> {
            let playlist_id = match &plan.target {
                RestoreTarget::Existing(id) => id.clone(),
                RestoreTarget::New(_) => "PLnew".to_string(),
            };
            Ok(RestoreReceipt {
                playlist_id,
                added: plan
                    .videos
                    .iter()
                    .filter(|video| video.title.as_deref() != Some("[Deleted video]"))
                    .map(|video| video.video_id.clone())
                    .collect(),
            })
        }
    }

    fn write_run(store: &mut VersionedStore, videos: &[&str]) {
        let mut tx = store.begin().unwrap();
        let now = tx.now();
        tx.upsert(&Playlist::new("PL1", "Music").first_seen(now))
            .unwrap();
        for (position, video) in (0_i64..).zip(videos) {
            tx.upsert(&Video {
                title: Some(if *video == "x" {
                    "[Deleted video]".to_string()
                } else {
                    format!("Song {video}")
                }),
                ..Video::new(*video).first_seen(now)
            })
            .unwrap();
            let item = PlaylistItem::new(format!("PL1_{video}"), "PL1", *video, position);
            tx.upsert(&item.first_seen(now)).unwrap();
        }
        tx.commit().unwrap();
    }

    fn video_ids(plan: &RestorePlan) -> Vec<&str> {
        plan.videos.iter().map(|video| video.video_id.as_str()).collect()
    }

    fn to_existing() -> RestoreTarget {
        RestoreTarget::Existing("PLtarget".to_string())
    }

    #[test]
    fn test_plan_reads_memberships_at_version() {
        let mut store = VersionedStore::open_in_memory().unwrap();
        write_run(&mut store, &["b", "a", "c"]);
        // Second run reorders and drops a membership; version 1 is untouched.
        let mut tx = store.begin().unwrap();
        let now = tx.now();
        let mut item = tx.current::<PlaylistItem>("PL1_c").unwrap().unwrap();
        item.removed_upstream_at = Some(now);
        tx.upsert(&item).unwrap();
        tx.commit().unwrap();

        let old = plan_restore(&store, "PL1", AsOf::Version(1), to_existing(), "WL").unwrap();
        assert_eq!(old.version, 1);
        assert_eq!(video_ids(&old), vec!["b", "a", "c"]);
        assert_eq!(old.videos[0].title.as_deref(), Some("Song b"));

        let latest = plan_restore(&store, "PL1", AsOf::Latest, to_existing(), "WL").unwrap();
        assert_eq!(video_ids(&latest), vec!["b", "a"]);
    }

    #[test]
    fn test_watch_later_is_never_a_target() {
        let mut store = VersionedStore::open_in_memory().unwrap();
        write_run(&mut store, &["a"]);

        for target in ["WL", "wl", "MYWL"] {
            let result = plan_restore(
                &store,
                "PL1",
                AsOf::Latest,
                RestoreTarget::Existing(target.to_string()),
                "MYWL",
            );
            assert!(matches!(result, Err(Error::InvalidInput(_))), "{target}");
        }
        assert!(matches!(
            plan_restore(&store, "PL1", AsOf::Latest, RestoreTarget::New("  ".into()), "WL"),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_missing_playlist_or_version() {
        let mut store = VersionedStore::open_in_memory().unwrap();
        write_run(&mut store, &["a"]);

        assert!(matches!(
            plan_restore(&store, "PLnope", AsOf::Latest, to_existing(), "WL"),
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            plan_restore(&store, "PL1", AsOf::Version(0), to_existing(), "WL"),
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            plan_restore(&store, "PL1", AsOf::Version(9), to_existing(), "WL"),
            Err(Error::VersionNotFound(9))
        ));
    }

    #[test]
    fn test_execute_sorts_added_and_failed() {
        let mut store = VersionedStore::open_in_memory().unwrap();
        write_run(&mut store, &["a", "x", "b"]);
        let plan = plan_restore(
            &store,
            "PL1",
            AsOf::Latest,
            RestoreTarget::New("Music again".to_string()),
            "WL",
        )
        .unwrap();

        let outcome = execute_restore(&mut SkipUnavailable, &plan).unwrap();

        assert_eq!(outcome.playlist_id, "PLnew");
        assert_eq!(outcome.added, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(outcome.failed, vec!["x".to_string()]);
        assert_eq!(store.latest_version().unwrap(), 1);
        assert_eq!(plan.created_description(), "Restored from PL1 (version 1)");
    }
}
