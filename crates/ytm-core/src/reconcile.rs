//! Merging fetched snapshots into the versioned store

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::db::{Record, SyncTransaction};
use crate::error::Result;
use crate::models::{Playlist, PlaylistItem, Video};
use crate::source::{Completeness, PlaylistSnapshot};

/// Outcome of reconciling one playlist
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    pub playlist_id: String,
    pub videos_upserted: usize,
    pub items_upserted: usize,
    /// Memberships newly marked as removed upstream
    pub items_removed: usize,
    /// Set when removal marking was skipped because the fetch was partial
    pub removal_skipped: Option<String>,
}

/// Applies observations to an open synchronization run.
///
/// Every entity goes through an explicit lookup followed by either a first
/// insert or a merge into the stored row.
pub struct Reconciler<'t, 'a> {
    tx: &'t mut SyncTransaction<'a>,
}

impl<'t, 'a> Reconciler<'t, 'a> {
    pub fn new(tx: &'t mut SyncTransaction<'a>) -> Self {
        Self { tx }
    }

    fn now(&self) -> i64 {
        self.tx.now()
    }

    /// Insert or merge one playlist
    pub fn upsert_playlist(&mut self, incoming: &Playlist) -> Result<()> {
        let now = self.now();
        let merged = match self.tx.current::<Playlist>(&incoming.playlist_id)? {
            Some(mut stored) => {
                stored.observe(incoming, now);
                stored
            }
            None => incoming.clone().first_seen(now),
        };
        self.tx.upsert(&merged)
    }

    /// Insert or merge one video
    pub fn upsert_video(&mut self, incoming: &Video) -> Result<()> {
        let now = self.now();
        let merged = match self.tx.current::<Video>(&incoming.video_id)? {
            Some(mut stored) => {
                stored.observe(incoming, now);
                stored
            }
            None => incoming.clone().first_seen(now),
        };
        self.tx.upsert(&merged)
    }

    /// Insert or merge one membership
    pub fn upsert_playlist_item(&mut self, incoming: &PlaylistItem) -> Result<()> {
        let now = self.now();
        let merged = match self.tx.current::<PlaylistItem>(&incoming.item_id)? {
            Some(mut stored) => {
                stored.observe(incoming, now);
                stored
            }
            None => incoming.clone().first_seen(now),
        };
        self.tx.upsert(&merged)
    }

    /// Mark live memberships of `playlist_id` missing from `seen` as removed.
    ///
    /// Only call this with the ids of a complete enumeration.
    pub fn mark_removed_items(&mut self, playlist_id: &str, seen: &HashSet<&str>) -> Result<usize> {
        let now = self.now();
        let mut removed = 0;

        for item_id in self.tx.live_item_ids(playlist_id)? {
            if seen.contains(item_id.as_str()) {
                continue;
            }
            if let Some(mut item) = self.tx.current::<PlaylistItem>(&item_id)? {
                item.removed_upstream_at = Some(now);
                self.tx.upsert(&item)?;
                removed += 1;
            }
        }

        if removed > 0 {
            tracing::info!("Marked {removed} item(s) of {playlist_id} as removed upstream");
        }
        Ok(removed)
    }

    /// Merge a playlist snapshot, marking removals only for complete fetches
    pub fn sync_playlist(
        &mut self,
        snapshot: &PlaylistSnapshot,
        completeness: &Completeness,
    ) -> Result<SyncReport> {
        let playlist_id = snapshot.playlist.playlist_id.clone();
        self.upsert_playlist(&snapshot.playlist)?;

        for video in &snapshot.videos {
            self.upsert_video(video)?;
        }
        for item in &snapshot.items {
            self.upsert_playlist_item(item)?;
        }

        let mut report = SyncReport {
            playlist_id,
            videos_upserted: snapshot.videos.len(),
            items_upserted: snapshot.items.len(),
            ..SyncReport::default()
        };

        match completeness {
            Completeness::Complete => {
                let seen = snapshot
                    .items
                    .iter()
                    .map(|item| item.item_id.as_str())
                    .collect::<HashSet<_>>();
                report.items_removed = self.mark_removed_items(&report.playlist_id, &seen)?;
            }
            Completeness::Partial { reason } => {
                tracing::warn!(
                    "Skipping removal marking for {}: {reason}",
                    report.playlist_id
                );
                report.removal_skipped = Some(reason.clone());
            }
        }

        tracing::debug!(
            "Synced {} ({} items, {} removed)",
            report.playlist_id,
            report.items_upserted,
            report.items_removed
        );
        Ok(report)
    }

    /// Mark live playlists that a complete listing no longer reports.
    ///
    /// Ids in `keep` are never marked; Watch Later is absent from every
    /// listing yet still exists.
    pub fn mark_missing_playlists(
        &mut self,
        listed: &HashSet<&str>,
        keep: &HashSet<&str>,
    ) -> Result<Vec<String>> {
        let now = self.now();
        let mut removed = Vec::new();

        for playlist_id in self.tx.live_playlist_ids()? {
            if listed.contains(playlist_id.as_str()) || keep.contains(playlist_id.as_str()) {
                continue;
            }
            if let Some(mut playlist) = self.tx.current::<Playlist>(&playlist_id)? {
                playlist.removed_upstream_at = Some(now);
                self.tx.upsert(&playlist)?;
                tracing::info!("Playlist {} is gone upstream", playlist.key());
                removed.push(playlist_id);
            }
        }

        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{AsOf, Table, VersionedStore};
    use crate::diff::diff;
    use crate::models::VersionId;
    use pretty_assertions::assert_eq;

    fn setup() -> VersionedStore {
        VersionedStore::open_in_memory().unwrap()
    }

    fn snapshot(playlist_id: &str, video_ids: &[&str]) -> PlaylistSnapshot {
        PlaylistSnapshot {
            playlist: Playlist::new(playlist_id, format!("Playlist {playlist_id}")),
            videos: video_ids
                .iter()
                .map(|id| Video {
                    title: Some(format!("Video {id}")),
                    ..Video::new(*id)
                })
                .collect(),
            items: (0_i64..)
                .zip(video_ids.iter())
                .map(|(position, id)| {
                    PlaylistItem::new(
                        PlaylistItem::derived_id(playlist_id, id),
                        playlist_id,
                        *id,
                        position,
                    )
                })
                .collect(),
        }
    }

    fn run(
        store: &mut VersionedStore,
        snapshot: &PlaylistSnapshot,
        completeness: &Completeness,
    ) -> (VersionId, SyncReport) {
        let mut tx = store.begin().unwrap();
        let report = Reconciler::new(&mut tx)
            .sync_playlist(snapshot, completeness)
            .unwrap();
        (tx.commit().unwrap().version, report)
    }

    fn partial() -> Completeness {
        Completeness::Partial {
            reason: "page 2 timed out".to_string(),
        }
    }

    #[test]
    fn test_identical_snapshot_twice_only_advances_observation() {
        let mut store = setup();
        let snap = snapshot("PL1", &["a", "b"]);
        let (v1, _) = run(&mut store, &snap, &Completeness::Complete);
        let before: PlaylistItem = store.get("PL1_a", AsOf::Version(v1)).unwrap().unwrap();

        let (v2, report) = run(&mut store, &snap, &Completeness::Complete);
        let after: PlaylistItem = store.get("PL1_a", AsOf::Version(v2)).unwrap().unwrap();

        assert_eq!(report.items_removed, 0);
        assert!(diff(&store, v1, v2).unwrap().is_empty());
        assert_eq!(
            after,
            PlaylistItem {
                last_observed_at: after.last_observed_at,
                ..before.clone()
            }
        );
        assert!(after.last_observed_at >= before.last_observed_at);
        assert_eq!(after.first_observed_at, before.first_observed_at);
    }

    #[test]
    fn test_missing_member_of_complete_snapshot_is_removed() {
        let mut store = setup();
        run(&mut store, &snapshot("PL1", &["a", "b"]), &Completeness::Complete);
        let (v2, report) = run(&mut store, &snapshot("PL1", &["a"]), &Completeness::Complete);

        assert_eq!(report.items_removed, 1);
        let live = store
            .list_playlist_items("PL1", AsOf::Version(v2), false)
            .unwrap();
        assert_eq!(live.len(), 1);
        assert_eq!(live[0].video_id, "a");

        let all = store
            .list_playlist_items("PL1", AsOf::Version(v2), true)
            .unwrap();
        assert_eq!(all.len(), 2);
        let gone = all.iter().find(|item| item.video_id == "b").unwrap();
        assert!(gone.is_removed());
    }

    #[test]
    fn test_partial_snapshot_never_marks_removals() {
        let mut store = setup();
        run(&mut store, &snapshot("PL1", &["a", "b"]), &Completeness::Complete);
        let (v2, report) = run(&mut store, &snapshot("PL1", &["a"]), &partial());

        assert_eq!(report.items_removed, 0);
        assert_eq!(report.removal_skipped.as_deref(), Some("page 2 timed out"));
        assert_eq!(
            store
                .list_playlist_items("PL1", AsOf::Version(v2), false)
                .unwrap()
                .len(),
            2
        );
    }

    #[test]
    fn test_reappearance_clears_removal() {
        let mut store = setup();
        run(&mut store, &snapshot("PL1", &["a", "b"]), &Completeness::Complete);
        let (v2, _) = run(&mut store, &snapshot("PL1", &["a"]), &Completeness::Complete);
        let (v3, _) = run(&mut store, &snapshot("PL1", &["a", "b"]), &Completeness::Complete);

        let at_v2: PlaylistItem = store.get("PL1_b", AsOf::Version(v2)).unwrap().unwrap();
        let at_v3: PlaylistItem = store.get("PL1_b", AsOf::Version(v3)).unwrap().unwrap();
        assert!(at_v2.is_removed());
        assert_eq!(at_v3.removed_upstream_at, None);
    }

    #[test]
    fn test_video_fields_accumulate_across_sources() {
        let mut store = setup();
        let mut first = snapshot("PL1", &["a"]);
        first.videos[0] = Video {
            title: Some("Only title".to_string()),
            ..Video::new("a")
        };
        run(&mut store, &first, &Completeness::Complete);

        let mut second = snapshot("PL1", &["a"]);
        second.videos[0] = Video {
            duration_seconds: Some(240),
            ..Video::new("a")
        };
        run(&mut store, &second, &Completeness::Complete);

        let video: Video = store.get("a", AsOf::Latest).unwrap().unwrap();
        assert_eq!(video.title.as_deref(), Some("Only title"));
        assert_eq!(video.duration_seconds, Some(240));
    }

    #[test]
    fn test_missing_playlists_marked_except_kept() {
        let mut store = setup();
        let mut tx = store.begin().unwrap();
        let mut reconciler = Reconciler::new(&mut tx);
        for id in ["PL1", "PL2", "WL"] {
            reconciler.upsert_playlist(&Playlist::new(id, id)).unwrap();
        }
        tx.commit().unwrap();

        let mut tx = store.begin().unwrap();
        let removed = Reconciler::new(&mut tx)
            .mark_missing_playlists(&HashSet::from(["PL1"]), &HashSet::from(["WL"]))
            .unwrap();
        let version = tx.commit().unwrap().version;

        assert_eq!(removed, vec!["PL2".to_string()]);
        let live = store.read_set(Table::Playlists, version).unwrap();
        assert_eq!(
            live.into_iter().collect::<Vec<_>>(),
            vec!["PL1".to_string(), "WL".to_string()]
        );
    }
}
