//! Versioned store: point-in-time reads over the row-versioned tables

use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use rusqlite::{Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

use super::record::{self, column_list, visible_at, Record, RowVersion, Table};
use super::{Database, SyncTransaction};
use crate::error::{Error, Result};
use crate::models::{Playlist, PlaylistEntry, PlaylistItem, StoreVersion, Video, VersionId};

/// Point in history a read is evaluated at
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AsOf {
    /// Newest committed version
    #[default]
    Latest,
    /// A specific committed version
    Version(VersionId),
    /// Newest version committed at or before this instant (Unix ms)
    Time(i64),
}

/// Handle to the append-only, multi-version playlist store.
///
/// Constructed once and passed by reference to everything that reads or
/// writes history. Writes only happen through [`SyncTransaction`].
pub struct VersionedStore {
    db: Database,
}

impl VersionedStore {
    /// Open (or create) a store at `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::from_database(Database::open(path)?))
    }

    /// Open an in-memory store (useful for testing)
    pub fn open_in_memory() -> Result<Self> {
        Ok(Self::from_database(Database::open_in_memory()?))
    }

    /// Wrap an already migrated database
    pub const fn from_database(db: Database) -> Self {
        Self { db }
    }

    /// Close the store
    pub fn close(self) -> Result<()> {
        self.db.close()
    }

    fn conn(&self) -> &Connection {
        self.db.connection()
    }

    /// Begin a synchronization run.
    ///
    /// Every write made through the returned transaction becomes visible as
    /// one new version on `commit`, or disappears on `rollback`/drop.
    pub fn begin(&mut self) -> Result<SyncTransaction<'_>> {
        SyncTransaction::begin(self.db.connection_mut())
    }

    /// Newest committed version, `0` when nothing was ever committed
    pub fn latest_version(&self) -> Result<VersionId> {
        latest_version(self.conn())
    }

    /// Metadata for one committed version
    pub fn version(&self, version: VersionId) -> Result<Option<StoreVersion>> {
        let found = self
            .conn()
            .query_row(
                "SELECT version, committed_at, changes FROM versions WHERE version = ?1",
                [version],
                parse_version,
            )
            .optional()?;
        Ok(found)
    }

    /// All committed versions, newest first
    pub fn list_versions(&self) -> Result<Vec<StoreVersion>> {
        let mut stmt = self.conn().prepare(
            "SELECT version, committed_at, changes FROM versions ORDER BY version DESC",
        )?;

        let versions = stmt
            .query_map([], parse_version)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(versions)
    }

    /// Resolve a point in history to a concrete version.
    ///
    /// Version `0` names the empty store. Versions that were never committed
    /// are reported as [`Error::VersionNotFound`].
    pub fn resolve(&self, at: AsOf) -> Result<VersionId> {
        match at {
            AsOf::Latest => self.latest_version(),
            AsOf::Version(0) => Ok(0),
            AsOf::Version(version) => {
                if self.version(version)?.is_some() {
                    Ok(version)
                } else {
                    Err(Error::VersionNotFound(version))
                }
            }
            AsOf::Time(at_millis) => {
                let version = self.conn().query_row(
                    "SELECT MAX(version) FROM versions WHERE committed_at <= ?1",
                    [at_millis],
                    |row| row.get::<_, Option<VersionId>>(0),
                )?;
                Ok(version.unwrap_or(0))
            }
        }
    }

    /// Load one record as of a point in history
    pub fn get<R: Record>(&self, key: &str, at: AsOf) -> Result<Option<R>> {
        let version = self.resolve(at)?;
        record::get_at(self.conn(), key, version)
    }

    /// Every committed value a record has had, oldest first
    pub fn history<R: Record>(&self, key: &str) -> Result<Vec<RowVersion<R>>> {
        record::history(self.conn(), key, self.latest_version()?)
    }

    /// Playlists as of a point in history, ordered by title
    pub fn list_playlists(&self, at: AsOf, include_removed: bool) -> Result<Vec<Playlist>> {
        let version = self.resolve(at)?;
        let removed_filter = if include_removed {
            ""
        } else {
            "AND removed_upstream_at IS NULL"
        };
        let sql = format!(
            "SELECT {} FROM playlists WHERE {} {removed_filter} ORDER BY title, playlist_id",
            column_list::<Playlist>(),
            visible_at("?1"),
        );

        let mut stmt = self.conn().prepare(&sql)?;
        let playlists = stmt
            .query_map([version], Playlist::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(playlists)
    }

    /// Memberships of one playlist as of a point in history, by position
    pub fn list_playlist_items(
        &self,
        playlist_id: &str,
        at: AsOf,
        include_removed: bool,
    ) -> Result<Vec<PlaylistItem>> {
        let version = self.resolve(at)?;
        list_items_at(self.conn(), playlist_id, version, include_removed)
    }

    /// Memberships of one playlist joined with their videos as of the same version
    pub fn list_playlist_entries(
        &self,
        playlist_id: &str,
        at: AsOf,
        include_removed: bool,
    ) -> Result<Vec<PlaylistEntry>> {
        let version = self.resolve(at)?;
        let items = list_items_at(self.conn(), playlist_id, version, include_removed)?;

        let sql = format!(
            "SELECT {} FROM videos WHERE {} AND video_id IN (
                 SELECT video_id FROM playlist_items WHERE playlist_id = ?2 AND {}
             )",
            column_list::<Video>(),
            visible_at("?1"),
            visible_at("?1"),
        );
        let mut stmt = self.conn().prepare(&sql)?;
        let videos = stmt
            .query_map(rusqlite::params![version, playlist_id], Video::from_row)?
            .map(|video| video.map(|video| (video.video_id.clone(), video)))
            .collect::<rusqlite::Result<HashMap<_, _>>>()?;

        let entries = items
            .into_iter()
            .map(|item| {
                // Several memberships can point at the same video.
                let video = videos.get(&item.video_id).cloned();
                PlaylistEntry { item, video }
            })
            .collect();

        Ok(entries)
    }

    /// Identities of the live (not removed upstream) rows of `table` at `version`
    pub fn read_set(&self, table: Table, version: VersionId) -> Result<BTreeSet<String>> {
        let version = self.resolve(AsOf::Version(version))?;
        let removed_filter = table
            .removal_column()
            .map(|column| format!("AND {column} IS NULL"))
            .unwrap_or_default();
        let sql = format!(
            "SELECT {} FROM {} WHERE {} {removed_filter}",
            table.key_column(),
            table.name(),
            visible_at("?1"),
        );

        let mut stmt = self.conn().prepare(&sql)?;
        let keys = stmt
            .query_map([version], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<BTreeSet<_>>>()?;

        Ok(keys)
    }
}

pub(crate) fn latest_version(conn: &Connection) -> Result<VersionId> {
    let version = conn.query_row("SELECT MAX(version) FROM versions", [], |row| {
        row.get::<_, Option<VersionId>>(0)
    })?;
    Ok(version.unwrap_or(0))
}

fn parse_version(row: &rusqlite::Row<'_>) -> rusqlite::Result<StoreVersion> {
    Ok(StoreVersion {
        version: row.get(0)?,
        committed_at: row.get(1)?,
        changes: row.get(2)?,
    })
}

fn list_items_at(
    conn: &Connection,
    playlist_id: &str,
    version: VersionId,
    include_removed: bool,
) -> Result<Vec<PlaylistItem>> {
    let removed_filter = if include_removed {
        ""
    } else {
        "AND removed_upstream_at IS NULL"
    };
    let sql = format!(
        "SELECT {} FROM playlist_items WHERE playlist_id = ?2 AND {} {removed_filter}
         ORDER BY position, item_id",
        column_list::<PlaylistItem>(),
        visible_at("?1"),
    );

    let mut stmt = conn.prepare(&sql)?;
    let items = stmt
        .query_map(rusqlite::params![version, playlist_id], PlaylistItem::from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::thread::sleep;
    use std::time::Duration;

    fn setup() -> VersionedStore {
        VersionedStore::open_in_memory().unwrap()
    }

    fn commit_titles(store: &mut VersionedStore, titles: &[(&str, &str)]) -> VersionId {
        let mut tx = store.begin().unwrap();
        let now = tx.now();
        for (id, title) in titles {
            tx.upsert(&Playlist::new(*id, *title).first_seen(now)).unwrap();
        }
        tx.commit().unwrap().version
    }

    #[test]
    fn test_empty_store() {
        let store = setup();
        assert_eq!(store.latest_version().unwrap(), 0);
        assert!(store.list_versions().unwrap().is_empty());
        assert!(store.list_playlists(AsOf::Latest, false).unwrap().is_empty());
    }

    #[test]
    fn test_get_at_version_returns_value_committed_then() {
        let mut store = setup();
        let v1 = commit_titles(&mut store, &[("PL1", "First")]);
        let v2 = commit_titles(&mut store, &[("PL1", "Second")]);

        let at_v1: Playlist = store.get("PL1", AsOf::Version(v1)).unwrap().unwrap();
        let at_v2: Playlist = store.get("PL1", AsOf::Version(v2)).unwrap().unwrap();
        let latest: Playlist = store.get("PL1", AsOf::Latest).unwrap().unwrap();

        assert_eq!(at_v1.title, "First");
        assert_eq!(at_v2.title, "Second");
        assert_eq!(latest.title, "Second");
        assert!(store
            .get::<Playlist>("PL1", AsOf::Version(0))
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_get_at_time_uses_last_commit_before_instant() {
        let mut store = setup();
        commit_titles(&mut store, &[("PL1", "First")]);
        sleep(Duration::from_millis(5));
        let between = crate::util::now_millis();
        sleep(Duration::from_millis(5));
        commit_titles(&mut store, &[("PL1", "Second")]);

        let at_between: Playlist = store.get("PL1", AsOf::Time(between)).unwrap().unwrap();
        assert_eq!(at_between.title, "First");

        let before_everything: Option<Playlist> = store.get("PL1", AsOf::Time(0)).unwrap();
        assert!(before_everything.is_none());
    }

    #[test]
    fn test_unknown_version_is_lookup_failure() {
        let store = setup();
        let error = store.get::<Playlist>("PL1", AsOf::Version(7)).unwrap_err();
        assert!(matches!(error, Error::VersionNotFound(7)));
    }

    #[test]
    fn test_list_versions_newest_first() {
        let mut store = setup();
        commit_titles(&mut store, &[("PL1", "a")]);
        commit_titles(&mut store, &[("PL2", "b"), ("PL3", "c")]);

        let versions = store.list_versions().unwrap();
        assert_eq!(
            versions.iter().map(|v| v.version).collect::<Vec<_>>(),
            vec![2, 1]
        );
        assert_eq!(versions[0].changes, 2);
        assert!(versions[0].committed_at >= versions[1].committed_at);
    }

    #[test]
    fn test_list_playlists_sorted_by_title() {
        let mut store = setup();
        commit_titles(&mut store, &[("PL1", "Zebra"), ("PL2", "Apple")]);

        let titles = store
            .list_playlists(AsOf::Latest, false)
            .unwrap()
            .into_iter()
            .map(|playlist| playlist.title)
            .collect::<Vec<_>>();
        assert_eq!(titles, vec!["Apple", "Zebra"]);
    }

    #[test]
    fn test_history_lists_every_committed_value() {
        let mut store = setup();
        commit_titles(&mut store, &[("PL1", "First")]);
        commit_titles(&mut store, &[("PL1", "Second")]);

        let history = store.history::<Playlist>("PL1").unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].valid_from, 1);
        assert_eq!(history[0].valid_to, Some(2));
        assert_eq!(history[0].record.title, "First");
        assert_eq!(history[1].valid_to, None);
        assert_eq!(history[1].record.title, "Second");
    }

    #[test]
    fn test_read_set_excludes_removed_rows() {
        let mut store = setup();
        let mut tx = store.begin().unwrap();
        let now = tx.now();
        tx.upsert(&Playlist::new("PL1", "kept").first_seen(now))
            .unwrap();
        let mut gone = Playlist::new("PL2", "gone").first_seen(now);
        gone.removed_upstream_at = Some(now);
        tx.upsert(&gone).unwrap();
        let version = tx.commit().unwrap().version;

        let keys = store.read_set(Table::Playlists, version).unwrap();
        assert_eq!(keys, BTreeSet::from(["PL1".to_string()]));
    }

    #[test]
    fn test_entries_join_video_as_of_same_version() {
        let mut store = setup();
        let mut tx = store.begin().unwrap();
        let now = tx.now();
        tx.upsert(&Video {
            title: Some("Old".to_string()),
            ..Video::new("v1").first_seen(now)
        })
        .unwrap();
        tx.upsert(&PlaylistItem::new("i1", "PL1", "v1", 0).first_seen(now))
            .unwrap();
        tx.upsert(&PlaylistItem::new("i2", "PL1", "v1", 1).first_seen(now))
            .unwrap();
        let v1 = tx.commit().unwrap().version;

        let mut tx = store.begin().unwrap();
        let now = tx.now();
        tx.upsert(&Video {
            title: Some("New".to_string()),
            ..Video::new("v1").first_seen(now)
        })
        .unwrap();
        tx.commit().unwrap();

        let entries = store
            .list_playlist_entries("PL1", AsOf::Version(v1), false)
            .unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].title(), Some("Old"));
        assert_eq!(entries[1].title(), Some("Old"));

        let latest = store
            .list_playlist_entries("PL1", AsOf::Latest, false)
            .unwrap();
        assert_eq!(latest[0].title(), Some("New"));
    }
}
