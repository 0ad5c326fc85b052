//! Synchronization run transaction

use rusqlite::{Connection, OptionalExtension, Transaction, TransactionBehavior};

use super::record::{self, Record};
use super::store::latest_version;
use crate::error::Result;
use crate::models::{StoreVersion, VersionId};
use crate::util::now_millis;

/// All writes of one synchronization run.
///
/// Rows written here are stamped with the pending version, which no read
/// can see until `commit` records it in the version log. Dropping the
/// transaction without committing rolls every write back.
pub struct SyncTransaction<'a> {
    tx: Transaction<'a>,
    base: VersionId,
    pending: VersionId,
    now: i64,
    changes: i64,
}

impl<'a> SyncTransaction<'a> {
    pub(crate) fn begin(conn: &'a mut Connection) -> Result<Self> {
        // Take the write lock up front so a second writer fails here instead
        // of halfway through a run.
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let base = latest_version(&tx)?;
        let now = now_millis();

        tracing::debug!("Began sync run on top of version {base}");
        Ok(Self {
            tx,
            base,
            pending: base + 1,
            now,
            changes: 0,
        })
    }

    /// Version the run will publish on commit
    pub const fn pending_version(&self) -> VersionId {
        self.pending
    }

    /// Newest committed version when the run began
    pub const fn base_version(&self) -> VersionId {
        self.base
    }

    /// Mutation time shared by every write of the run (Unix ms)
    pub const fn now(&self) -> i64 {
        self.now
    }

    /// Row versions written so far
    pub const fn changes(&self) -> i64 {
        self.changes
    }

    /// Newest value of a record, including writes made earlier in this run
    pub fn current<R: Record>(&self, key: &str) -> Result<Option<R>> {
        record::get_current(&self.tx, key)
    }

    /// Write a new value for a record.
    ///
    /// The previous committed row is closed at the pending version and the
    /// new value inserted beside it. A record already written by this run is
    /// rewritten in place, since no committed version can see that row.
    pub fn upsert<R: Record>(&mut self, value: &R) -> Result<()> {
        let table = R::TABLE;
        let sql = format!(
            "SELECT row_id, valid_from FROM {} WHERE {} = ?1 AND valid_to IS NULL",
            table.name(),
            table.key_column(),
        );
        let current: Option<(i64, VersionId)> = self
            .tx
            .query_row(&sql, [value.key()], |row| Ok((row.get(0)?, row.get(1)?)))
            .optional()?;

        match current {
            Some((row_id, valid_from)) if valid_from == self.pending => {
                record::rewrite_row(&self.tx, row_id, value)?;
            }
            Some((row_id, _)) => {
                self.tx.execute(
                    &format!("UPDATE {} SET valid_to = ?1 WHERE row_id = ?2", table.name()),
                    rusqlite::params![self.pending, row_id],
                )?;
                record::insert_row(&self.tx, value, self.pending)?;
                self.changes += 1;
            }
            None => {
                record::insert_row(&self.tx, value, self.pending)?;
                self.changes += 1;
            }
        }

        tracing::trace!("Wrote {} {}", table.name(), value.key());
        Ok(())
    }

    /// Ids of the live memberships of a playlist, as this run currently sees them
    pub fn live_item_ids(&self, playlist_id: &str) -> Result<Vec<String>> {
        let mut stmt = self.tx.prepare(
            "SELECT item_id FROM playlist_items
             WHERE playlist_id = ?1 AND valid_to IS NULL AND removed_upstream_at IS NULL
             ORDER BY item_id",
        )?;

        let ids = stmt
            .query_map([playlist_id], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(ids)
    }

    /// Ids of the live playlists, as this run currently sees them
    pub fn live_playlist_ids(&self) -> Result<Vec<String>> {
        let mut stmt = self.tx.prepare(
            "SELECT playlist_id FROM playlists
             WHERE valid_to IS NULL AND removed_upstream_at IS NULL
             ORDER BY playlist_id",
        )?;

        let ids = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(ids)
    }

    /// Publish every write of the run as exactly one new version
    pub fn commit(self) -> Result<StoreVersion> {
        let last_committed_at = self.tx.query_row(
            "SELECT MAX(committed_at) FROM versions",
            [],
            |row| row.get::<_, Option<i64>>(0),
        )?;
        // Keep commit timestamps non-decreasing even if the wall clock steps back.
        let committed_at = last_committed_at.map_or_else(now_millis, |last| now_millis().max(last));

        self.tx.execute(
            "INSERT INTO versions (version, committed_at, changes) VALUES (?1, ?2, ?3)",
            rusqlite::params![self.pending, committed_at, self.changes],
        )?;
        self.tx.commit()?;

        tracing::info!(
            "Committed version {} ({} row versions)",
            self.pending,
            self.changes
        );
        Ok(StoreVersion {
            version: self.pending,
            committed_at,
            changes: self.changes,
        })
    }

    /// Discard every write of the run
    pub fn rollback(self) -> Result<()> {
        let discarded = self.changes;
        self.tx.rollback()?;
        tracing::warn!(
            "Rolled back pending version {} ({discarded} row versions discarded)",
            self.pending
        );
        Ok(())
    }
}
