//! Typed mapping between models and row-versioned tables

use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::{Playlist, PlaylistItem, Video, VersionId};

/// Row-versioned tables managed by the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Table {
    Playlists,
    Videos,
    PlaylistItems,
}

impl Table {
    /// Every versioned table, in dependency order
    pub const ALL: [Self; 3] = [Self::Playlists, Self::Videos, Self::PlaylistItems];

    /// SQL table name
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Playlists => "playlists",
            Self::Videos => "videos",
            Self::PlaylistItems => "playlist_items",
        }
    }

    /// Identity column
    #[must_use]
    pub const fn key_column(self) -> &'static str {
        match self {
            Self::Playlists => "playlist_id",
            Self::Videos => "video_id",
            Self::PlaylistItems => "item_id",
        }
    }

    /// Soft-delete column, for tables whose rows can be marked gone upstream
    #[must_use]
    pub const fn removal_column(self) -> Option<&'static str> {
        match self {
            Self::Playlists | Self::PlaylistItems => Some("removed_upstream_at"),
            Self::Videos => None,
        }
    }
}

/// A model stored in a row-versioned table.
///
/// `COLUMNS` lists the data columns in the order `to_values` produces and
/// `from_row` reads them; the identity column comes first.
pub trait Record: Sized {
    const TABLE: Table;
    const COLUMNS: &'static [&'static str];

    /// Identity value
    fn key(&self) -> &str;

    /// Column values in `COLUMNS` order
    fn to_values(&self) -> Vec<Value>;

    /// Parse a record from a row whose leading columns follow `COLUMNS`
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;
}

/// One stored version of a record with its validity range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowVersion<R> {
    /// Version that introduced this value
    pub valid_from: VersionId,
    /// Version that superseded it, if any
    pub valid_to: Option<VersionId>,
    pub record: R,
}

fn text(value: &str) -> Value {
    Value::Text(value.to_string())
}

fn opt_text(value: Option<&String>) -> Value {
    value.map_or(Value::Null, |value| Value::Text(value.clone()))
}

fn opt_int(value: Option<i64>) -> Value {
    value.map_or(Value::Null, Value::Integer)
}

impl Record for Playlist {
    const TABLE: Table = Table::Playlists;
    const COLUMNS: &'static [&'static str] = &[
        "playlist_id",
        "title",
        "description",
        "channel_id",
        "privacy_status",
        "item_count",
        "published_at",
        "first_observed_at",
        "last_observed_at",
        "removed_upstream_at",
    ];

    fn key(&self) -> &str {
        &self.playlist_id
    }

    fn to_values(&self) -> Vec<Value> {
        vec![
            text(&self.playlist_id),
            text(&self.title),
            text(&self.description),
            opt_text(self.channel_id.as_ref()),
            opt_text(self.privacy_status.as_ref()),
            Value::Integer(self.item_count),
            opt_int(self.published_at),
            Value::Integer(self.first_observed_at),
            Value::Integer(self.last_observed_at),
            opt_int(self.removed_upstream_at),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            playlist_id: row.get(0)?,
            title: row.get(1)?,
            description: row.get(2)?,
            channel_id: row.get(3)?,
            privacy_status: row.get(4)?,
            item_count: row.get(5)?,
            published_at: row.get(6)?,
            first_observed_at: row.get(7)?,
            last_observed_at: row.get(8)?,
            removed_upstream_at: row.get(9)?,
        })
    }
}

impl Record for Video {
    const TABLE: Table = Table::Videos;
    const COLUMNS: &'static [&'static str] = &[
        "video_id",
        "title",
        "description",
        "channel_id",
        "channel_title",
        "duration_seconds",
        "thumbnail_url",
        "published_at",
        "first_observed_at",
        "last_updated_at",
        "is_available",
    ];

    fn key(&self) -> &str {
        &self.video_id
    }

    fn to_values(&self) -> Vec<Value> {
        vec![
            text(&self.video_id),
            opt_text(self.title.as_ref()),
            opt_text(self.description.as_ref()),
            opt_text(self.channel_id.as_ref()),
            opt_text(self.channel_title.as_ref()),
            opt_int(self.duration_seconds),
            opt_text(self.thumbnail_url.as_ref()),
            opt_int(self.published_at),
            Value::Integer(self.first_observed_at),
            Value::Integer(self.last_updated_at),
            Value::Integer(i64::from(self.is_available)),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            video_id: row.get(0)?,
            title: row.get(1)?,
            description: row.get(2)?,
            channel_id: row.get(3)?,
            channel_title: row.get(4)?,
            duration_seconds: row.get(5)?,
            thumbnail_url: row.get(6)?,
            published_at: row.get(7)?,
            first_observed_at: row.get(8)?,
            last_updated_at: row.get(9)?,
            is_available: row.get::<_, i64>(10)? != 0,
        })
    }
}

impl Record for PlaylistItem {
    const TABLE: Table = Table::PlaylistItems;
    const COLUMNS: &'static [&'static str] = &[
        "item_id",
        "playlist_id",
        "video_id",
        "position",
        "added_at",
        "first_observed_at",
        "last_observed_at",
        "removed_upstream_at",
    ];

    fn key(&self) -> &str {
        &self.item_id
    }

    fn to_values(&self) -> Vec<Value> {
        vec![
            text(&self.item_id),
            text(&self.playlist_id),
            text(&self.video_id),
            Value::Integer(self.position),
            opt_int(self.added_at),
            Value::Integer(self.first_observed_at),
            Value::Integer(self.last_observed_at),
            opt_int(self.removed_upstream_at),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            item_id: row.get(0)?,
            playlist_id: row.get(1)?,
            video_id: row.get(2)?,
            position: row.get(3)?,
            added_at: row.get(4)?,
            first_observed_at: row.get(5)?,
            last_observed_at: row.get(6)?,
            removed_upstream_at: row.get(7)?,
        })
    }
}

/// `SELECT` list for a record type
pub(crate) fn column_list<R: Record>() -> String {
    R::COLUMNS.join(", ")
}

/// Visibility predicate for rows as of the version bound to `param`
pub(crate) fn visible_at(param: &str) -> String {
    format!("valid_from <= {param} AND (valid_to IS NULL OR valid_to > {param})")
}

/// Load one record as of `version`
pub(crate) fn get_at<R: Record>(
    conn: &Connection,
    key: &str,
    version: VersionId,
) -> Result<Option<R>> {
    let sql = format!(
        "SELECT {} FROM {} WHERE {} = ?2 AND {}",
        column_list::<R>(),
        R::TABLE.name(),
        R::TABLE.key_column(),
        visible_at("?1"),
    );

    let record = conn
        .query_row(&sql, rusqlite::params![version, key], R::from_row)
        .optional()?;
    Ok(record)
}

/// Load the newest row for `key`, including rows written by an open run
pub(crate) fn get_current<R: Record>(conn: &Connection, key: &str) -> Result<Option<R>> {
    let sql = format!(
        "SELECT {} FROM {} WHERE {} = ?1 AND valid_to IS NULL",
        column_list::<R>(),
        R::TABLE.name(),
        R::TABLE.key_column(),
    );

    let record = conn.query_row(&sql, [key], R::from_row).optional()?;
    Ok(record)
}

/// Every stored version of `key` introduced at or before `up_to`, oldest first
pub(crate) fn history<R: Record>(
    conn: &Connection,
    key: &str,
    up_to: VersionId,
) -> Result<Vec<RowVersion<R>>> {
    let column_count = R::COLUMNS.len();
    let sql = format!(
        "SELECT {}, valid_from, valid_to FROM {} WHERE {} = ?1 AND valid_from <= ?2
         ORDER BY valid_from",
        column_list::<R>(),
        R::TABLE.name(),
        R::TABLE.key_column(),
    );

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(rusqlite::params![key, up_to], |row| {
            let valid_to: Option<VersionId> = row.get(column_count + 1)?;
            Ok(RowVersion {
                record: R::from_row(row)?,
                valid_from: row.get(column_count)?,
                // A supersession by a run that has not committed yet is not history.
                valid_to: valid_to.filter(|to| *to <= up_to),
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(rows)
}

/// Insert `record` as a new row version introduced by `version`
pub(crate) fn insert_row<R: Record>(
    conn: &Connection,
    record: &R,
    version: VersionId,
) -> Result<()> {
    let mut values = record.to_values();
    values.push(Value::Integer(version));

    let placeholders = (1..=values.len())
        .map(|index| format!("?{index}"))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        "INSERT INTO {} ({}, valid_from) VALUES ({placeholders})",
        R::TABLE.name(),
        column_list::<R>(),
    );

    conn.execute(&sql, params_from_iter(values))?;
    Ok(())
}

/// Rewrite a row that no committed version can see
pub(crate) fn rewrite_row<R: Record>(conn: &Connection, row_id: i64, record: &R) -> Result<()> {
    let mut values = record.to_values();
    let assignments = R::COLUMNS
        .iter()
        .enumerate()
        .map(|(index, column)| format!("{column} = ?{}", index + 1))
        .collect::<Vec<_>>()
        .join(", ");
    values.push(Value::Integer(row_id));

    let sql = format!(
        "UPDATE {} SET {assignments} WHERE row_id = ?{}",
        R::TABLE.name(),
        values.len(),
    );

    conn.execute(&sql, params_from_iter(values))?;
    Ok(())
}
