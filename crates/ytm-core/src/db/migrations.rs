//! Database migrations

use crate::error::Result;
use rusqlite::{Connection, OptionalExtension};

/// Current schema version
const CURRENT_VERSION: i32 = 2;

/// Run all pending migrations
pub fn run(conn: &mut Connection) -> Result<()> {
    let version = get_version(conn)?;

    if version < 1 {
        apply(conn, 1, &V1_STATEMENTS)?;
    }
    if version < 2 {
        apply(conn, 2, &V2_STATEMENTS)?;
    }

    Ok(())
}

/// Get the current schema version
fn get_version(conn: &Connection) -> Result<i32> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
        [],
        |row| row.get(0),
    )?;

    if !exists {
        return Ok(0);
    }

    let version = conn
        .query_row("SELECT MAX(version) FROM schema_version", [], |row| {
            row.get::<_, Option<i32>>(0)
        })
        .optional()?
        .flatten()
        .unwrap_or(0);

    Ok(version)
}

/// Apply one migration's statements atomically
fn apply(conn: &mut Connection, version: i32, statements: &[&str]) -> Result<()> {
    let tx = conn.transaction()?;

    for stmt in statements {
        tx.execute(stmt, [])?;
    }
    tx.execute(
        "INSERT INTO schema_version (version) VALUES (?1)",
        [version],
    )?;

    // Dropping `tx` on an early return rolls the migration back.
    tx.commit()?;

    tracing::info!("Migrated database to version {version} (target {CURRENT_VERSION})");
    Ok(())
}

/// Version 1: row-versioned playlist tables and the version log
const V1_STATEMENTS: [&str; 11] = [
    // Schema version tracking
    "CREATE TABLE IF NOT EXISTS schema_version (
        version INTEGER PRIMARY KEY
    )",
    // One row per committed synchronization run
    "CREATE TABLE IF NOT EXISTS versions (
        version INTEGER PRIMARY KEY,
        committed_at INTEGER NOT NULL,
        changes INTEGER NOT NULL DEFAULT 0
    )",
    "CREATE TABLE IF NOT EXISTS playlists (
        row_id INTEGER PRIMARY KEY AUTOINCREMENT,
        playlist_id TEXT NOT NULL,
        title TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        channel_id TEXT,
        privacy_status TEXT,
        item_count INTEGER NOT NULL DEFAULT 0,
        published_at INTEGER,
        first_observed_at INTEGER NOT NULL,
        last_observed_at INTEGER NOT NULL,
        removed_upstream_at INTEGER,
        valid_from INTEGER NOT NULL,
        valid_to INTEGER
    )",
    // At most one current row per identity
    "CREATE UNIQUE INDEX IF NOT EXISTS idx_playlists_current
        ON playlists(playlist_id) WHERE valid_to IS NULL",
    "CREATE INDEX IF NOT EXISTS idx_playlists_history ON playlists(playlist_id, valid_from)",
    "CREATE TABLE IF NOT EXISTS videos (
        row_id INTEGER PRIMARY KEY AUTOINCREMENT,
        video_id TEXT NOT NULL,
        title TEXT,
        description TEXT,
        channel_id TEXT,
        channel_title TEXT,
        duration_seconds INTEGER,
        thumbnail_url TEXT,
        published_at INTEGER,
        first_observed_at INTEGER NOT NULL,
        last_updated_at INTEGER NOT NULL,
        is_available INTEGER NOT NULL DEFAULT 1,
        valid_from INTEGER NOT NULL,
        valid_to INTEGER
    )",
    "CREATE UNIQUE INDEX IF NOT EXISTS idx_videos_current
        ON videos(video_id) WHERE valid_to IS NULL",
    "CREATE INDEX IF NOT EXISTS idx_videos_history ON videos(video_id, valid_from)",
    "CREATE TABLE IF NOT EXISTS playlist_items (
        row_id INTEGER PRIMARY KEY AUTOINCREMENT,
        item_id TEXT NOT NULL,
        playlist_id TEXT NOT NULL,
        video_id TEXT NOT NULL,
        position INTEGER NOT NULL,
        added_at INTEGER,
        first_observed_at INTEGER NOT NULL,
        last_observed_at INTEGER NOT NULL,
        removed_upstream_at INTEGER,
        valid_from INTEGER NOT NULL,
        valid_to INTEGER
    )",
    "CREATE UNIQUE INDEX IF NOT EXISTS idx_playlist_items_current
        ON playlist_items(item_id) WHERE valid_to IS NULL",
    "CREATE INDEX IF NOT EXISTS idx_playlist_items_playlist
        ON playlist_items(playlist_id, valid_from)",
];

/// Version 2: refuse to delete rows or touch superseded rows
const V2_STATEMENTS: [&str; 6] = [
    "CREATE TRIGGER IF NOT EXISTS playlists_no_delete BEFORE DELETE ON playlists
     BEGIN
         SELECT RAISE(ABORT, 'playlist history is append-only');
     END",
    "CREATE TRIGGER IF NOT EXISTS playlists_closed_guard BEFORE UPDATE ON playlists
     FOR EACH ROW WHEN OLD.valid_to IS NOT NULL
     BEGIN
         SELECT RAISE(ABORT, 'superseded playlist rows are immutable');
     END",
    "CREATE TRIGGER IF NOT EXISTS videos_no_delete BEFORE DELETE ON videos
     BEGIN
         SELECT RAISE(ABORT, 'video history is append-only');
     END",
    "CREATE TRIGGER IF NOT EXISTS videos_closed_guard BEFORE UPDATE ON videos
     FOR EACH ROW WHEN OLD.valid_to IS NOT NULL
     BEGIN
         SELECT RAISE(ABORT, 'superseded video rows are immutable');
     END",
    "CREATE TRIGGER IF NOT EXISTS playlist_items_no_delete BEFORE DELETE ON playlist_items
     BEGIN
         SELECT RAISE(ABORT, 'playlist item history is append-only');
     END",
    "CREATE TRIGGER IF NOT EXISTS playlist_items_closed_guard BEFORE UPDATE ON playlist_items
     FOR EACH ROW WHEN OLD.valid_to IS NOT NULL
     BEGIN
         SELECT RAISE(ABORT, 'superseded playlist item rows are immutable');
     END",
];

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> Connection {
        Connection::open_in_memory().unwrap()
    }

    #[test]
    fn test_migrations() {
        let mut conn = setup();
        run(&mut conn).unwrap();

        let version = get_version(&conn).unwrap();
        assert_eq!(version, CURRENT_VERSION);
    }

    #[test]
    fn test_migrations_idempotent() {
        let mut conn = setup();
        run(&mut conn).unwrap();
        run(&mut conn).unwrap(); // Should not fail

        let version = get_version(&conn).unwrap();
        assert_eq!(version, CURRENT_VERSION);
    }

    #[test]
    fn test_delete_is_rejected() {
        let mut conn = setup();
        run(&mut conn).unwrap();

        conn.execute(
            "INSERT INTO videos (video_id, first_observed_at, last_updated_at, valid_from)
             VALUES ('v1', 1, 1, 1)",
            [],
        )
        .unwrap();

        let error = conn.execute("DELETE FROM videos", []).unwrap_err();
        assert!(error.to_string().contains("append-only"));
    }

    #[test]
    fn test_superseded_rows_are_frozen() {
        let mut conn = setup();
        run(&mut conn).unwrap();

        conn.execute(
            "INSERT INTO videos (video_id, first_observed_at, last_updated_at, valid_from, valid_to)
             VALUES ('v1', 1, 1, 1, 2)",
            [],
        )
        .unwrap();

        let error = conn
            .execute("UPDATE videos SET title = 'rewritten'", [])
            .unwrap_err();
        assert!(error.to_string().contains("immutable"));
    }

    #[test]
    fn test_one_current_row_per_identity() {
        let mut conn = setup();
        run(&mut conn).unwrap();

        let insert = "INSERT INTO videos (video_id, first_observed_at, last_updated_at, valid_from)
                      VALUES ('v1', 1, 1, 1)";
        conn.execute(insert, []).unwrap();
        assert!(conn.execute(insert, []).is_err());
    }
}
