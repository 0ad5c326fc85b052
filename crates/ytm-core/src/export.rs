//! Playlist export helpers shared by the CLI output paths.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::db::{AsOf, VersionedStore};
use crate::error::{Error, Result};
use crate::models::{Playlist, PlaylistEntry, VersionId};
use crate::util::format_millis;

/// Export output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExportFormat {
    Json,
    Markdown,
}

impl ExportFormat {
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Markdown => "md",
        }
    }
}

/// One exported membership.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportEntry {
    pub position: i64,
    pub video_id: String,
    pub title: Option<String>,
    pub channel_title: Option<String>,
    pub duration_seconds: Option<i64>,
    pub added_at: Option<i64>,
    pub is_available: bool,
    pub removed_upstream_at: Option<i64>,
}

/// A playlist as it stood at one version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistExport {
    pub version: VersionId,
    pub playlist: Playlist,
    pub entries: Vec<ExportEntry>,
}

/// Convert a joined membership into an export record.
#[must_use]
pub fn entry_to_export_item(entry: &PlaylistEntry) -> ExportEntry {
    let video = entry.video.as_ref();
    ExportEntry {
        position: entry.item.position,
        video_id: entry.item.video_id.clone(),
        title: entry.title().map(str::to_string),
        channel_title: video.and_then(|video| video.channel_title.clone()),
        duration_seconds: video.and_then(|video| video.duration_seconds),
        added_at: entry.item.added_at,
        is_available: entry.is_available(),
        removed_upstream_at: entry.item.removed_upstream_at,
    }
}

/// Load a playlist and its entries as of `at`.
pub fn load_playlist_export(
    store: &VersionedStore,
    playlist_id: &str,
    at: AsOf,
    include_removed: bool,
) -> Result<PlaylistExport> {
    let version = store.resolve(at)?;
    let at = AsOf::Version(version);
    let playlist = store
        .get::<Playlist>(playlist_id, at)?
        .ok_or_else(|| Error::NotFound(format!("Playlist {playlist_id} at version {version}")))?;
    let entries = store
        .list_playlist_entries(playlist_id, at, include_removed)?
        .iter()
        .map(entry_to_export_item)
        .collect();

    Ok(PlaylistExport {
        version,
        playlist,
        entries,
    })
}

/// Render an export as pretty-printed JSON.
pub fn render_json_export(export: &PlaylistExport) -> serde_json::Result<String> {
    serde_json::to_string_pretty(export)
}

/// Render an export as Markdown with a frontmatter block.
#[must_use]
pub fn render_markdown_export(export: &PlaylistExport) -> String {
    let mut output = String::new();
    let playlist = &export.playlist;

    let _ = writeln!(output, "---");
    let _ = writeln!(output, "playlist_id: {}", playlist.playlist_id);
    let _ = writeln!(output, "version: {}", export.version);
    let _ = writeln!(output, "items: {}", export.entries.len());
    let _ = writeln!(output, "---");
    let _ = writeln!(output);
    let _ = writeln!(output, "# {}", playlist.title);
    if !playlist.description.is_empty() {
        let _ = writeln!(output);
        let _ = writeln!(output, "{}", playlist.description);
    }
    let _ = writeln!(output);

    for entry in &export.entries {
        let title = entry.title.as_deref().unwrap_or("(untitled)");
        let _ = write!(
            output,
            "{}. [{title}](https://www.youtube.com/watch?v={})",
            entry.position + 1,
            entry.video_id
        );
        if let Some(channel) = &entry.channel_title {
            let _ = write!(output, " - {channel}");
        }
        if let Some(added_at) = entry.added_at {
            let _ = write!(output, " (added {})", format_millis(added_at));
        }
        if !entry.is_available {
            output.push_str(" [unavailable]");
        }
        if entry.removed_upstream_at.is_some() {
            output.push_str(" [removed]");
        }
        output.push('\n');
    }

    output
}

/// Render based on selected export format.
pub fn render_playlist_export(
    export: &PlaylistExport,
    format: ExportFormat,
) -> serde_json::Result<String> {
    match format {
        ExportFormat::Json => render_json_export(export),
        ExportFormat::Markdown => Ok(render_markdown_export(export)),
    }
}

/// Build a deterministic default file name for export flows.
#[must_use]
pub fn suggested_export_file_name(
    playlist_id: &str,
    version: VersionId,
    format: ExportFormat,
) -> String {
    format!("ytm-{playlist_id}-v{version}.{}", format.extension())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PlaylistItem, Video};

    fn setup() -> VersionedStore {
        let mut store = VersionedStore::open_in_memory().unwrap();
        let mut tx = store.begin().unwrap();
        let now = tx.now();
        tx.upsert(&Playlist {
            description: "Road trip".to_string(),
            ..Playlist::new("PL1", "Driving").first_seen(now)
        })
        .unwrap();
        tx.upsert(&Video {
            title: Some("Song".to_string()),
            channel_title: Some("Band".to_string()),
            ..Video::new("v1").first_seen(now)
        })
        .unwrap();
        tx.upsert(&Video {
            title: Some("Deleted video".to_string()),
            is_available: false,
            ..Video::new("v2").first_seen(now)
        })
        .unwrap();
        tx.upsert(&PlaylistItem {
            added_at: Some(0),
            ..PlaylistItem::new("i1", "PL1", "v1", 0).first_seen(now)
        })
        .unwrap();
        tx.upsert(&PlaylistItem::new("i2", "PL1", "v2", 1).first_seen(now))
            .unwrap();
        tx.commit().unwrap();
        store
    }

    #[test]
    fn render_markdown_export_lists_entries() {
        let store = setup();
        let export = load_playlist_export(&store, "PL1", AsOf::Latest, false).unwrap();
        let rendered = render_markdown_export(&export);

        assert!(rendered.contains("playlist_id: PL1"));
        assert!(rendered.contains("version: 1"));
        assert!(rendered.contains("# Driving\n\nRoad trip\n"));
        assert!(rendered.contains(
            "1. [Song](https://www.youtube.com/watch?v=v1) - Band (added 1970-01-01T00:00:00+00:00)"
        ));
        assert!(rendered
            .contains("2. [Deleted video](https://www.youtube.com/watch?v=v2) [unavailable]"));
    }

    #[test]
    fn render_json_export_round_trips() {
        let store = setup();
        let export = load_playlist_export(&store, "PL1", AsOf::Latest, false).unwrap();
        let rendered = render_playlist_export(&export, ExportFormat::Json).unwrap();
        let parsed: PlaylistExport = serde_json::from_str(&rendered).unwrap();
        assert_eq!(parsed, export);
    }

    #[test]
    fn missing_playlist_is_not_found() {
        let store = setup();
        let error = load_playlist_export(&store, "PL9", AsOf::Latest, false).unwrap_err();
        assert!(matches!(error, Error::NotFound(_)));
    }

    #[test]
    fn suggested_export_file_name_uses_format_extension() {
        assert_eq!(
            suggested_export_file_name("WL", 3, ExportFormat::Markdown),
            "ytm-WL-v3.md"
        );
        assert_eq!(
            suggested_export_file_name("PL1", 12, ExportFormat::Json),
            "ytm-PL1-v12.json"
        );
    }
}
