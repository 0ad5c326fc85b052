use std::env;
use std::path::{Path, PathBuf};

use serde::Serialize;
use ytm_core::config::{Config, CONFIG_FILE_NAME, DB_FILE_NAME, DB_PATH_ENV};
use ytm_core::diff::SetDiff;
use ytm_core::util::parse_timestamp;
use ytm_core::{AsOf, Playlist, PlaylistEntry, StoreVersion, VersionedStore};

use crate::cli::AtArgs;
use crate::error::CliError;

#[derive(Debug, Serialize)]
pub struct PlaylistListItem {
    pub playlist_id: String,
    pub title: String,
    pub item_count: i64,
    pub privacy_status: Option<String>,
    pub last_observed_at: i64,
    pub removed: bool,
}

#[derive(Debug, Serialize)]
pub struct EntryListItem {
    pub item_id: String,
    pub position: i64,
    pub video_id: String,
    pub title: Option<String>,
    pub channel_title: Option<String>,
    pub duration_seconds: Option<i64>,
    pub added_at: Option<i64>,
    pub available: bool,
    pub removed: bool,
}

#[derive(Debug, Serialize)]
pub struct VersionListItem {
    pub version: i64,
    pub committed_at: i64,
    pub committed_at_iso: String,
    pub changes: i64,
}

pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ytm")
        .join(CONFIG_FILE_NAME)
}

pub fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ytm")
        .join(DB_FILE_NAME)
}

pub fn load_config(config_path: Option<&Path>) -> Result<Config, CliError> {
    let path = config_path.map_or_else(default_config_path, Path::to_path_buf);
    Config::load_from_path(&path).map_err(|error| CliError::Config(error.to_string()))
}

pub fn resolve_db_path(cli_db_path: Option<&Path>, config: &Config) -> PathBuf {
    config.resolve_db_path(cli_db_path, env::var(DB_PATH_ENV).ok(), default_db_path())
}

/// Open an existing backup for reading; never creates one
pub fn open_existing_store(path: &Path) -> Result<VersionedStore, CliError> {
    if !path.is_file() {
        return Err(CliError::StoreNotFound(path.to_path_buf()));
    }
    Ok(VersionedStore::open(path)?)
}

/// Open the backup for a run, creating it and its directory if needed
pub fn open_store(path: &Path) -> Result<VersionedStore, CliError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(VersionedStore::open(path)?)
}

/// Turn `--version` / `--at` into a read point
pub fn resolve_as_of(at: &AtArgs) -> Result<AsOf, CliError> {
    if let Some(version) = at.version {
        return Ok(AsOf::Version(version));
    }
    match at.at.as_deref() {
        Some(raw) => parse_timestamp(raw)
            .map(AsOf::Time)
            .ok_or_else(|| CliError::InvalidTime(raw.to_string())),
        None => Ok(AsOf::Latest),
    }
}

pub fn playlist_to_list_item(playlist: &Playlist) -> PlaylistListItem {
    PlaylistListItem {
        playlist_id: playlist.playlist_id.clone(),
        title: playlist.title.clone(),
        item_count: playlist.item_count,
        privacy_status: playlist.privacy_status.clone(),
        last_observed_at: playlist.last_observed_at,
        removed: playlist.is_removed(),
    }
}

pub fn entry_to_list_item(entry: &PlaylistEntry) -> EntryListItem {
    let video = entry.video.as_ref();
    EntryListItem {
        item_id: entry.item.item_id.clone(),
        position: entry.item.position,
        video_id: entry.item.video_id.clone(),
        title: entry.title().map(str::to_string),
        channel_title: video.and_then(|video| video.channel_title.clone()),
        duration_seconds: video.and_then(|video| video.duration_seconds),
        added_at: entry.item.added_at,
        available: entry.is_available(),
        removed: entry.item.is_removed(),
    }
}

pub fn version_to_list_item(version: &StoreVersion) -> VersionListItem {
    VersionListItem {
        version: version.version,
        committed_at: version.committed_at,
        committed_at_iso: ytm_core::util::format_millis(version.committed_at),
        changes: version.changes,
    }
}

pub fn format_playlist_lines(playlists: &[Playlist]) -> Vec<String> {
    playlists
        .iter()
        .map(|playlist| {
            let mut line = format!(
                "{:<36} {:>5}  {}",
                playlist.playlist_id, playlist.item_count, playlist.title
            );
            if playlist.is_removed() {
                line.push_str("  [removed]");
            }
            line
        })
        .collect()
}

pub fn format_entry_lines(entries: &[PlaylistEntry], now_ms: i64) -> Vec<String> {
    entries
        .iter()
        .map(|entry| {
            let title = entry.title().unwrap_or(&entry.item.video_id);
            let duration = entry
                .video
                .as_ref()
                .and_then(|video| video.duration_seconds)
                .map(format_duration)
                .unwrap_or_default();
            let age = entry
                .item
                .age_timestamp()
                .map(|at| format_relative_time(at, now_ms))
                .unwrap_or_default();

            let mut line = format!(
                "{:>4}. {title:<60} {duration:>8}  {age}",
                entry.item.position + 1
            );
            if !entry.is_available() {
                line.push_str("  [unavailable]");
            }
            if entry.item.is_removed() {
                line.push_str("  [removed]");
            }
            line.trim_end().to_string()
        })
        .collect()
}

pub fn format_version_lines(versions: &[StoreVersion]) -> Vec<String> {
    versions
        .iter()
        .map(|version| {
            format!(
                "v{:<5} {}  {} change(s)",
                version.version,
                format_timestamp(version.committed_at),
                version.changes
            )
        })
        .collect()
}

pub fn format_set_diff_lines(label: &str, diff: &SetDiff) -> Vec<String> {
    let mut lines = vec![format!(
        "{label}: +{} / -{}",
        diff.added.len(),
        diff.removed.len()
    )];
    lines.extend(diff.added.iter().map(|id| format!("  + {id}")));
    lines.extend(diff.removed.iter().map(|id| format!("  - {id}")));
    lines
}

pub fn format_timestamp(timestamp_ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(timestamp_ms).map_or_else(
        || timestamp_ms.to_string(),
        |date_time| date_time.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    )
}

pub fn format_duration(seconds: i64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let seconds = seconds % 60;
    if hours > 0 {
        format!("{hours}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes}:{seconds:02}")
    }
}

pub fn format_relative_time(timestamp_ms: i64, now_ms: i64) -> String {
    let diff = now_ms.saturating_sub(timestamp_ms);
    let minute = 60_000;
    let hour = 60 * minute;
    let day = 24 * hour;
    let week = 7 * day;
    let month = 30 * day;
    let year = 365 * day;

    if diff < minute {
        "just now".to_string()
    } else if diff < hour {
        format!("{}m ago", diff / minute)
    } else if diff < day {
        format!("{}h ago", diff / hour)
    } else if diff < week {
        format!("{}d ago", diff / day)
    } else if diff < month {
        format!("{}w ago", diff / week)
    } else if diff < year {
        format!("{}mo ago", diff / month)
    } else {
        format!("{}y ago", diff / year)
    }
}
