//! Mapping for yt-dlp flat playlist dumps (`yt-dlp -J --flat-playlist`)
//!
//! This is the only way to read Watch Later; entries carry a duration but no
//! added time, and memberships have no id of their own.

use serde::Deserialize;

use super::{is_unavailable_title, Completeness, FetchedPlaylist, PlaylistSnapshot};
use crate::models::{Playlist, PlaylistItem, Video};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FlatPlaylist {
    pub id: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub entries: Vec<Option<FlatEntry>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FlatEntry {
    pub id: Option<String>,
    pub title: Option<String>,
    pub channel_id: Option<String>,
    pub channel: Option<String>,
    pub uploader: Option<String>,
    pub duration: Option<f64>,
    pub thumbnail: Option<String>,
}

/// Map one flat entry to a video
#[must_use]
#[allow(clippy::cast_possible_truncation)] // durations are whole seconds well inside i64
pub fn video_from_entry(entry: &FlatEntry) -> Option<Video> {
    let video_id = entry.id.as_deref().filter(|id| !id.is_empty())?;

    Some(Video {
        title: entry.title.clone(),
        channel_id: entry.channel_id.clone(),
        channel_title: entry.channel.clone().or_else(|| entry.uploader.clone()),
        duration_seconds: entry.duration.map(|seconds| seconds as i64),
        thumbnail_url: entry.thumbnail.clone(),
        is_available: !is_unavailable_title(entry.title.as_deref()),
        ..Video::new(video_id)
    })
}

/// Map one flat entry to a membership with a derived id
#[must_use]
pub fn playlist_item_from_entry(
    entry: &FlatEntry,
    playlist_id: &str,
    position: i64,
) -> Option<PlaylistItem> {
    let video_id = entry.id.as_deref().filter(|id| !id.is_empty())?;
    Some(PlaylistItem::new(
        PlaylistItem::derived_id(playlist_id, video_id),
        playlist_id,
        video_id,
        position,
    ))
}

/// Build a snapshot of `playlist_id` from a flat dump.
///
/// yt-dlp either returns the whole listing or fails, so a parsed dump is a
/// complete enumeration. Positions follow the dump order, counting the null
/// entries yt-dlp emits for unresolvable videos.
#[must_use]
pub fn snapshot_from_flat(info: &FlatPlaylist, playlist_id: &str) -> FetchedPlaylist {
    let playlist = Playlist {
        description: info.description.clone().unwrap_or_default(),
        item_count: i64::try_from(info.entries.len()).unwrap_or(i64::MAX),
        ..Playlist::new(
            playlist_id,
            info.title.clone().unwrap_or_else(|| "Unknown Playlist".to_string()),
        )
    };

    let mut snapshot = PlaylistSnapshot {
        playlist,
        ..PlaylistSnapshot::default()
    };
    for (position, entry) in (0_i64..).zip(info.entries.iter()) {
        let Some(entry) = entry else {
            continue;
        };
        if let (Some(video), Some(item)) = (
            video_from_entry(entry),
            playlist_item_from_entry(entry, playlist_id, position),
        ) {
            snapshot.videos.push(video);
            snapshot.items.push(item);
        }
    }

    FetchedPlaylist {
        snapshot,
        completeness: Completeness::Complete,
    }
}

/// Build the Watch Later snapshot from a flat dump, stored under `playlist_id`
#[must_use]
pub fn watch_later_snapshot(info: &FlatPlaylist, playlist_id: &str) -> FetchedPlaylist {
    let mut fetched = snapshot_from_flat(info, playlist_id);
    fetched.snapshot.playlist.title = "Watch Later".to_string();
    fetched.snapshot.playlist.description = "Your Watch Later playlist".to_string();
    fetched
}

#[cfg(test)]
mod tests {
    use super::*;

    const WATCH_LATER_DUMP: &str = r#"
    {
      "id": "WL",
      "title": "Watch later",
      "entries": [
        { "id": "v1", "title": "Talk", "channel": "Conf", "duration": 3600.0 },
        null,
        { "id": "v2", "title": "[Private video]", "uploader": "Someone" }
      ]
    }
    "#;

    #[test]
    fn maps_watch_later_dump() {
        let info: FlatPlaylist = serde_json::from_str(WATCH_LATER_DUMP).unwrap();
        let fetched = watch_later_snapshot(&info, "WL");
        let snapshot = fetched.snapshot;

        assert!(fetched.completeness.is_complete());
        assert_eq!(snapshot.playlist.playlist_id, "WL");
        assert_eq!(snapshot.playlist.title, "Watch Later");
        assert_eq!(snapshot.playlist.item_count, 3);

        assert_eq!(snapshot.items.len(), 2);
        assert_eq!(snapshot.items[0].item_id, "WL_v1");
        assert_eq!(snapshot.items[1].item_id, "WL_v2");
        assert_eq!(snapshot.items[1].position, 2);
        assert_eq!(snapshot.items[0].added_at, None);

        assert_eq!(snapshot.videos[0].duration_seconds, Some(3600));
        assert_eq!(snapshot.videos[0].channel_title.as_deref(), Some("Conf"));
        assert_eq!(snapshot.videos[1].channel_title.as_deref(), Some("Someone"));
        assert!(!snapshot.videos[1].is_available);
    }

    #[test]
    fn watch_later_memberships_follow_target_id() {
        let info: FlatPlaylist = serde_json::from_str(WATCH_LATER_DUMP).unwrap();
        let snapshot = watch_later_snapshot(&info, "MYWL").snapshot;

        assert_eq!(snapshot.playlist.playlist_id, "MYWL");
        assert!(snapshot
            .items
            .iter()
            .all(|item| item.playlist_id == "MYWL" && item.item_id.starts_with("MYWL_")));
    }

    #[test]
    fn untitled_dump_gets_placeholder_title() {
        let info = FlatPlaylist::default();
        let fetched = snapshot_from_flat(&info, "PL9");
        assert_eq!(fetched.snapshot.playlist.title, "Unknown Playlist");
        assert!(fetched.snapshot.items.is_empty());
    }
}
