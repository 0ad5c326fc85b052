//! Mapping for YouTube Data API v3 `playlists.list` / `playlistItems.list` responses

use std::collections::BTreeMap;

use serde::Deserialize;

use super::{
    is_unavailable_title, Completeness, FetchedPlaylist, PlaylistListing, PlaylistSnapshot,
};
use crate::models::{Playlist, PlaylistItem, Video};
use crate::util::parse_timestamp;

/// Thumbnail qualities, best first
const THUMBNAIL_PREFERENCE: [&str; 4] = ["maxres", "high", "medium", "default"];

/// One page of a list response
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistResource {
    pub id: String,
    #[serde(default)]
    pub snippet: PlaylistSnippet,
    #[serde(default)]
    pub status: ResourceStatus,
    #[serde(default)]
    pub content_details: PlaylistContentDetails,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistSnippet {
    pub title: Option<String>,
    pub description: Option<String>,
    pub channel_id: Option<String>,
    pub published_at: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceStatus {
    pub privacy_status: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistContentDetails {
    pub item_count: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistItemResource {
    pub id: String,
    #[serde(default)]
    pub snippet: PlaylistItemSnippet,
    #[serde(default)]
    pub content_details: PlaylistItemContentDetails,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistItemSnippet {
    pub title: Option<String>,
    pub description: Option<String>,
    /// When the video was added to the playlist
    pub published_at: Option<String>,
    pub position: Option<i64>,
    #[serde(default)]
    pub resource_id: ResourceId,
    #[serde(default)]
    pub thumbnails: BTreeMap<String, Thumbnail>,
    pub video_owner_channel_id: Option<String>,
    pub video_owner_channel_title: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistItemContentDetails {
    pub video_id: Option<String>,
    pub video_published_at: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceId {
    pub video_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Thumbnail {
    pub url: Option<String>,
}

/// Map a `playlists.list` resource
#[must_use]
pub fn playlist_from_resource(resource: &PlaylistResource) -> Playlist {
    let snippet = &resource.snippet;
    Playlist {
        playlist_id: resource.id.clone(),
        title: snippet.title.clone().unwrap_or_default(),
        description: snippet.description.clone().unwrap_or_default(),
        channel_id: snippet.channel_id.clone(),
        privacy_status: resource.status.privacy_status.clone(),
        item_count: resource.content_details.item_count.unwrap_or(0),
        published_at: snippet.published_at.as_deref().and_then(parse_timestamp),
        ..Playlist::default()
    }
}

fn video_id_of(resource: &PlaylistItemResource) -> Option<&str> {
    resource
        .snippet
        .resource_id
        .video_id
        .as_deref()
        .or(resource.content_details.video_id.as_deref())
        .filter(|id| !id.is_empty())
}

fn best_thumbnail(thumbnails: &BTreeMap<String, Thumbnail>) -> Option<String> {
    THUMBNAIL_PREFERENCE
        .iter()
        .find_map(|quality| thumbnails.get(*quality))
        .and_then(|thumbnail| thumbnail.url.clone())
}

/// Map the video half of a `playlistItems.list` resource
#[must_use]
pub fn video_from_item_resource(resource: &PlaylistItemResource) -> Option<Video> {
    let video_id = video_id_of(resource)?;
    let snippet = &resource.snippet;

    Some(Video {
        title: snippet.title.clone(),
        description: snippet.description.clone(),
        channel_id: snippet.video_owner_channel_id.clone(),
        channel_title: snippet.video_owner_channel_title.clone(),
        thumbnail_url: best_thumbnail(&snippet.thumbnails),
        published_at: resource
            .content_details
            .video_published_at
            .as_deref()
            .and_then(parse_timestamp),
        is_available: !is_unavailable_title(snippet.title.as_deref()),
        ..Video::new(video_id)
    })
}

/// Map the membership half of a `playlistItems.list` resource
#[must_use]
pub fn playlist_item_from_resource(
    resource: &PlaylistItemResource,
    playlist_id: &str,
    fallback_position: i64,
) -> Option<PlaylistItem> {
    let video_id = video_id_of(resource)?;
    let snippet = &resource.snippet;
    let item_id = if resource.id.is_empty() {
        PlaylistItem::derived_id(playlist_id, video_id)
    } else {
        resource.id.clone()
    };

    Some(PlaylistItem {
        added_at: snippet.published_at.as_deref().and_then(parse_timestamp),
        ..PlaylistItem::new(
            item_id,
            playlist_id,
            video_id,
            snippet.position.unwrap_or(fallback_position),
        )
    })
}

/// Flatten `playlists.list` pages into a listing.
///
/// The listing is complete only if the last page carries no continuation
/// token.
#[must_use]
pub fn listing_from_pages(pages: &[ListResponse<PlaylistResource>]) -> PlaylistListing {
    PlaylistListing {
        playlists: pages
            .iter()
            .flat_map(|page| page.items.iter().map(playlist_from_resource))
            .collect(),
        completeness: pages_completeness(pages),
    }
}

/// Build a playlist snapshot from `playlistItems.list` pages
#[must_use]
pub fn snapshot_from_pages(
    playlist: Playlist,
    pages: &[ListResponse<PlaylistItemResource>],
) -> FetchedPlaylist {
    let mut snapshot = PlaylistSnapshot {
        playlist,
        ..PlaylistSnapshot::default()
    };

    let resources = pages.iter().flat_map(|page| page.items.iter());
    for (index, resource) in (0_i64..).zip(resources) {
        let (Some(video), Some(item)) = (
            video_from_item_resource(resource),
            playlist_item_from_resource(resource, &snapshot.playlist.playlist_id, index),
        ) else {
            tracing::debug!("Skipping playlist item {} without a video id", resource.id);
            continue;
        };
        snapshot.videos.push(video);
        snapshot.items.push(item);
    }

    FetchedPlaylist {
        snapshot,
        completeness: pages_completeness(pages),
    }
}

fn pages_completeness<T>(pages: &[ListResponse<T>]) -> Completeness {
    match pages.last() {
        None => Completeness::Partial {
            reason: "no pages were fetched".to_string(),
        },
        Some(page) if page.next_page_token.is_some() => Completeness::Partial {
            reason: format!("stopped after {} page(s) with more pending", pages.len()),
        },
        Some(_) => Completeness::Complete,
    }
}
