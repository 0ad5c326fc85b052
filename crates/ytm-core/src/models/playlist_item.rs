//! Playlist membership model

use serde::{Deserialize, Serialize};

use super::Video;

/// A video's membership in a playlist.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistItem {
    /// Membership id (source supplied, or `{playlist_id}_{video_id}`)
    pub item_id: String,
    pub playlist_id: String,
    pub video_id: String,
    /// Zero-based position within the playlist
    pub position: i64,
    /// When the video was added to the playlist, if the source knows (Unix ms)
    pub added_at: Option<i64>,
    /// First time any run saw this membership (Unix ms)
    pub first_observed_at: i64,
    /// Most recent run that saw this membership (Unix ms)
    pub last_observed_at: i64,
    /// Set when a complete scan of the playlist no longer reports it
    pub removed_upstream_at: Option<i64>,
}

impl PlaylistItem {
    /// Create an unobserved membership
    #[must_use]
    pub fn new(
        item_id: impl Into<String>,
        playlist_id: impl Into<String>,
        video_id: impl Into<String>,
        position: i64,
    ) -> Self {
        Self {
            item_id: item_id.into(),
            playlist_id: playlist_id.into(),
            video_id: video_id.into(),
            position,
            ..Self::default()
        }
    }

    /// Membership id for sources that do not supply one
    #[must_use]
    pub fn derived_id(playlist_id: &str, video_id: &str) -> String {
        format!("{playlist_id}_{video_id}")
    }

    /// Whether the membership is marked as gone upstream
    #[must_use]
    pub const fn is_removed(&self) -> bool {
        self.removed_upstream_at.is_some()
    }

    /// Timestamp used to judge the membership's age.
    ///
    /// Prefers the source's added time and falls back to the first
    /// observation. Returns `None` for records that were never observed.
    #[must_use]
    pub fn age_timestamp(&self) -> Option<i64> {
        self.added_at
            .or_else(|| (self.first_observed_at > 0).then_some(self.first_observed_at))
    }

    /// Stamp a first observation at `now`.
    #[must_use]
    pub fn first_seen(mut self, now: i64) -> Self {
        self.first_observed_at = now;
        self.last_observed_at = now;
        self.removed_upstream_at = None;
        self
    }

    /// Merge a fresh observation into the stored row.
    pub fn observe(&mut self, incoming: &Self, now: i64) {
        self.playlist_id.clone_from(&incoming.playlist_id);
        self.video_id.clone_from(&incoming.video_id);
        self.position = incoming.position;
        self.added_at = incoming.added_at;
        self.last_observed_at = now;
        self.removed_upstream_at = None;
    }
}

/// A membership joined with its video as of the same version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistEntry {
    pub item: PlaylistItem,
    pub video: Option<Video>,
}

impl PlaylistEntry {
    /// Video title, if the video row carries one
    #[must_use]
    pub fn title(&self) -> Option<&str> {
        self.video.as_ref().and_then(|video| video.title.as_deref())
    }

    /// Whether the referenced video is still playable
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.video.as_ref().map_or(true, |video| video.is_available)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derived_id() {
        assert_eq!(PlaylistItem::derived_id("WL", "abc"), "WL_abc");
    }

    #[test]
    fn test_age_timestamp_prefers_added_at() {
        let mut item = PlaylistItem::new("i", "p", "v", 0).first_seen(500);
        assert_eq!(item.age_timestamp(), Some(500));

        item.added_at = Some(100);
        assert_eq!(item.age_timestamp(), Some(100));
    }

    #[test]
    fn test_age_timestamp_unresolvable_when_never_observed() {
        let item = PlaylistItem::new("i", "p", "v", 0);
        assert_eq!(item.age_timestamp(), None);
    }

    #[test]
    fn test_observe_clears_removal_and_keeps_first_seen() {
        let mut stored = PlaylistItem {
            removed_upstream_at: Some(20),
            ..PlaylistItem::new("i", "p", "v", 3).first_seen(10)
        };
        let incoming = PlaylistItem::new("i", "p", "v", 0);

        stored.observe(&incoming, 30);

        assert_eq!(stored.position, 0);
        assert_eq!(stored.first_observed_at, 10);
        assert_eq!(stored.last_observed_at, 30);
        assert!(!stored.is_removed());
    }
}
