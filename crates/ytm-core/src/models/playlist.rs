//! Playlist model

use serde::{Deserialize, Serialize};

/// Remote id of the Watch Later playlist, which the Data API never lists.
pub const WATCH_LATER_PLAYLIST_ID: &str = "WL";

/// A playlist as last observed upstream.
///
/// Observation stamps (`first_observed_at`, `last_observed_at`,
/// `removed_upstream_at`) are owned by the reconciler; source adapters leave
/// them at their defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Playlist {
    /// Remote playlist id
    pub playlist_id: String,
    /// Display title
    pub title: String,
    /// Description (empty when the source has none)
    pub description: String,
    /// Owning channel
    pub channel_id: Option<String>,
    /// Visibility as reported upstream (`public`, `unlisted`, `private`)
    pub privacy_status: Option<String>,
    /// Item count reported by the source
    pub item_count: i64,
    /// Remote creation time (Unix ms)
    pub published_at: Option<i64>,
    /// First time any run saw this playlist (Unix ms)
    pub first_observed_at: i64,
    /// Most recent run that saw this playlist (Unix ms)
    pub last_observed_at: i64,
    /// Set when a complete enumeration no longer reports the playlist
    pub removed_upstream_at: Option<i64>,
}

impl Playlist {
    /// Create an unobserved playlist with the given id and title
    #[must_use]
    pub fn new(playlist_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            playlist_id: playlist_id.into(),
            title: title.into(),
            ..Self::default()
        }
    }

    /// Whether the playlist is marked as gone upstream
    #[must_use]
    pub const fn is_removed(&self) -> bool {
        self.removed_upstream_at.is_some()
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
    ///
    /// The source is authoritative for every scalar field. A reappearing
    /// playlist loses its removal mark.
    pub fn observe(&mut self, incoming: &Self, now: i64) {
        self.title.clone_from(&incoming.title);
        self.description.clone_from(&incoming.description);
        self.channel_id.clone_from(&incoming.channel_id);
        self.privacy_status.clone_from(&incoming.privacy_status);
        self.item_count = incoming.item_count;
        self.published_at = incoming.published_at;
        self.last_observed_at = now;
        self.removed_upstream_at = None;
    }
}
