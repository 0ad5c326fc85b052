//! Video model

use serde::{Deserialize, Serialize};

use super::coalesce;

/// A video referenced by one or more playlists.
///
/// Different sources describe a video with different fields (the Data API
/// has no duration, flat playlist dumps have no description), so the stored
/// row accumulates the richest description seen so far.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Video {
    /// Remote video id
    pub video_id: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub channel_id: Option<String>,
    pub channel_title: Option<String>,
    pub duration_seconds: Option<i64>,
    pub thumbnail_url: Option<String>,
    /// Remote publish time (Unix ms)
    pub published_at: Option<i64>,
    /// First time any run saw this video (Unix ms)
    pub first_observed_at: i64,
    /// Most recent run that saw this video (Unix ms)
    pub last_updated_at: i64,
    /// False for private/deleted placeholders
    pub is_available: bool,
}

impl Default for Video {
    fn default() -> Self {
        Self {
            video_id: String::new(),
            title: None,
            description: None,
            channel_id: None,
            channel_title: None,
            duration_seconds: None,
            thumbnail_url: None,
            published_at: None,
            first_observed_at: 0,
            last_updated_at: 0,
            is_available: true,
        }
    }
}

impl Video {
    /// Create an unobserved video with only its id set
    #[must_use]
    pub fn new(video_id: impl Into<String>) -> Self {
        Self {
            video_id: video_id.into(),
            ..Self::default()
        }
    }

    /// Stamp a first observation at `now`.
    #[must_use]
    pub const fn first_seen(mut self, now: i64) -> Self {
        self.first_observed_at = now;
        self.last_updated_at = now;
        self
    }

    /// Merge a fresh observation into the stored row.
    ///
    /// Optional fields only move when the new observation carries a value.
    /// Availability always follows the newest observation.
    pub fn observe(&mut self, incoming: &Self, now: i64) {
        coalesce(&mut self.title, incoming.title.as_ref());
        coalesce(&mut self.description, incoming.description.as_ref());
        coalesce(&mut self.channel_id, incoming.channel_id.as_ref());
        coalesce(&mut self.channel_title, incoming.channel_title.as_ref());
        coalesce(&mut self.duration_seconds, incoming.duration_seconds.as_ref());
        coalesce(&mut self.thumbnail_url, incoming.thumbnail_url.as_ref());
        coalesce(&mut self.published_at, incoming.published_at.as_ref());
        self.is_available = incoming.is_available;
        self.last_updated_at = now;
    }
}
