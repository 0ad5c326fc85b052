//! Source collaborators and the adapters that map their payloads.
//!
//! Fetching is done outside the core; whatever fetches hands over complete
//! per-playlist snapshots and says whether each one is trustworthy enough to
//! drive removal marking.

pub mod api;
pub mod flat;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{Playlist, PlaylistItem, Video};

/// Placeholder titles the sources use for videos that can no longer be played
const UNAVAILABLE_TITLES: [&str; 4] = [
    "Private video",
    "Deleted video",
    "[Private video]",
    "[Deleted video]",
];

/// Errors reported by a source collaborator
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network failure, timeout, or similar; worth trying again next run
    #[error("Transient fetch failure: {0}")]
    Transient(String),

    /// The source answered with something the adapters cannot map
    #[error("Malformed source payload: {0}")]
    Malformed(String),

    /// The collaborator does not support this kind of fetch
    #[error("Unsupported fetch: {0}")]
    Unsupported(String),

    /// IO error while reading a source
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Whether a fetched enumeration is known to be complete
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Completeness {
    /// Every current member was enumerated
    Complete,
    /// Enumeration stopped early; absent members prove nothing
    Partial { reason: String },
}

impl Completeness {
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        matches!(self, Self::Complete)
    }
}

/// Current state of one playlist as reported by a source
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaylistSnapshot {
    pub playlist: Playlist,
    pub videos: Vec<Video>,
    pub items: Vec<PlaylistItem>,
}

/// A playlist snapshot together with its completeness
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPlaylist {
    pub snapshot: PlaylistSnapshot,
    pub completeness: Completeness,
}

/// The account's playlists as reported by a source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistListing {
    pub playlists: Vec<Playlist>,
    pub completeness: Completeness,
}

/// Source fetch collaborator.
///
/// Implementations do the network (or disk) work; the core only consumes
/// the mapped records.
pub trait SourceFetcher {
    /// Enumerate the account's playlists
    fn list_playlists(&mut self) -> Result<PlaylistListing, FetchError>;

    /// Fetch the current contents of one playlist
    fn fetch_playlist(&mut self, playlist: &Playlist) -> Result<FetchedPlaylist, FetchError>;

    /// Fetch the Watch Later playlist, which regular enumeration never lists.
    ///
    /// The snapshot and its memberships must be keyed by `playlist_id`.
    fn fetch_watch_later(&mut self, _playlist_id: &str) -> Result<FetchedPlaylist, FetchError> {
        Err(FetchError::Unsupported(
            "this source cannot read Watch Later".to_string(),
        ))
    }
}

/// Whether a source title marks a private or deleted video
#[must_use]
pub fn is_unavailable_title(title: Option<&str>) -> bool {
    title.is_some_and(|title| UNAVAILABLE_TITLES.contains(&title))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unavailable_titles_cover_both_sources() {
        assert!(is_unavailable_title(Some("Private video")));
        assert!(is_unavailable_title(Some("[Deleted video]")));
        assert!(!is_unavailable_title(Some("A private video about cats")));
        assert!(!is_unavailable_title(None));
    }

    #[test]
    fn completeness_flags() {
        assert!(Completeness::Complete.is_complete());
        assert!(!Completeness::Partial {
            reason: "page 3 failed".to_string()
        }
        .is_complete());
    }
}
