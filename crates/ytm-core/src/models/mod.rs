//! Data models for ytm

mod playlist;
mod playlist_item;
mod version;
mod video;

pub use playlist::{Playlist, WATCH_LATER_PLAYLIST_ID};
pub use playlist_item::{PlaylistEntry, PlaylistItem};
pub use version::{StoreVersion, VersionId};
pub use video::Video;

/// Replace `slot` only when the new observation actually carries a value.
pub(crate) fn coalesce<T: Clone>(slot: &mut Option<T>, incoming: Option<&T>) {
    if let Some(value) = incoming {
        *slot = Some(value.clone());
    }
}
