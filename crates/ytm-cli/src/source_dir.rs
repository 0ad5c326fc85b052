//! Source fetcher over saved responses on disk.
//!
//! Layout of a source directory:
//!
//! ```text
//! playlists.json          playlists.list response page(s)
//! items/<playlist>.json   playlistItems.list response page(s)
//! flat/<playlist>.json    yt-dlp -J --flat-playlist dump (used when items/ has none)
//! watch_later.json        yt-dlp -J --flat-playlist dump of Watch Later
//! ```
//!
//! Page files hold either one response object or an array of them in
//! fetch order.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Deserialize;
use ytm_core::source::api::{self, ListResponse};
use ytm_core::source::flat::{self, FlatPlaylist};
use ytm_core::source::{FetchError, FetchedPlaylist, PlaylistListing, SourceFetcher};
use ytm_core::Playlist;

#[derive(Deserialize)]
#[serde(untagged)]
enum Pages<T> {
    Many(Vec<ListResponse<T>>),
    One(ListResponse<T>),
}

impl<T> Pages<T> {
    fn into_vec(self) -> Vec<ListResponse<T>> {
        match self {
            Self::Many(pages) => pages,
            Self::One(page) => vec![page],
        }
    }
}

pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn items_path(&self, playlist_id: &str) -> PathBuf {
        self.root.join("items").join(format!("{playlist_id}.json"))
    }

    fn flat_path(&self, playlist_id: &str) -> PathBuf {
        self.root.join("flat").join(format!("{playlist_id}.json"))
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, FetchError> {
    let raw = std::fs::read_to_string(path)?;
    serde_json::from_str(&raw)
        .map_err(|error| FetchError::Malformed(format!("{}: {error}", path.display())))
}

impl SourceFetcher for DirectorySource {
    fn list_playlists(&mut self) -> Result<PlaylistListing, FetchError> {
        let pages = read_json::<Pages<api::PlaylistResource>>(&self.root.join("playlists.json"))?;
        Ok(api::listing_from_pages(&pages.into_vec()))
    }

    fn fetch_playlist(&mut self, playlist: &Playlist) -> Result<FetchedPlaylist, FetchError> {
        let items_path = self.items_path(&playlist.playlist_id);
        if items_path.exists() {
            let pages = read_json::<Pages<api::PlaylistItemResource>>(&items_path)?;
            return Ok(api::snapshot_from_pages(playlist.clone(), &pages.into_vec()));
        }

        let flat_path = self.flat_path(&playlist.playlist_id);
        if flat_path.exists() {
            let info = read_json::<FlatPlaylist>(&flat_path)?;
            let mut fetched = flat::snapshot_from_flat(&info, &playlist.playlist_id);
            // The listing knows more about the playlist than a flat dump does.
            fetched.snapshot.playlist = Playlist {
                item_count: fetched.snapshot.playlist.item_count,
                ..playlist.clone()
            };
            return Ok(fetched);
        }

        Err(FetchError::Transient(format!(
            "no saved items for {} under {}",
            playlist.playlist_id,
            self.root.display()
        )))
    }

    fn fetch_watch_later(&mut self, playlist_id: &str) -> Result<FetchedPlaylist, FetchError> {
        let path = self.root.join("watch_later.json");
        if !path.exists() {
            return Err(FetchError::Unsupported(format!(
                "no watch_later.json under {}",
                self.root.display()
            )));
        }
        let info = read_json::<FlatPlaylist>(&path)?;
        Ok(flat::watch_later_snapshot(&info, playlist_id))
    }
}
