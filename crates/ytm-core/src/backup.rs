//! Full synchronization run: every playlist in one transaction

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::db::{SyncTransaction, VersionedStore};
use crate::error::{Error, Result};
use crate::models::{Playlist, StoreVersion, WATCH_LATER_PLAYLIST_ID};
use crate::reconcile::{Reconciler, SyncReport};
use crate::source::{FetchError, FetchedPlaylist, PlaylistListing, SourceFetcher};

/// Knobs for one backup run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupOptions {
    /// Also fetch Watch Later, which playlist enumeration never reports
    pub include_watch_later: bool,
    /// Id Watch Later is stored under; never marked as removed
    pub watch_later_playlist_id: String,
    /// Treat a failed playlist fetch as fatal to the run instead of a warning
    pub abort_on_fetch_error: bool,
}

impl Default for BackupOptions {
    fn default() -> Self {
        Self {
            include_watch_later: false,
            watch_later_playlist_id: WATCH_LATER_PLAYLIST_ID.to_string(),
            abort_on_fetch_error: false,
        }
    }
}

/// Outcome of a committed backup run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupReport {
    pub version: StoreVersion,
    pub playlists: Vec<SyncReport>,
    /// Playlists a complete listing no longer reported
    pub removed_playlists: Vec<String>,
    /// Recoverable problems (failed fetches, skipped removal marking)
    pub warnings: Vec<String>,
}

impl BackupReport {
    /// Total memberships written across all playlists
    #[must_use]
    pub fn items_upserted(&self) -> usize {
        self.playlists.iter().map(|report| report.items_upserted).sum()
    }

    /// Total memberships newly marked as removed
    #[must_use]
    pub fn items_removed(&self) -> usize {
        self.playlists.iter().map(|report| report.items_removed).sum()
    }
}

#[derive(Default)]
struct RunState {
    reports: Vec<SyncReport>,
    removed_playlists: Vec<String>,
    warnings: Vec<String>,
}

/// Back up every playlist the fetcher reports as one new store version.
///
/// A failed playlist listing aborts before anything is written. A failed
/// playlist fetch is a warning: the listed metadata is still recorded but no
/// membership is marked removed. Any store failure, or a fetch failure with
/// `abort_on_fetch_error`, rolls the whole run back.
pub fn run_backup<F>(
    store: &mut VersionedStore,
    fetcher: &mut F,
    options: &BackupOptions,
) -> Result<BackupReport>
where
    F: SourceFetcher + ?Sized,
{
    let listing = fetcher.list_playlists()?;
    tracing::info!("Backing up {} playlist(s)", listing.playlists.len());

    let mut tx = store.begin()?;
    let mut state = RunState::default();

    match sync_all(&mut tx, fetcher, &listing, options, &mut state) {
        Ok(()) => {
            let version = tx.commit()?;
            Ok(BackupReport {
                version,
                playlists: state.reports,
                removed_playlists: state.removed_playlists,
                warnings: state.warnings,
            })
        }
        Err(error) => {
            let rolled_back_playlists = state.reports.len();
            if let Err(rollback_error) = tx.rollback() {
                // SQLite discards the open transaction on close either way.
                tracing::error!("Rollback failed: {rollback_error}");
            }
            tracing::error!("Backup aborted: {error}");
            Err(Error::TransactionAborted {
                rolled_back_playlists,
                reason: error.to_string(),
            })
        }
    }
}

fn sync_all<F>(
    tx: &mut SyncTransaction<'_>,
    fetcher: &mut F,
    listing: &PlaylistListing,
    options: &BackupOptions,
    state: &mut RunState,
) -> Result<()>
where
    F: SourceFetcher + ?Sized,
{
    let mut reconciler = Reconciler::new(tx);

    for playlist in &listing.playlists {
        let fetched = fetcher.fetch_playlist(playlist);
        sync_fetched(&mut reconciler, playlist, fetched, options, state)?;
    }

    if options.include_watch_later {
        sync_watch_later(&mut reconciler, fetcher, options, state)?;
    }

    if listing.completeness.is_complete() {
        let listed = listing
            .playlists
            .iter()
            .map(|playlist| playlist.playlist_id.as_str())
            .collect::<HashSet<_>>();
        let keep = HashSet::from([options.watch_later_playlist_id.as_str()]);
        state.removed_playlists = reconciler.mark_missing_playlists(&listed, &keep)?;
    } else {
        let warning = "Playlist listing was partial; no playlist marked as removed".to_string();
        tracing::warn!("{warning}");
        state.warnings.push(warning);
    }

    Ok(())
}

/// Watch Later is never listed, so a failed fetch has nothing observed to
/// record: the stored row is left as it was.
fn sync_watch_later<F>(
    reconciler: &mut Reconciler<'_, '_>,
    fetcher: &mut F,
    options: &BackupOptions,
    state: &mut RunState,
) -> Result<()>
where
    F: SourceFetcher + ?Sized,
{
    let playlist_id = options.watch_later_playlist_id.as_str();
    match fetcher.fetch_watch_later(playlist_id) {
        Ok(fetched) => {
            let report = reconciler.sync_playlist(&fetched.snapshot, &fetched.completeness)?;
            if let Some(reason) = &report.removal_skipped {
                state.warnings.push(format!(
                    "Watch Later: partial fetch, removals not marked ({reason})"
                ));
            }
            state.reports.push(report);
        }
        Err(FetchError::Unsupported(reason)) => {
            let warning = format!("Watch Later skipped: {reason}");
            tracing::warn!("{warning}");
            state.warnings.push(warning);
        }
        Err(error) if options.abort_on_fetch_error => return Err(Error::Fetch(error)),
        Err(error) => {
            let warning = format!("Watch Later ({playlist_id}): {error}");
            tracing::warn!("Fetch failed for {warning}");
            state.warnings.push(warning);
            state.reports.push(SyncReport {
                playlist_id: playlist_id.to_string(),
                removal_skipped: Some(error.to_string()),
                ..SyncReport::default()
            });
        }
    }
    Ok(())
}

fn sync_fetched(
    reconciler: &mut Reconciler<'_, '_>,
    listed: &Playlist,
    fetched: std::result::Result<FetchedPlaylist, FetchError>,
    options: &BackupOptions,
    state: &mut RunState,
) -> Result<()> {
    match fetched {
        Ok(fetched) => {
            let report = reconciler.sync_playlist(&fetched.snapshot, &fetched.completeness)?;
            if let Some(reason) = &report.removal_skipped {
                state.warnings.push(format!(
                    "{}: partial fetch, removals not marked ({reason})",
                    listed.title
                ));
            }
            state.reports.push(report);
        }
        Err(error) if options.abort_on_fetch_error => {
            return Err(Error::Fetch(error));
        }
        Err(error) => {
            let warning = format!("{} ({}): {error}", listed.title, listed.playlist_id);
            tracing::warn!("Fetch failed for {warning}");
            state.warnings.push(warning);

            // The listing did observe the playlist itself.
            reconciler.upsert_playlist(listed)?;
            state.reports.push(SyncReport {
                playlist_id: listed.playlist_id.clone(),
                removal_skipped: Some(error.to_string()),
                ..SyncReport::default()
            });
        }
    }
    Ok(())
}
