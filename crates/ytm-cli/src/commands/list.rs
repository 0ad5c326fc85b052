use std::path::Path;

use ytm_core::util::now_millis;

use crate::cli::AtArgs;
use crate::commands::common::{
    entry_to_list_item, format_entry_lines, format_playlist_lines, open_existing_store,
    playlist_to_list_item, resolve_as_of, EntryListItem, PlaylistListItem,
};
use crate::error::CliError;

pub fn run_list_playlists(
    at: &AtArgs,
    include_removed: bool,
    as_json: bool,
    db_path: &Path,
) -> Result<(), CliError> {
    let as_of = resolve_as_of(at)?;
    let store = open_existing_store(db_path)?;
    let playlists = store.list_playlists(as_of, include_removed)?;

    if as_json {
        let json_items = playlists
            .iter()
            .map(playlist_to_list_item)
            .collect::<Vec<PlaylistListItem>>();
        println!("{}", serde_json::to_string_pretty(&json_items)?);
    } else {
        for line in format_playlist_lines(&playlists) {
            println!("{line}");
        }
    }

    Ok(())
}

pub fn run_list_items(
    playlist_id: &str,
    at: &AtArgs,
    include_removed: bool,
    limit: Option<usize>,
    as_json: bool,
    db_path: &Path,
) -> Result<(), CliError> {
    let as_of = resolve_as_of(at)?;
    let store = open_existing_store(db_path)?;
    let mut entries = store.list_playlist_entries(playlist_id, as_of, include_removed)?;
    if let Some(limit) = limit {
        entries.truncate(limit);
    }

    if as_json {
        let json_items = entries
            .iter()
            .map(entry_to_list_item)
            .collect::<Vec<EntryListItem>>();
        println!("{}", serde_json::to_string_pretty(&json_items)?);
    } else {
        for line in format_entry_lines(&entries, now_millis()) {
            println!("{line}");
        }
    }

    Ok(())
}
