use std::path::Path;

use ytm_core::diff::{diff, StoreDiff};

use crate::commands::common::{
    format_set_diff_lines, format_version_lines, open_existing_store, version_to_list_item,
    VersionListItem,
};
use crate::error::CliError;

pub fn run_versions(limit: usize, as_json: bool, db_path: &Path) -> Result<(), CliError> {
    let store = open_existing_store(db_path)?;
    let mut versions = store.list_versions()?;
    versions.truncate(limit);

    if as_json {
        let json_items = versions
            .iter()
            .map(version_to_list_item)
            .collect::<Vec<VersionListItem>>();
        println!("{}", serde_json::to_string_pretty(&json_items)?);
    } else if versions.is_empty() {
        println!("No backups yet");
    } else {
        for line in format_version_lines(&versions) {
            println!("{line}");
        }
    }

    Ok(())
}

pub fn run_diff(
    from: i64,
    to: Option<i64>,
    as_json: bool,
    db_path: &Path,
) -> Result<StoreDiff, CliError> {
    let store = open_existing_store(db_path)?;
    let to = match to {
        Some(version) => version,
        None => store.latest_version()?,
    };
    let result = diff(&store, from, to)?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        for line in format_diff_lines(&result) {
            println!("{line}");
        }
    }

    Ok(result)
}

pub fn format_diff_lines(result: &StoreDiff) -> Vec<String> {
    let mut lines = vec![format!("Version {} -> {}", result.from, result.to)];
    if result.is_empty() {
        lines.push("No changes".to_string());
        return lines;
    }
    lines.extend(format_set_diff_lines("Playlists", &result.playlists));
    lines.extend(format_set_diff_lines("Videos", &result.videos));
    lines.extend(format_set_diff_lines("Items", &result.playlist_items));
    lines
}
