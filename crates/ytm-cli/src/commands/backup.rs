use std::path::Path;

use ytm_core::backup::{run_backup as run_store_backup, BackupOptions, BackupReport};
use ytm_core::config::Config;

use crate::commands::common::{format_timestamp, open_store};
use crate::error::CliError;
use crate::source_dir::DirectorySource;

pub struct BackupRequest<'a> {
    pub source_dir: &'a Path,
    pub include_watch_later: bool,
    pub strict: bool,
    pub as_json: bool,
}

pub fn run_backup(
    request: &BackupRequest<'_>,
    config: &Config,
    db_path: &Path,
) -> Result<BackupReport, CliError> {
    let mut store = open_store(db_path)?;
    let mut source = DirectorySource::new(request.source_dir);
    let options = BackupOptions {
        include_watch_later: request.include_watch_later,
        watch_later_playlist_id: config.watch_later_playlist_id.clone(),
        abort_on_fetch_error: request.strict,
    };

    let report = run_store_backup(&mut store, &mut source, &options)?;
    store.close()?;

    if request.as_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for line in format_backup_lines(&report) {
            println!("{line}");
        }
    }

    Ok(report)
}

pub fn format_backup_lines(report: &BackupReport) -> Vec<String> {
    let mut lines = vec![format!(
        "Committed version {} at {}: {} playlist(s), {} item(s), {} removed",
        report.version.version,
        format_timestamp(report.version.committed_at),
        report.playlists.len(),
        report.items_upserted(),
        report.items_removed()
    )];
    for playlist_id in &report.removed_playlists {
        lines.push(format!("Playlist gone upstream: {playlist_id}"));
    }
    for warning in &report.warnings {
        lines.push(format!("Warning: {warning}"));
    }
    lines
}
