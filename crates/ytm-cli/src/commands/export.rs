use std::path::Path;

use ytm_core::export::{load_playlist_export, render_playlist_export, ExportFormat as CoreFormat};

use crate::cli::{AtArgs, ExportFormat};
use crate::commands::common::{open_existing_store, resolve_as_of};
use crate::error::CliError;

const fn core_format(format: ExportFormat) -> CoreFormat {
    match format {
        ExportFormat::Json => CoreFormat::Json,
        ExportFormat::Markdown => CoreFormat::Markdown,
    }
}

pub fn run_export(
    playlist_id: &str,
    at: &AtArgs,
    include_removed: bool,
    format: ExportFormat,
    output_path: Option<&Path>,
    db_path: &Path,
) -> Result<(), CliError> {
    let as_of = resolve_as_of(at)?;
    let store = open_existing_store(db_path)?;
    let export = load_playlist_export(&store, playlist_id, as_of, include_removed)?;
    let rendered = render_playlist_export(&export, core_format(format))?;

    if let Some(path) = output_path {
        std::fs::write(path, rendered)?;
        println!("{}", path.display());
    } else {
        println!("{rendered}");
    }

    Ok(())
}
