//! ytm CLI - versioned YouTube playlist backups
//!
//! Back up playlists from saved source responses, then browse, diff,
//! export or restore any past version.

mod cli;
mod commands;
mod error;
mod executor;
mod source_dir;

use clap::Parser;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands, HistoryCommands, ListCommands};
use crate::commands::backup::{run_backup, BackupRequest};
use crate::commands::common::{load_config, resolve_db_path};
use crate::commands::completions::run_completions;
use crate::commands::export::run_export;
use crate::commands::history::{run_diff, run_versions};
use crate::commands::list::{run_list_items, run_list_playlists};
use crate::commands::prune::run_prune;
use crate::commands::restore::run_restore;
use crate::error::CliError;

fn main() {
    if let Err(error) = run() {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    let directive = "ytm=info"
        .parse::<Directive>()
        .map_err(|error| CliError::Config(format!("invalid log directive: {error}")))?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(directive))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Commands::Completions { shell, output } = &cli.command {
        return run_completions(*shell, output.as_deref());
    }

    let config = load_config(cli.config.as_deref())?;
    let db_path = resolve_db_path(cli.db_path.as_deref(), &config);
    tracing::debug!("Using database at {}", db_path.display());

    match cli.command {
        Commands::Backup {
            source,
            watch_later,
            strict,
            json,
        } => {
            let request = BackupRequest {
                source_dir: &source,
                include_watch_later: watch_later,
                strict,
                as_json: json,
            };
            run_backup(&request, &config, &db_path)?;
        }
        Commands::List { command } => match command {
            ListCommands::Playlists {
                at,
                include_removed,
                json,
            } => run_list_playlists(&at, include_removed, json, &db_path)?,
            ListCommands::Items {
                playlist_id,
                at,
                include_removed,
                limit,
                json,
            } => run_list_items(&playlist_id, &at, include_removed, limit, json, &db_path)?,
        },
        Commands::History { command } => match command {
            HistoryCommands::Versions { limit, json } => run_versions(limit, json, &db_path)?,
            HistoryCommands::Diff { from, to, json } => {
                run_diff(from, to, json, &db_path)?;
            }
        },
        Commands::Prune(args) => {
            run_prune(&args, &config, &db_path)?;
        }
        Commands::Restore(args) => {
            run_restore(&args, &config, &db_path)?;
        }
        Commands::Export {
            playlist_id,
            at,
            include_removed,
            format,
            output,
        } => run_export(
            &playlist_id,
            &at,
            include_removed,
            format,
            output.as_deref(),
            &db_path,
        )?,
        Commands::Completions { .. } => {}
    }

    Ok(())
}
