use std::path::Path;

use ytm_core::config::Config;
use ytm_core::restore::{execute_restore, plan_restore, RestorePlan, RestoreTarget};

use crate::cli::RestoreArgs;
use crate::commands::common::{open_existing_store, resolve_as_of};
use crate::error::CliError;
use crate::executor::CommandExecutor;

const PREVIEW_LIMIT: usize = 10;

pub fn resolve_target(args: &RestoreArgs) -> RestoreTarget {
    match (&args.to_playlist, &args.create_new) {
        (Some(id), _) => RestoreTarget::Existing(id.clone()),
        (None, Some(title)) => RestoreTarget::New(title.clone()),
        (None, None) => RestoreTarget::Existing(String::new()),
    }
}

pub fn run_restore(
    args: &RestoreArgs,
    config: &Config,
    db_path: &Path,
) -> Result<RestorePlan, CliError> {
    let as_of = resolve_as_of(&args.at)?;
    let store = open_existing_store(db_path)?;
    let plan = plan_restore(
        &store,
        &args.playlist_id,
        as_of,
        resolve_target(args),
        &config.watch_later_playlist_id,
    )?;

    let outcome = match (args.dry_run, args.exec.as_deref()) {
        (false, Some(command)) => Some(
            execute_restore(&mut CommandExecutor::new(command), &plan)
                .map_err(|error| CliError::RestoreExecutor(error.to_string()))?,
        ),
        _ => None,
    };

    if args.json {
        let payload = serde_json::json!({ "plan": &plan, "outcome": &outcome });
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(plan);
    }

    for line in format_restore_lines(&plan) {
        println!("{line}");
    }
    match outcome {
        Some(outcome) => {
            println!("Restored {} video(s) to {}", outcome.added.len(), outcome.playlist_id);
            if !outcome.failed.is_empty() {
                println!(
                    "{} video(s) could not be added (may be unavailable)",
                    outcome.failed.len()
                );
            }
            println!(
                "https://www.youtube.com/playlist?list={}",
                outcome.playlist_id
            );
        }
        None => println!("Dry run: nothing was added."),
    }

    Ok(plan)
}

pub fn format_restore_lines(plan: &RestorePlan) -> Vec<String> {
    let target = match &plan.target {
        RestoreTarget::Existing(id) => id.clone(),
        RestoreTarget::New(title) => format!("new playlist \"{title}\""),
    };
    let mut lines = vec![format!(
        "{} video(s) from {} (version {}) to {target}",
        plan.videos.len(),
        plan.source_playlist_id,
        plan.version
    )];
    for video in plan.videos.iter().take(PREVIEW_LIMIT) {
        lines.push(format!(
            "  + {}",
            video.title.as_deref().unwrap_or(&video.video_id)
        ));
    }
    if plan.videos.len() > PREVIEW_LIMIT {
        lines.push(format!("  ... and {} more", plan.videos.len() - PREVIEW_LIMIT));
    }
    lines
}
