use std::path::Path;

use ytm_core::config::Config;
use ytm_core::prune::{execute, plan_prune, PrunePlan, PrunePolicy};
use ytm_core::retention::RetentionThreshold;
use ytm_core::util::now_millis;

use crate::cli::PruneArgs;
use crate::commands::common::{format_timestamp, open_existing_store};
use crate::error::CliError;
use crate::executor::CommandExecutor;

pub fn resolve_policy(args: &PruneArgs, config: &Config) -> Result<PrunePolicy, CliError> {
    if let Some(older_than) = &args.older_than {
        let threshold = match older_than.as_deref() {
            Some(raw) => raw.parse::<RetentionThreshold>()?,
            None => config.retention_threshold(),
        };
        return Ok(PrunePolicy::OlderThan(threshold));
    }
    if let Some(count) = args.count {
        return Ok(PrunePolicy::Oldest(count));
    }
    if args.all {
        return Ok(PrunePolicy::All);
    }
    Err(CliError::MissingPrunePolicy)
}

pub fn run_prune(args: &PruneArgs, config: &Config, db_path: &Path) -> Result<PrunePlan, CliError> {
    // Validate before touching the store.
    let policy = resolve_policy(args, config)?;
    let batch_size = args.batch_size.unwrap_or(config.prune_batch_size);

    let store = open_existing_store(db_path)?;
    let plan = plan_prune(&store, &args.playlist_id, policy, batch_size, now_millis())?;

    let outcome = match args.exec.as_deref() {
        Some(command) => Some(
            execute(&mut CommandExecutor::new(command), &plan)
                .map_err(|error| CliError::PruneExecutor(error.to_string()))?,
        ),
        None => None,
    };

    if args.json {
        let payload = serde_json::json!({ "plan": &plan, "outcome": &outcome });
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(plan);
    }

    for line in format_plan_lines(&plan) {
        println!("{line}");
    }
    match outcome {
        Some(outcome) => {
            println!(
                "Removed {} item(s), {} failed",
                outcome.removed.len(),
                outcome.failed.len()
            );
            println!("The local backup is unchanged; run `ytm backup` to record the removals.");
        }
        None => println!("Dry run: pass --exec to perform the removals."),
    }

    Ok(plan)
}

pub fn format_plan_lines(plan: &PrunePlan) -> Vec<String> {
    let mut lines = vec![format!(
        "{} of {} selected item(s) from {} (version {})",
        plan.targets.len(),
        plan.selected,
        plan.playlist_id,
        plan.version
    )];
    for target in &plan.targets {
        let added = target
            .age_timestamp
            .map_or_else(|| "unknown".to_string(), format_timestamp);
        lines.push(format!(
            "  {}  {}  {}",
            target.video_id,
            added,
            target.title.as_deref().unwrap_or("(untitled)")
        ));
    }
    if plan.has_more() {
        lines.push("Run again to remove more.".to_string());
    }
    lines
}
