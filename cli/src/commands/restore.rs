//! Restore a backup unit into the store.

use crate::commands::CommandOutcome;
use crate::config::Config;
use crate::context::StoreContext;
use crate::error::CliError;
use arca_engine::backup::find_latest_unit;
use arca_engine::Orchestrator;
use std::path::PathBuf;

pub async fn run(
    config: &Config,
    ctx: &StoreContext,
    unit: Option<PathBuf>,
) -> Result<CommandOutcome, CliError> {
    let unit = match unit {
        Some(unit) if unit.is_dir() => unit,
        Some(unit) => return Err(CliError::UnitNotFound(unit)),
        None => find_latest_unit(&config.backups_dir)?
            .ok_or_else(|| CliError::NoBackupUnits(config.backups_dir.clone()))?,
    };

    let orchestrator = Orchestrator::new(ctx.store(), ctx.auth(), config.project_id.clone());
    let report = orchestrator.run_restore(&unit, config.dry_run).await?;

    let mode = if report.dry_run { "[dry-run] " } else { "" };
    println!("{mode}Restored unit {}", report.unit);
    for step in &report.steps {
        match &step.error {
            None => println!("  {}: {} restored", step.name, step.restored),
            Some(error) => println!("  {}: FAILED ({error})", step.name),
        }
    }

    if !report.dry_run {
        ctx.persist()?;
    }
    Ok(CommandOutcome::Completed)
}
