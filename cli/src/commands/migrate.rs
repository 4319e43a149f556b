//! Migrate legacy flat collections into the owner-scoped layout.

use crate::commands::CommandOutcome;
use crate::config::Config;
use crate::context::StoreContext;
use crate::error::CliError;
use arca_engine::Migrator;

pub async fn run(
    config: &Config,
    ctx: &StoreContext,
    owner_field: &str,
    delete_old: bool,
) -> Result<CommandOutcome, CliError> {
    let migrator = Migrator::new(ctx.store(), config.dry_run);
    let summary = migrator.migrate_all(owner_field, delete_old).await;

    let mode = if config.dry_run { "[dry-run] " } else { "" };
    for record in &summary.records {
        println!(
            "{mode}{}: {}/{} migrated, {} errors",
            record.collection, record.migrated, record.total, record.errors
        );
    }
    println!(
        "{mode}total: {} migrated, {} errors",
        summary.total_migrated(),
        summary.total_errors()
    );

    if !config.dry_run {
        ctx.persist()?;
    }
    Ok(CommandOutcome::Completed)
}
