//! Full backup into a new timestamped unit.

use crate::commands::CommandOutcome;
use crate::config::Config;
use crate::context::StoreContext;
use crate::error::CliError;
use arca_engine::{count_documents, AuthStore, Exporter, Orchestrator};

pub async fn run(config: &Config, ctx: &StoreContext) -> Result<CommandOutcome, CliError> {
    if config.dry_run {
        // A backup never mutates the store, so a dry run only previews
        // what would land in the unit.
        let users = ctx.auth().list_users().await?.len();
        let tree = Exporter::new(ctx.store()).export_all().await?;
        let documents: usize = tree.values().map(|docs| count_documents(docs)).sum();
        println!(
            "[dry-run] would back up {users} users and {documents} documents into {}",
            config.backups_dir.display()
        );
        return Ok(CommandOutcome::Completed);
    }

    let orchestrator = Orchestrator::new(ctx.store(), ctx.auth(), config.project_id.clone());
    let manifest = orchestrator.run_backup(&config.backups_dir).await?;

    println!(
        "Backup unit {} written under {}",
        manifest.unit,
        config.backups_dir.display()
    );
    println!("  users:     {}", manifest.users);
    println!("  documents: {}", manifest.documents);
    println!(
        "  policies:  {} ({} skipped)",
        manifest.policies, manifest.policies_skipped
    );
    Ok(CommandOutcome::Completed)
}
