//! Destructive owner-scoped clear, preview first, confirmation-gated.

use crate::commands::CommandOutcome;
use crate::config::Config;
use crate::confirm::{self, Gate};
use crate::context::StoreContext;
use crate::error::CliError;
use arca_engine::Clearer;

pub async fn run(
    config: &Config,
    ctx: &StoreContext,
    force: bool,
    owner_collection: &str,
    subcollections: &[String],
) -> Result<CommandOutcome, CliError> {
    // The preview always runs dry, whatever the flags say.
    let preview = Clearer::new(ctx.store(), true)
        .clear_owner_scoped(owner_collection, subcollections)
        .await?;
    println!(
        "About to delete {} documents under {} owners ({} in {owner_collection})",
        preview.deleted,
        preview.owners,
        subcollections.join(", ")
    );

    if config.dry_run {
        println!("[dry-run] nothing was deleted");
        return Ok(CommandOutcome::Completed);
    }

    if confirm::gate(force)? == Gate::Cancelled {
        return Ok(CommandOutcome::Cancelled);
    }

    let report = Clearer::new(ctx.store(), false)
        .clear_owner_scoped(owner_collection, subcollections)
        .await?;
    ctx.persist()?;

    println!(
        "Deleted {} documents under {} owners",
        report.deleted, report.owners
    );
    Ok(CommandOutcome::Completed)
}
