//! Arca - backup, restore and migration tooling for hierarchical document
//! stores.
//!
//! The CLI wires the engine to a locally persisted store image and exposes
//! the four operator workflows: backup, restore, migrate and clear. Every
//! command honors the global `--dry-run` flag by walking the same control
//! flow without writing anywhere.

mod commands;
mod config;
mod confirm;
mod context;
mod error;

use crate::commands::CommandOutcome;
use crate::config::Config;
use crate::context::StoreContext;
use crate::error::CliError;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "arca")]
#[command(about = "Backup, restore and migration tooling for hierarchical document stores")]
struct Cli {
    /// Walk every step without writing to the store or the filesystem
    #[arg(short = 'd', long, global = true)]
    dry_run: bool,

    /// Target the production data directory instead of the local one
    #[arg(short = 'p', long, global = true)]
    production: bool,

    /// Override the data directory
    #[arg(long, global = true, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    /// Override the backups directory
    #[arg(long, global = true, value_name = "DIR")]
    backups_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Back up the document store, user directory and policy texts
    Backup,

    /// Restore a backup unit (the most recent one by default)
    Restore {
        /// Path to a specific backup unit
        #[arg(value_name = "UNIT")]
        unit: Option<PathBuf>,
    },

    /// Migrate legacy flat collections into the owner-scoped layout
    Migrate {
        /// Delete the original documents once their copies have committed
        #[arg(long)]
        delete_old: bool,

        /// Field naming the owning user on legacy documents
        #[arg(long, default_value = "userId")]
        owner_field: String,
    },

    /// Delete owner-scoped subcollections (destructive, confirmation-gated)
    Clear {
        /// Skip the interactive confirmation
        #[arg(short, long)]
        force: bool,

        /// Collection holding the owner documents
        #[arg(long, default_value = "owners")]
        owner_collection: String,

        /// Subcollection names to clear under every owner (repeatable)
        #[arg(
            long = "subcollection",
            value_name = "NAME",
            default_values_t = arca_engine::MIGRATION_ORDER.map(String::from)
        )]
        subcollections: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "arca=info,arca_engine=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(CommandOutcome::Completed) => ExitCode::SUCCESS,
        Ok(CommandOutcome::Cancelled) => {
            println!("Cancelled; nothing was changed.");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<CommandOutcome, CliError> {
    let config = Config::resolve(cli.production, cli.dry_run, cli.data_dir, cli.backups_dir)?;
    tracing::debug!(
        data_dir = %config.data_dir.display(),
        backups_dir = %config.backups_dir.display(),
        production = config.production,
        dry_run = config.dry_run,
        "configuration resolved"
    );
    let ctx = StoreContext::load(&config)?;

    match cli.command {
        Commands::Backup => commands::backup::run(&config, &ctx).await,
        Commands::Restore { unit } => commands::restore::run(&config, &ctx, unit).await,
        Commands::Migrate {
            delete_old,
            owner_field,
        } => commands::migrate::run(&config, &ctx, &owner_field, delete_old).await,
        Commands::Clear {
            force,
            owner_collection,
            subcollections,
        } => commands::clear::run(&config, &ctx, force, &owner_collection, &subcollections).await,
    }
}
