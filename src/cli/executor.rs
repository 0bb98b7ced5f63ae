//! Command executor for dispatching CLI commands
//!
//! This module provides the main entry point for executing CLI commands
//! after parsing and configuration loading.

use super::handlers::{
    CacheCommandHandler, MigrateCommandHandler, SyncCommandHandler, WorkerCommandHandler,
};
use super::parser::{Cli, Commands};
use crate::config::settings::Settings;
use crate::error::AppResult;

/// Execute a CLI command with the given settings
///
/// # Arguments
/// * `cli` - Parsed CLI arguments
/// * `settings` - Merged settings; each handler validates the sections it needs
///
/// # Errors
/// Returns errors from command handlers or validation failures
pub async fn execute_command(cli: &Cli, settings: Settings) -> AppResult<()> {
    match &cli.command {
        Commands::Migrate { dry_run, rollback } => {
            warn_large_rollback(*rollback);
            MigrateCommandHandler::new(settings)
                .execute(*dry_run, *rollback)
                .await
        }
        Commands::Sync { batch_size } => {
            SyncCommandHandler::new(settings)
                .execute(*batch_size)
                .await
        }
        Commands::Cache { action } => CacheCommandHandler::new(settings).execute(action).await,
        Commands::Worker {
            no_initial_sync, ..
        } => {
            WorkerCommandHandler::new(settings)
                .execute(*no_initial_sync)
                .await
        }
    }
}

fn warn_large_rollback(rollback: Option<u32>) {
    if let Some(steps) = rollback
        && steps > 50
    {
        eprintln!(
            "Warning: Rolling back {} migrations is a large operation. Consider using smaller steps.",
            steps
        );
    }
}
