//! Sync command handler
//!
//! Runs the reconciliation job once and prints its report.

use crate::config::settings::Settings;
use crate::error::AppResult;
use crate::jobs::ReconcileReport;
use crate::state::AppState;

/// Handler for the sync command
pub struct SyncCommandHandler {
    config: Settings,
}

impl SyncCommandHandler {
    pub fn new(config: Settings) -> Self {
        Self { config }
    }

    /// Connect, reconcile once and shut down.
    pub async fn execute(&self, batch_size: Option<i64>) -> AppResult<()> {
        self.config.database.validate()?;
        self.config.cache.validate()?;

        let state = AppState::connect(self.config.clone()).await?;
        let result = Self::run(&state, batch_size).await;
        state.shutdown().await;

        let report = result?;
        Self::print_report(&report);
        Ok(())
    }

    /// Reconcile against an already connected state.
    pub async fn run(state: &AppState, batch_size: Option<i64>) -> AppResult<ReconcileReport> {
        if !state.cache.is_enabled() {
            tracing::warn!("Cache is disabled, nothing to reconcile into");
        }
        let mut job = state.reconciliation_job();
        if let Some(size) = batch_size {
            job = job.with_batch_size(size);
        }
        job.run().await
    }

    fn print_report(report: &ReconcileReport) {
        println!("Cache reconciliation finished in {:?}", report.elapsed);
        println!(
            "  post counters: {} synced, {} failed",
            report.posts_synced, report.posts_failed
        );
        println!(
            "  like edges:    {} synced, {} failed",
            report.likes_synced, report.likes_failed
        );
        if report.like_sets_cleared > 0 {
            println!("  stale like sets removed: {}", report.like_sets_cleared);
        }
        if report.is_complete() {
            println!("✓ Cache matches the database");
        } else {
            println!("Some writes were rejected by the cache; run sync again once it is healthy");
        }
    }
}
