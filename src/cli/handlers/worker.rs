//! Worker command handler
//!
//! Reconciles on startup, then runs the cron schedule until Ctrl-C.

use tokio_util::sync::CancellationToken;

use crate::config::settings::Settings;
use crate::error::AppResult;
use crate::jobs::{ExclusiveReconciler, ReconciliationScheduler};
use crate::state::AppState;

/// Handler for the worker command
pub struct WorkerCommandHandler {
    config: Settings,
}

impl WorkerCommandHandler {
    pub fn new(config: Settings) -> Self {
        Self { config }
    }

    pub async fn execute(&self, no_initial_sync: bool) -> AppResult<()> {
        self.config.validate()?;

        let state = AppState::connect(self.config.clone()).await?;

        let shutdown = CancellationToken::new();
        let signal = shutdown.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => tracing::info!("Shutdown signal received"),
                Err(e) => tracing::error!(error = %e, "Failed to listen for shutdown signal"),
            }
            signal.cancel();
        });

        let result = Self::run(&state, no_initial_sync, shutdown).await;
        state.shutdown().await;
        result
    }

    /// Worker loop against an already connected state.
    pub async fn run(
        state: &AppState,
        no_initial_sync: bool,
        shutdown: CancellationToken,
    ) -> AppResult<()> {
        let reconciler = ExclusiveReconciler::new(state.reconciliation_job());

        if state.settings.reconciliation.run_on_startup && !no_initial_sync {
            reconciler.run().await?;
        }

        let Some(schedule) = state.settings.reconciliation.schedule.clone() else {
            tracing::info!("No reconciliation schedule configured, worker exiting");
            return Ok(());
        };

        let scheduler = ReconciliationScheduler::new(reconciler).await?;
        scheduler.schedule(&schedule).await?;
        scheduler.start().await?;
        tracing::info!(schedule = %schedule, "Worker running, press Ctrl-C to stop");

        shutdown.cancelled().await;

        scheduler.stop().await?;
        tracing::info!("Worker stopped");
        Ok(())
    }
}
