use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Mutex;
use tokio_cron_scheduler::{Job, JobScheduler as TokioCronScheduler};

use crate::error::{AppError, AppResult};
use crate::jobs::reconcile::{ReconcileReport, ReconciliationJob};

/// Clears the running flag when a run ends, panics included.
struct RunGuard<'a>(&'a AtomicBool);

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Reconciliation that never overlaps with itself.
#[derive(Clone)]
pub struct ExclusiveReconciler {
    job: ReconciliationJob,
    running: Arc<AtomicBool>,
}

impl ExclusiveReconciler {
    pub fn new(job: ReconciliationJob) -> Self {
        Self {
            job,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Run once unless a run is already in progress, in which case `None`.
    pub async fn run(&self) -> AppResult<Option<ReconcileReport>> {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::info!("Reconciliation already running, skipping this trigger");
            return Ok(None);
        }
        let _guard = RunGuard(&self.running);
        self.job.run().await.map(Some)
    }
}

/// Wrapper around tokio-cron-scheduler that triggers reconciliation
pub struct ReconciliationScheduler {
    scheduler: Arc<Mutex<TokioCronScheduler>>,
    reconciler: ExclusiveReconciler,
}

impl ReconciliationScheduler {
    pub async fn new(reconciler: ExclusiveReconciler) -> AppResult<Self> {
        let scheduler = TokioCronScheduler::new()
            .await
            .map_err(|e| AppError::Internal {
                source: anyhow::Error::from(e),
            })?;

        Ok(Self {
            scheduler: Arc::new(Mutex::new(scheduler)),
            reconciler,
        })
    }

    /// Register a run for every tick of a six-field cron expression.
    pub async fn schedule(&self, cron_expression: &str) -> AppResult<()> {
        let reconciler = self.reconciler.clone();

        let cron_job = Job::new_async(cron_expression, move |_uuid, _lock| {
            let reconciler = reconciler.clone();

            Box::pin(async move {
                if let Err(e) = reconciler.run().await {
                    tracing::error!(error = %e, "Scheduled reconciliation failed");
                }
            })
        })
        .map_err(|e| AppError::Validation {
            field: "reconciliation.schedule".to_string(),
            reason: format!("Invalid cron expression: {}", e),
        })?;

        self.scheduler
            .lock()
            .await
            .add(cron_job)
            .await
            .map_err(|e| AppError::Internal {
                source: anyhow::Error::from(e),
            })?;

        tracing::info!(schedule = %cron_expression, "Reconciliation scheduled");
        Ok(())
    }

    pub async fn start(&self) -> AppResult<()> {
        self.scheduler
            .lock()
            .await
            .start()
            .await
            .map_err(|e| AppError::Internal {
                source: anyhow::Error::from(e),
            })?;
        Ok(())
    }

    /// Stop the scheduler gracefully
    pub async fn stop(&self) -> AppResult<()> {
        self.scheduler
            .lock()
            .await
            .shutdown()
            .await
            .map_err(|e| AppError::Internal {
                source: anyhow::Error::from(e),
            })?;
        Ok(())
    }
}
