//! Background jobs.
//!
//! Reconciliation runs once from the CLI, on worker startup, or on a cron
//! schedule through `ReconciliationScheduler`.

pub mod reconcile;
pub mod scheduler;

pub use reconcile::{ReconcileReport, ReconciliationJob};
pub use scheduler::{ExclusiveReconciler, ReconciliationScheduler};
