//! Command handlers for CLI operations
//!
//! This module contains handlers for different CLI commands,
//! separating command execution logic from parsing and validation.

pub mod cache;
pub mod migrate;
pub mod sync;
pub mod worker;

pub use cache::CacheCommandHandler;
pub use migrate::MigrateCommandHandler;
pub use sync::SyncCommandHandler;
pub use worker::WorkerCommandHandler;
