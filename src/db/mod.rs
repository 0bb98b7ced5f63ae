//! Database connection pool module.
//!
//! Provides async PostgreSQL connection pooling using diesel_async with bb8,
//! and the embedded schema migrations.

mod migrate;
mod pool;

pub use migrate::{
    applied_migrations, pending_migrations, revert_migrations, run_pending_migrations,
};
pub use pool::{AsyncDbPool, MIGRATIONS, establish_async_connection_pool};
