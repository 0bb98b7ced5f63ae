//! Counter and membership cache.
//!
//! Layers, bottom up:
//! - `CacheTransport`: raw key/value, hash, set and pattern operations,
//!   implemented for Redis, in-process memory, and a no-op when disabled
//! - `CacheLookup`: `Hit` / `Miss` / `TransportError`
//! - `CounterCache`: the fail-open facade used by services and jobs
//!
//! # Configuration
//!
//! ```toml
//! [cache]
//! enabled = true
//! backend = "memory"  # or "redis"
//! session_ttl_seconds = 3600
//! online_ttl_seconds = 300
//!
//! [cache.memory]
//! max_entries = 100000
//!
//! [cache.redis]
//! url = "redis://127.0.0.1:6379"
//! pool_size = 8
//! connection_timeout = 5
//! key_prefix = "vistagram"
//! ```

mod counters;
mod error;
pub mod keys;
mod lookup;
mod manager;
mod memory;
mod noop;
mod redis;
#[cfg(test)]
pub(crate) mod testing;
mod traits;

pub use counters::{CachedCounter, CounterCache, PostCounts};
pub use error::CacheError;
pub use lookup::CacheLookup;
pub use manager::{CacheManager, KeyCount};
pub use memory::MemoryTransport;
pub use noop::NoOpTransport;
pub use redis::RedisTransport;
pub use traits::CacheTransport;
