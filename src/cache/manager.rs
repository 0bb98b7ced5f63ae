//! Cache manager owning the configured transport.
//!
//! Built once at startup, handed to services through `AppState`, and closed
//! on shutdown.

use std::sync::Arc;

use crate::cache::memory::MemoryTransport;
use crate::cache::noop::NoOpTransport;
use crate::cache::redis::RedisTransport;
use crate::cache::{CacheError, CacheTransport, CounterCache, keys};
use crate::config::settings::{CacheBackend, CacheConfig};

/// Key counts for one `cache stats` pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyCount {
    pub pattern: &'static str,
    pub label: &'static str,
    pub count: u64,
}

/// Handle on the cache transport with an explicit lifecycle.
#[derive(Clone)]
pub struct CacheManager {
    transport: Arc<dyn CacheTransport>,
    config: CacheConfig,
}

impl CacheManager {
    /// Build the transport selected by configuration.
    ///
    /// An unreachable Redis is logged and tolerated; only an unusable
    /// configuration is an error.
    pub async fn connect(config: CacheConfig) -> Result<Self, CacheError> {
        let transport: Arc<dyn CacheTransport> = if !config.enabled {
            Arc::new(NoOpTransport::new())
        } else {
            match config.backend {
                CacheBackend::Memory => Arc::new(MemoryTransport::new(&config.memory)),
                CacheBackend::Redis => Arc::new(RedisTransport::new(&config.redis)?),
            }
        };

        let manager = Self { transport, config };

        if manager.is_enabled() {
            match manager.ping().await {
                Ok(()) => tracing::info!(
                    backend = manager.backend_name(),
                    "Cache connected"
                ),
                Err(e) => tracing::warn!(
                    backend = manager.backend_name(),
                    error = %e,
                    "Cache unreachable at startup, continuing with Store-only reads"
                ),
            }
        } else {
            tracing::info!("Cache disabled, all reads go to the Store");
        }

        Ok(manager)
    }

    /// Wrap an existing transport, used by tests and embedders.
    pub fn from_transport(transport: Arc<dyn CacheTransport>, config: CacheConfig) -> Self {
        Self { transport, config }
    }

    pub fn transport(&self) -> &Arc<dyn CacheTransport> {
        &self.transport
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    pub fn backend_name(&self) -> &'static str {
        self.transport.backend_name()
    }

    /// Fail-open facade sharing this manager's transport.
    pub fn counters(&self) -> CounterCache {
        CounterCache::new(Arc::clone(&self.transport))
    }

    pub async fn ping(&self) -> Result<(), CacheError> {
        self.transport.ping().await
    }

    /// Key counts per known pattern, for operators.
    pub async fn stats(&self) -> Result<Vec<KeyCount>, CacheError> {
        let mut counts = Vec::with_capacity(keys::STATS_PATTERNS.len());
        for (pattern, label) in keys::STATS_PATTERNS {
            counts.push(KeyCount {
                pattern,
                label,
                count: self.transport.count_keys(pattern).await?,
            });
        }
        Ok(counts)
    }

    /// Remove every key in the cache namespace.
    pub async fn flush(&self) -> Result<(), CacheError> {
        self.transport.clear().await?;
        tracing::info!(backend = self.backend_name(), "Cache flushed");
        Ok(())
    }

    pub async fn close(&self) -> Result<(), CacheError> {
        self.transport.close().await?;
        tracing::info!(backend = self.backend_name(), "Cache closed");
        Ok(())
    }
}
