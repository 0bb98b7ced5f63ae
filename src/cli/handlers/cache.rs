//! Cache command handler
//!
//! Ping, per-kind key counts and flush. These are the only paths where a
//! cache failure is reported to the caller instead of being absorbed.

use crate::cache::CacheManager;
use crate::cli::parser::CacheCommand;
use crate::config::settings::Settings;
use crate::error::{AppError, AppResult};

/// Handler for the cache command
pub struct CacheCommandHandler {
    config: Settings,
}

impl CacheCommandHandler {
    pub fn new(config: Settings) -> Self {
        Self { config }
    }

    pub async fn execute(&self, action: &CacheCommand) -> AppResult<()> {
        self.config.cache.validate()?;

        let manager = CacheManager::connect(self.config.cache.clone()).await?;
        let result = Self::run(&manager, action).await;
        if let Err(e) = manager.close().await {
            tracing::debug!(error = %e, "Cache close failed");
        }
        result
    }

    pub async fn run(manager: &CacheManager, action: &CacheCommand) -> AppResult<()> {
        match action {
            CacheCommand::Ping => {
                manager.ping().await?;
                println!("✓ Cache backend '{}' is reachable", manager.backend_name());
            }
            CacheCommand::Stats => {
                println!("Cache backend: {}", manager.backend_name());
                for entry in manager.stats().await? {
                    println!("  {:<16} {:>8}  ({})", entry.label, entry.count, entry.pattern);
                }
            }
            CacheCommand::Flush { yes } => {
                if !*yes {
                    return Err(AppError::Validation {
                        field: "yes".to_string(),
                        reason: "Flushing drops every counter, like set and session. Pass --yes to confirm."
                            .to_string(),
                    });
                }
                manager.flush().await?;
                println!("✓ Cache flushed. Run `vistagram sync` to restore counters and like sets.");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::cache::testing::FailingTransport;
    use crate::cache::{CacheTransport, MemoryTransport};
    use crate::config::CacheConfig;

    fn memory_manager() -> (CacheManager, Arc<MemoryTransport>) {
        let config = CacheConfig::default();
        let transport = Arc::new(MemoryTransport::new(&config.memory));
        (CacheManager::from_transport(transport.clone(), config), transport)
    }

    #[tokio::test]
    async fn test_ping_and_stats() {
        let (manager, _) = memory_manager();
        CacheCommandHandler::run(&manager, &CacheCommand::Ping).await.unwrap();
        CacheCommandHandler::run(&manager, &CacheCommand::Stats).await.unwrap();
    }

    #[tokio::test]
    async fn test_flush_requires_confirmation() {
        let (manager, transport) = memory_manager();
        transport.set("session:1", "token", None).await.unwrap();

        let err = CacheCommandHandler::run(&manager, &CacheCommand::Flush { yes: false })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
        assert!(!transport.is_empty());

        CacheCommandHandler::run(&manager, &CacheCommand::Flush { yes: true })
            .await
            .unwrap();
        assert!(transport.is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_cache_is_reported() {
        let manager =
            CacheManager::from_transport(Arc::new(FailingTransport), CacheConfig::default());
        let err = CacheCommandHandler::run(&manager, &CacheCommand::Ping)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Cache { .. }));
    }
}
