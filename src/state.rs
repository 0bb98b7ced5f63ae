//! Application state shared by CLI commands and background jobs.
//!
//! Owns the connection handles with an explicit lifecycle: `connect` on
//! startup, `shutdown` before exit.

use std::sync::Arc;

use crate::auth::JwtAuthProvider;
use crate::blob::LocalBlobStore;
use crate::cache::CacheManager;
use crate::config::Settings;
use crate::db::{establish_async_connection_pool, run_pending_migrations};
use crate::error::AppResult;
use crate::jobs::ReconciliationJob;
use crate::services::Services;
use crate::store::{PgStore, Store};

/// Cloning is cheap; every handle is shared through `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub store: Arc<dyn Store>,
    pub cache: CacheManager,
    pub services: Services,
}

impl AppState {
    /// Connect to PostgreSQL and the configured cache and wire the services.
    ///
    /// Pending migrations are applied first when `database.auto_migrate` is set.
    pub async fn connect(settings: Settings) -> AppResult<Self> {
        if settings.database.auto_migrate {
            let applied = run_pending_migrations(&settings.database.url).await?;
            tracing::info!(count = applied.len(), "Applied pending migrations");
        }

        let pool = establish_async_connection_pool(&settings.database).await?;
        let store: Arc<dyn Store> = Arc::new(PgStore::new(pool));
        let cache = CacheManager::connect(settings.cache.clone()).await?;

        Ok(Self::from_parts(settings, store, cache))
    }

    /// Wire the services around an existing Store and cache.
    pub fn from_parts(settings: Settings, store: Arc<dyn Store>, cache: CacheManager) -> Self {
        let auth = Arc::new(JwtAuthProvider::new(&settings.jwt));
        let blobs = Arc::new(LocalBlobStore::from_config(&settings.uploads));
        let services = Services::new(store.clone(), cache.counters(), auth, blobs, &settings);

        Self {
            settings: Arc::new(settings),
            store,
            cache,
            services,
        }
    }

    pub fn reconciliation_job(&self) -> ReconciliationJob {
        ReconciliationJob::new(self.store.clone(), self.cache.counters())
    }

    /// Release the cache connection. Errors are logged, not returned.
    pub async fn shutdown(&self) {
        if let Err(e) = self.cache.close().await {
            tracing::warn!(error = %e, "Failed to close cache cleanly");
        }
        tracing::info!("Application state shut down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryTransport;
    use crate::models::{NewPost, NewUser};
    use crate::store::MemoryStore;

    fn memory_state() -> (AppState, Arc<MemoryStore>) {
        let settings = Settings::default();
        let store = Arc::new(MemoryStore::new());
        let cache = CacheManager::from_transport(
            Arc::new(MemoryTransport::new(&settings.cache.memory)),
            settings.cache.clone(),
        );
        (AppState::from_parts(settings, store.clone(), cache), store)
    }

    #[tokio::test]
    async fn test_reconciliation_job_uses_shared_cache() {
        let (state, store) = memory_state();
        let user = store
            .insert_user(NewUser {
                username: "author".to_string(),
                email: "author@example.com".to_string(),
                password: "digest".to_string(),
            })
            .await
            .unwrap();
        let post = store
            .insert_post(NewPost {
                user_id: user.id,
                image_path: "a.jpg".to_string(),
                caption: None,
            })
            .await
            .unwrap();
        store.set_post_counters(post.id, 3, 2).await.unwrap();

        state.reconciliation_job().run().await.unwrap();

        let view = state.services.posts.get_post(post.id).await.unwrap();
        assert_eq!(view.likes_count, 3);
        assert_eq!(view.shares_count, 2);
        assert!(state.cache.counters().lookup_counter(post.id).await.is_hit());
    }

    #[tokio::test]
    async fn test_shutdown_is_quiet() {
        let (state, _) = memory_state();
        state.shutdown().await;
    }
}
