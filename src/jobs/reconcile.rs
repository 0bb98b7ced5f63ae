//! Repopulates the cache from the Store.
//!
//! Two keyset-paginated walks: post counters are overwritten with the Store
//! columns, then like sets are rebuilt from the like edges. Like sets of users
//! without any edge are dropped. The job only moves cache state toward Store
//! state, so it is idempotent and may run alongside live traffic.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;

use crate::cache::CounterCache;
use crate::error::AppResult;
use crate::store::Store;

pub const DEFAULT_BATCH_SIZE: i64 = 500;

/// Outcome of one reconciliation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub posts_synced: u64,
    /// Counters the cache refused to store
    pub posts_failed: u64,
    pub likes_synced: u64,
    pub likes_failed: u64,
    /// Like sets removed because the Store has no edge for their user
    pub like_sets_cleared: u64,
    #[serde(skip)]
    pub elapsed: Duration,
}

impl ReconcileReport {
    /// True when every write reached the cache.
    pub fn is_complete(&self) -> bool {
        self.posts_failed == 0 && self.likes_failed == 0
    }
}

#[derive(Clone)]
pub struct ReconciliationJob {
    store: Arc<dyn Store>,
    cache: CounterCache,
    batch_size: i64,
}

impl ReconciliationJob {
    pub fn new(store: Arc<dyn Store>, cache: CounterCache) -> Self {
        Self {
            store,
            cache,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    pub fn with_batch_size(mut self, batch_size: i64) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Walk the Store and write its state into the cache.
    ///
    /// Store errors abort the run. Cache write failures are counted in the
    /// report and the walk continues.
    pub async fn run(&self) -> AppResult<ReconcileReport> {
        let started = Instant::now();
        let mut report = ReconcileReport::default();

        self.sync_counters(&mut report).await?;
        self.sync_like_sets(&mut report).await?;

        report.elapsed = started.elapsed();
        tracing::info!(
            synced_posts = report.posts_synced,
            failed_posts = report.posts_failed,
            synced_likes = report.likes_synced,
            failed_likes = report.likes_failed,
            cleared_like_sets = report.like_sets_cleared,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "Cache reconciliation finished"
        );
        if !report.is_complete() {
            tracing::warn!(
                "Cache rejected some writes during reconciliation; run it again once the cache is healthy"
            );
        }
        Ok(report)
    }

    async fn sync_counters(&self, report: &mut ReconcileReport) -> AppResult<()> {
        let mut after_id = 0;
        loop {
            let batch = self
                .store
                .post_counters_after(after_id, self.batch_size)
                .await?;
            let Some(last) = batch.last() else {
                break;
            };
            after_id = last.id;

            for row in &batch {
                let written = self
                    .cache
                    .set_counts(
                        row.id,
                        i64::from(row.likes_count.max(0)),
                        i64::from(row.shares_count.max(0)),
                    )
                    .await;
                if written {
                    report.posts_synced += 1;
                } else {
                    report.posts_failed += 1;
                }
            }

            tracing::debug!(after_id, batch = batch.len(), "Synced post counter batch");
            if (batch.len() as i64) < self.batch_size {
                break;
            }
        }
        Ok(())
    }

    /// Replace every cached like set with its user's Store edges.
    ///
    /// Edges are grouped per user in memory before anything is written, so a
    /// set is swapped in whole and membership the Store never committed does
    /// not survive. Cached sets of users with no edge at all are removed.
    async fn sync_like_sets(&self, report: &mut ReconcileReport) -> AppResult<()> {
        let mut likes_by_user: BTreeMap<i32, Vec<i32>> = BTreeMap::new();
        let mut after_id = 0;
        loop {
            let batch = self.store.like_edges_after(after_id, self.batch_size).await?;
            let Some(last) = batch.last() else {
                break;
            };
            after_id = last.id;

            for edge in &batch {
                likes_by_user
                    .entry(edge.user_id)
                    .or_default()
                    .push(edge.post_id);
            }

            tracing::debug!(after_id, batch = batch.len(), "Read like edge batch");
            if (batch.len() as i64) < self.batch_size {
                break;
            }
        }

        for (user_id, post_ids) in &likes_by_user {
            let edges = post_ids.len() as u64;
            if self.cache.replace_user_likes(*user_id, post_ids).await {
                report.likes_synced += edges;
            } else {
                report.likes_failed += edges;
            }
        }

        let cached_owners = self.cache.users_with_like_sets().await.unwrap_or_default();
        for user_id in cached_owners {
            if likes_by_user.contains_key(&user_id) {
                continue;
            }
            if self.cache.replace_user_likes(user_id, &[]).await {
                report.like_sets_cleared += 1;
            } else {
                report.likes_failed += 1;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::cache::testing::FailingTransport;
    use crate::cache::{MemoryTransport, PostCounts};
    use crate::config::MemoryCacheConfig;
    use crate::models::{NewPost, NewUser};
    use crate::store::MemoryStore;

    async fn seeded_store(posts: usize) -> (Arc<MemoryStore>, i32, Vec<i32>) {
        let store = Arc::new(MemoryStore::new());
        let user = store
            .insert_user(NewUser {
                username: "author".to_string(),
                email: "author@example.com".to_string(),
                password: "digest".to_string(),
            })
            .await
            .unwrap();

        let mut ids = Vec::new();
        for i in 0..posts {
            let post = store
                .insert_post(NewPost {
                    user_id: user.id,
                    image_path: format!("{}.jpg", i),
                    caption: None,
                })
                .await
                .unwrap();
            ids.push(post.id);
        }
        (store, user.id, ids)
    }

    fn memory_cache() -> CounterCache {
        CounterCache::new(Arc::new(MemoryTransport::new(&MemoryCacheConfig::default())))
    }

    #[tokio::test]
    async fn test_restores_counters_into_empty_cache() {
        let (store, _, ids) = seeded_store(1).await;
        store.set_post_counters(ids[0], 7, 0).await.unwrap();
        let cache = memory_cache();

        let report = ReconciliationJob::new(store, cache.clone())
            .run()
            .await
            .unwrap();

        assert_eq!(report.posts_synced, 1);
        assert!(report.is_complete());
        assert_eq!(cache.get_counts(ids[0]).await, PostCounts::new(7, 0));
    }

    #[tokio::test]
    async fn test_restores_like_sets_across_batches() {
        let (store, user, ids) = seeded_store(5).await;
        for id in &ids {
            store.insert_like_edge(user, *id).await.unwrap();
        }
        let cache = memory_cache();

        let report = ReconciliationJob::new(store, cache.clone())
            .with_batch_size(2)
            .run()
            .await
            .unwrap();

        assert_eq!(report.posts_synced, 5);
        assert_eq!(report.likes_synced, 5);
        let liked = cache.get_user_liked_posts(user).await;
        assert_eq!(liked.len(), 5);
        for id in &ids {
            assert!(liked.contains(id));
            assert_eq!(cache.get_counts(*id).await.likes, 1);
        }
    }

    #[tokio::test]
    async fn test_overwrites_stale_counters_and_is_idempotent() {
        let (store, _, ids) = seeded_store(1).await;
        store.set_post_counters(ids[0], 3, 1).await.unwrap();
        let cache = memory_cache();
        cache.set_counts(ids[0], -4, 99).await;

        let job = ReconciliationJob::new(store, cache.clone());
        let first = job.run().await.unwrap();
        let second = job.run().await.unwrap();

        assert_eq!(first.posts_synced, second.posts_synced);
        assert_eq!(cache.get_counts(ids[0]).await, PostCounts::new(3, 1));
    }

    #[tokio::test]
    async fn test_drops_membership_without_store_edge() {
        let (store, user, ids) = seeded_store(3).await;
        store.insert_like_edge(user, ids[0]).await.unwrap();
        let cache = memory_cache();
        // Left behind by a failed Store write and by a deleted post
        cache.add_user_like(user, ids[1]).await;
        cache.add_user_like(user, 999).await;
        // A user whose only like never reached the Store
        cache.add_user_like(77, ids[2]).await;

        let report = ReconciliationJob::new(store, cache.clone())
            .run()
            .await
            .unwrap();

        assert_eq!(report.likes_synced, 1);
        assert_eq!(report.like_sets_cleared, 1);
        assert_eq!(cache.get_user_liked_posts(user).await, HashSet::from([ids[0]]));
        assert!(cache.lookup_user_liked_posts(77).await.is_miss());
    }

    #[tokio::test]
    async fn test_empty_store() {
        let store = Arc::new(MemoryStore::new());
        let report = ReconciliationJob::new(store, memory_cache())
            .run()
            .await
            .unwrap();
        assert_eq!(report.posts_synced, 0);
        assert_eq!(report.likes_synced, 0);
    }

    #[tokio::test]
    async fn test_cache_down_is_reported_not_fatal() {
        let (store, user, ids) = seeded_store(2).await;
        store.insert_like_edge(user, ids[0]).await.unwrap();
        let cache = CounterCache::new(Arc::new(FailingTransport));

        let report = ReconciliationJob::new(store, cache).run().await.unwrap();

        assert_eq!(report.posts_failed, 2);
        assert_eq!(report.likes_failed, 1);
        assert!(!report.is_complete());
    }
}
