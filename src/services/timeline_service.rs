//! Timeline assembly.
//!
//! A page is built from Store rows with the cache overlaid: live counters
//! where the cache has them, the Store columns where it does not, and the
//! viewer's like set for `is_liked`. Assembled pages are cached per
//! `(user, page)` for a fixed TTL and served as-is until they expire or are
//! invalidated; a cached page is not re-merged with newer counters.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::blob::BlobStore;
use crate::cache::{CacheLookup, CounterCache};
use crate::config::settings::TimelineConfig;
use crate::error::AppResult;
use crate::services::post_service::{PostView, store_counts};
use crate::store::Store;

/// One rendered timeline row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelinePost {
    #[serde(flatten)]
    pub post: PostView,
    pub is_liked: bool,
}

/// A page of the timeline with the total number of posts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimelinePage {
    pub posts: Vec<TimelinePost>,
    pub total: i64,
    /// Zero-based page index
    pub page: u32,
    pub per_page: u32,
}

/// Cached form of a page. Pages built for another page size are ignored.
#[derive(Debug, Serialize, Deserialize)]
struct TimelineSnapshot {
    per_page: u32,
    posts: Vec<TimelinePost>,
}

#[derive(Clone)]
pub struct TimelineService {
    store: Arc<dyn Store>,
    cache: CounterCache,
    blobs: Arc<dyn BlobStore>,
    config: TimelineConfig,
}

impl TimelineService {
    pub fn new(
        store: Arc<dyn Store>,
        cache: CounterCache,
        blobs: Arc<dyn BlobStore>,
        config: TimelineConfig,
    ) -> Self {
        Self {
            store,
            cache,
            blobs,
            config,
        }
    }

    /// Page size actually used for a request.
    pub fn effective_per_page(&self, requested: Option<u32>) -> u32 {
        requested
            .unwrap_or(self.config.default_per_page)
            .clamp(1, self.config.max_per_page.max(1))
    }

    /// Gets one page of the timeline as seen by `user_id`.
    ///
    /// # Arguments
    /// * `user_id` - The viewer, used for `is_liked` and the snapshot key
    /// * `page` - Zero-based page index
    /// * `per_page` - Requested page size, clamped to the configured maximum
    ///
    /// # Returns
    /// The rendered posts newest first with the uncached total post count
    pub async fn get_timeline(
        &self,
        user_id: i32,
        page: u32,
        per_page: Option<u32>,
    ) -> AppResult<TimelinePage> {
        let per_page = self.effective_per_page(per_page);

        let posts = match self
            .cache
            .lookup_timeline_page::<TimelineSnapshot>(user_id, page)
            .await
        {
            CacheLookup::Hit(snapshot) if snapshot.per_page == per_page => {
                tracing::debug!(user_id, page, "Serving cached timeline page");
                snapshot.posts
            }
            _ => self.assemble(user_id, page, per_page).await?,
        };

        let total = self.store.count_posts().await?;

        Ok(TimelinePage {
            posts,
            total,
            page,
            per_page,
        })
    }

    async fn assemble(
        &self,
        user_id: i32,
        page: u32,
        per_page: u32,
    ) -> AppResult<Vec<TimelinePost>> {
        let offset = i64::from(page) * i64::from(per_page);
        let rows = self
            .store
            .list_posts_page(offset, i64::from(per_page))
            .await?;

        let liked = self
            .liked_posts(user_id, rows.iter().map(|row| row.post.id).collect())
            .await?;

        let mut posts = Vec::with_capacity(rows.len());
        for row in &rows {
            let store = store_counts(&row.post);
            let counts = match self.cache.lookup_counter(row.post.id).await {
                CacheLookup::Hit(counter) => counter.resolve(store),
                CacheLookup::Miss | CacheLookup::TransportError(_) => store.clamped(),
            };
            let image_url = self.blobs.url_for(&row.post.image_path);
            posts.push(TimelinePost {
                post: PostView::render(row, counts, image_url),
                is_liked: liked.contains(&row.post.id),
            });
        }

        let snapshot = TimelineSnapshot { per_page, posts };
        self.cache
            .cache_timeline_page(
                user_id,
                page,
                &snapshot,
                Duration::from_secs(self.config.snapshot_ttl_seconds),
            )
            .await;

        tracing::debug!(
            user_id,
            page,
            per_page,
            rows = snapshot.posts.len(),
            "Assembled timeline page"
        );
        Ok(snapshot.posts)
    }

    /// Posts on this page the viewer likes.
    ///
    /// An empty cache set reads as "nothing liked"; only a transport error
    /// sends the question to the Store.
    async fn liked_posts(&self, user_id: i32, post_ids: Vec<i32>) -> AppResult<HashSet<i32>> {
        if post_ids.is_empty() {
            return Ok(HashSet::new());
        }
        match self.cache.lookup_user_liked_posts(user_id).await {
            CacheLookup::Hit(liked) => Ok(liked),
            CacheLookup::Miss => Ok(HashSet::new()),
            CacheLookup::TransportError(_) => self.store.liked_post_ids(user_id, &post_ids).await,
        }
    }
}
