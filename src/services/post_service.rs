//! Post service: uploads, ownership-checked edits, shares and the like toggle.
//!
//! Like and share counters are kept in two places. The Store holds the
//! durable columns; the cache holds the live values read by timelines. The
//! toggle mutates the cache first and the Store second. There is no two-phase
//! commit: when the Store write fails the two may disagree until the
//! reconciliation job runs again.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::blob::{BlobStore, UploadPolicy, UploadedFile};
use crate::cache::{CacheLookup, CounterCache, PostCounts};
use crate::error::{AppError, AppResult};
use crate::models::{NewPost, Post, PostWithAuthor};
use crate::store::Store;

/// Public rendering of a post with live counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostView {
    pub id: i32,
    pub user_id: i32,
    pub username: String,
    pub image_url: String,
    pub caption: Option<String>,
    pub likes_count: i64,
    pub shares_count: i64,
    pub created_at: jiff::Timestamp,
}

impl PostView {
    pub(crate) fn render(row: &PostWithAuthor, counts: PostCounts, image_url: String) -> Self {
        Self {
            id: row.post.id,
            user_id: row.post.user_id,
            username: row.author.username.clone(),
            image_url,
            caption: row.post.caption.clone(),
            likes_count: counts.likes,
            shares_count: counts.shares,
            created_at: row.post.created_at,
        }
    }
}

/// Outcome of a like toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LikeToggle {
    pub post_id: i32,
    /// State after the toggle
    pub liked: bool,
    pub likes_count: i64,
}

/// Outcome of a share.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShareOutcome {
    pub post_id: i32,
    pub shares_count: i64,
    pub share_url: String,
}

pub(crate) fn store_counts(post: &Post) -> PostCounts {
    PostCounts::new(i64::from(post.likes_count), i64::from(post.shares_count))
}

/// Post service for handling post-related business logic.
#[derive(Clone)]
pub struct PostService {
    store: Arc<dyn Store>,
    cache: CounterCache,
    blobs: Arc<dyn BlobStore>,
    uploads: UploadPolicy,
    frontend_url: String,
}

impl PostService {
    pub fn new(
        store: Arc<dyn Store>,
        cache: CounterCache,
        blobs: Arc<dyn BlobStore>,
        uploads: UploadPolicy,
        frontend_url: impl Into<String>,
    ) -> Self {
        Self {
            store,
            cache,
            blobs,
            uploads,
            frontend_url: frontend_url.into(),
        }
    }

    async fn require_post(&self, post_id: i32) -> AppResult<Post> {
        self.store
            .get_post(post_id)
            .await?
            .ok_or_else(|| AppError::not_found("post", post_id))
    }

    /// Owner-only lookup. Foreign posts are reported as missing.
    async fn require_owned_post(&self, user_id: i32, post_id: i32) -> AppResult<Post> {
        match self.store.get_post(post_id).await? {
            Some(post) if post.user_id == user_id => Ok(post),
            _ => Err(AppError::not_found("post", post_id)),
        }
    }

    /// Creates a post from an uploaded image.
    ///
    /// # Arguments
    /// * `user_id` - The author
    /// * `file` - The uploaded image
    /// * `caption` - Optional caption
    ///
    /// # Returns
    /// The created post, or `Validation` when the upload is rejected
    pub async fn create_post(
        &self,
        user_id: i32,
        file: &dyn UploadedFile,
        caption: Option<String>,
    ) -> AppResult<Post> {
        let (bytes, extension) = self.uploads.accept(file).await?;
        let blob_id = self.blobs.save(&bytes, &extension).await?;

        let post = match self
            .store
            .insert_post(NewPost {
                user_id,
                image_path: blob_id.clone(),
                caption,
            })
            .await
        {
            Ok(post) => post,
            Err(e) => {
                if let Err(cleanup) = self.blobs.delete(&blob_id).await {
                    tracing::warn!(
                        blob_id = %blob_id,
                        error = %cleanup,
                        "Failed to remove orphaned blob"
                    );
                }
                return Err(e);
            }
        };

        let invalidated = self.cache.invalidate_all_timelines().await;
        tracing::info!(post_id = post.id, user_id, invalidated, "Post created");
        Ok(post)
    }

    /// Gets a post with its author and live counters.
    pub async fn get_post(&self, post_id: i32) -> AppResult<PostView> {
        let row = self
            .store
            .get_post_with_author(post_id)
            .await?
            .ok_or_else(|| AppError::not_found("post", post_id))?;

        let counts = match self.cache.lookup_counter(post_id).await {
            CacheLookup::Hit(counter) => counter.resolve(store_counts(&row.post)),
            CacheLookup::Miss | CacheLookup::TransportError(_) => {
                store_counts(&row.post).clamped()
            }
        };
        let image_url = self.blobs.url_for(&row.post.image_path);
        Ok(PostView::render(&row, counts, image_url))
    }

    /// Replaces the caption of a post owned by `user_id`.
    pub async fn update_caption(
        &self,
        user_id: i32,
        post_id: i32,
        caption: Option<String>,
    ) -> AppResult<Post> {
        self.require_owned_post(user_id, post_id).await?;

        let post = self
            .store
            .update_post_caption(post_id, caption)
            .await?
            .ok_or_else(|| AppError::not_found("post", post_id))?;

        self.cache.invalidate_all_timelines().await;
        tracing::debug!(post_id, user_id, "Post caption updated");
        Ok(post)
    }

    /// Deletes a post owned by `user_id` together with its edges, image and
    /// cached counter.
    pub async fn delete_post(&self, user_id: i32, post_id: i32) -> AppResult<()> {
        self.require_owned_post(user_id, post_id).await?;

        let post = self
            .store
            .delete_post(post_id)
            .await?
            .ok_or_else(|| AppError::not_found("post", post_id))?;

        match self.blobs.delete(&post.image_path).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::debug!(post_id, blob_id = %post.image_path, "Image already gone")
            }
            Err(e) => tracing::warn!(
                post_id,
                blob_id = %post.image_path,
                error = %e,
                "Failed to delete image"
            ),
        }

        self.cache.delete_counts(post_id).await;
        self.cache.invalidate_all_timelines().await;
        tracing::info!(post_id, user_id, "Post deleted");
        Ok(())
    }

    /// Records a share and returns the link to hand out.
    pub async fn share_post(&self, user_id: i32, post_id: i32) -> AppResult<ShareOutcome> {
        let post = self.require_post(post_id).await?;

        let seeded = self.cache.seed_counts(post_id, store_counts(&post)).await;
        let cached = self.cache.increment_shares(post_id).await;

        let change = match self.store.insert_share_edge(user_id, post_id).await {
            Ok(change) => change,
            Err(e) => {
                if cached.is_hit() {
                    warn_divergence(user_id, post_id, "share", &e);
                }
                return Err(e);
            }
        };

        let shares_count = match cached {
            CacheLookup::Hit(count) if seeded && count >= 0 => count,
            CacheLookup::Hit(_) => {
                let store_value = i64::from(change.shares_count);
                self.cache
                    .set_counts(post_id, i64::from(change.likes_count), store_value)
                    .await;
                store_value
            }
            CacheLookup::Miss | CacheLookup::TransportError(_) => i64::from(change.shares_count),
        };

        self.cache.invalidate_user_timeline_cache(user_id).await;

        Ok(ShareOutcome {
            post_id,
            shares_count,
            share_url: format!("{}/post/{}", self.frontend_url.trim_end_matches('/'), post_id),
        })
    }

    /// Likes the post when the user has not liked it yet, unlikes it otherwise.
    ///
    /// Membership comes from the cache; when the cache cannot answer the
    /// Store like edge decides. The cache counter is written back from the
    /// Store whenever the Store change was a no-op or the cached value went
    /// negative.
    ///
    /// # Returns
    /// The new like state with the resulting count, `NotFound` for a missing
    /// post, or the Store error when the durable write failed
    pub async fn toggle_like(&self, user_id: i32, post_id: i32) -> AppResult<LikeToggle> {
        let post = self.require_post(post_id).await?;

        let currently_liked = match self.cache.lookup_user_like(user_id, post_id).await {
            CacheLookup::Hit(liked) => liked,
            CacheLookup::Miss | CacheLookup::TransportError(_) => {
                self.store.find_like_edge(user_id, post_id).await?
            }
        };

        let seeded = self.cache.seed_counts(post_id, store_counts(&post)).await;

        let (cached, stored) = if currently_liked {
            self.cache.remove_user_like(user_id, post_id).await;
            let cached = self.cache.decrement_likes(post_id).await;
            (cached, self.store.delete_like_edge(user_id, post_id).await)
        } else {
            self.cache.add_user_like(user_id, post_id).await;
            let cached = self.cache.increment_likes(post_id).await;
            (cached, self.store.insert_like_edge(user_id, post_id).await)
        };

        let change = match stored {
            Ok(change) => change,
            Err(e) => {
                warn_divergence(user_id, post_id, "like toggle", &e);
                return Err(e);
            }
        };

        let store_likes = i64::from(change.likes_count);
        let likes_count = match cached {
            CacheLookup::Hit(count) if seeded && change.applied && count >= 0 => count,
            CacheLookup::Hit(count) => {
                tracing::debug!(
                    post_id,
                    cached = count,
                    store = store_likes,
                    "Resyncing cached like count"
                );
                self.cache.set_likes(post_id, store_likes).await;
                store_likes
            }
            CacheLookup::Miss | CacheLookup::TransportError(_) => store_likes,
        };

        self.cache.invalidate_user_timeline_cache(user_id).await;

        let liked = !currently_liked;
        tracing::debug!(post_id, user_id, liked, likes_count, "Like toggled");
        Ok(LikeToggle {
            post_id,
            liked,
            likes_count,
        })
    }
}

fn warn_divergence(user_id: i32, post_id: i32, operation: &str, error: &AppError) {
    tracing::warn!(
        user_id,
        post_id,
        operation,
        error = %error,
        "Store write failed after cache update; cache may diverge until reconciliation runs"
    );
}
