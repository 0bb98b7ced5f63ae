//! Durable system of record for users, posts and their edges.
//!
//! `Store` is the seam between services and persistence. `PgStore` is the
//! production implementation; `MemoryStore` keeps everything in process.

mod memory;
mod postgres;

use std::collections::HashSet;

use async_trait::async_trait;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use crate::error::AppResult;
use crate::models::{
    EdgeChange, LikeEdge, NewPost, NewUser, Post, PostCounterRow, PostWithAuthor, UpdateUser,
    User,
};

/// Authoritative storage. Every write is a single transaction; counter
/// changes happen in the same transaction as the edge they belong to.
#[async_trait]
pub trait Store: Send + Sync {
    // Users

    /// Fails with `AppError::Duplicate` on a taken username or email.
    async fn insert_user(&self, new_user: NewUser) -> AppResult<User>;

    async fn get_user(&self, user_id: i32) -> AppResult<Option<User>>;

    async fn find_user_by_username(&self, username: &str) -> AppResult<Option<User>>;

    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<User>>;

    /// Fails with `AppError::NotFound` when the user does not exist.
    async fn update_user(&self, user_id: i32, changes: UpdateUser) -> AppResult<User>;

    // Posts

    async fn get_post(&self, post_id: i32) -> AppResult<Option<Post>>;

    async fn get_post_with_author(&self, post_id: i32) -> AppResult<Option<PostWithAuthor>>;

    /// Posts newest first (`created_at DESC, id DESC`).
    async fn list_posts_page(&self, offset: i64, limit: i64) -> AppResult<Vec<PostWithAuthor>>;

    async fn count_posts(&self) -> AppResult<i64>;

    async fn insert_post(&self, new_post: NewPost) -> AppResult<Post>;

    /// `None` when the post does not exist.
    async fn update_post_caption(
        &self,
        post_id: i32,
        caption: Option<String>,
    ) -> AppResult<Option<Post>>;

    /// Deletes the post with its like and share edges. `None` when absent.
    async fn delete_post(&self, post_id: i32) -> AppResult<Option<Post>>;

    // Edges

    async fn find_like_edge(&self, user_id: i32, post_id: i32) -> AppResult<bool>;

    /// Subset of `post_ids` the user has liked.
    async fn liked_post_ids(&self, user_id: i32, post_ids: &[i32]) -> AppResult<HashSet<i32>>;

    /// Insert the edge unless present and bump `likes_count` with it.
    async fn insert_like_edge(&self, user_id: i32, post_id: i32) -> AppResult<EdgeChange>;

    /// Remove the edge if present, decrementing `likes_count` with a floor at zero.
    async fn delete_like_edge(&self, user_id: i32, post_id: i32) -> AppResult<EdgeChange>;

    async fn insert_share_edge(&self, user_id: i32, post_id: i32) -> AppResult<EdgeChange>;

    // Reconciliation walks

    /// Up to `limit` post counters with `id > after_id`, ascending.
    async fn post_counters_after(
        &self,
        after_id: i32,
        limit: i64,
    ) -> AppResult<Vec<PostCounterRow>>;

    /// Up to `limit` like edges with `id > after_id`, ascending.
    async fn like_edges_after(&self, after_id: i32, limit: i64) -> AppResult<Vec<LikeEdge>>;
}
