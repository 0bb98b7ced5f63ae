//! PostgreSQL store backed by the diesel-async repositories.

use std::collections::HashSet;

use async_trait::async_trait;

use crate::db::AsyncDbPool;
use crate::error::{AppError, AppResult};
use crate::models::{
    EdgeChange, LikeEdge, NewPost, NewUser, Post, PostCounterRow, PostWithAuthor, UpdateUser,
    User,
};
use crate::repositories::Repositories;
use crate::store::Store;

#[derive(Clone)]
pub struct PgStore {
    repos: Repositories,
}

impl PgStore {
    pub fn new(pool: AsyncDbPool) -> Self {
        Self {
            repos: Repositories::new(pool),
        }
    }
}

#[async_trait]
impl Store for PgStore {
    async fn insert_user(&self, new_user: NewUser) -> AppResult<User> {
        self.repos.users.create(new_user).await
    }

    async fn get_user(&self, user_id: i32) -> AppResult<Option<User>> {
        self.repos.users.find_by_id(user_id).await
    }

    async fn find_user_by_username(&self, username: &str) -> AppResult<Option<User>> {
        self.repos.users.find_by_username(username).await
    }

    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        self.repos.users.find_by_email(email).await
    }

    async fn update_user(&self, user_id: i32, changes: UpdateUser) -> AppResult<User> {
        self.repos.users.update(user_id, changes).await.map_err(|e| match e {
            AppError::NotFound { .. } => AppError::not_found("user", user_id),
            other => other,
        })
    }

    async fn get_post(&self, post_id: i32) -> AppResult<Option<Post>> {
        self.repos.posts.find_by_id(post_id).await
    }

    async fn get_post_with_author(&self, post_id: i32) -> AppResult<Option<PostWithAuthor>> {
        self.repos.posts.find_with_author(post_id).await
    }

    async fn list_posts_page(&self, offset: i64, limit: i64) -> AppResult<Vec<PostWithAuthor>> {
        self.repos.posts.list_page(offset, limit).await
    }

    async fn count_posts(&self) -> AppResult<i64> {
        self.repos.posts.count().await
    }

    async fn insert_post(&self, new_post: NewPost) -> AppResult<Post> {
        self.repos.posts.create(new_post).await
    }

    async fn update_post_caption(
        &self,
        post_id: i32,
        caption: Option<String>,
    ) -> AppResult<Option<Post>> {
        self.repos.posts.update_caption(post_id, caption).await
    }

    async fn delete_post(&self, post_id: i32) -> AppResult<Option<Post>> {
        self.repos.posts.delete(post_id).await
    }

    async fn find_like_edge(&self, user_id: i32, post_id: i32) -> AppResult<bool> {
        self.repos.posts.like_exists(user_id, post_id).await
    }

    async fn liked_post_ids(&self, user_id: i32, post_ids: &[i32]) -> AppResult<HashSet<i32>> {
        self.repos.posts.liked_post_ids(user_id, post_ids).await
    }

    async fn insert_like_edge(&self, user_id: i32, post_id: i32) -> AppResult<EdgeChange> {
        self.repos.posts.insert_like(user_id, post_id).await
    }

    async fn delete_like_edge(&self, user_id: i32, post_id: i32) -> AppResult<EdgeChange> {
        self.repos.posts.delete_like(user_id, post_id).await
    }

    async fn insert_share_edge(&self, user_id: i32, post_id: i32) -> AppResult<EdgeChange> {
        self.repos.posts.insert_share(user_id, post_id).await
    }

    async fn post_counters_after(
        &self,
        after_id: i32,
        limit: i64,
    ) -> AppResult<Vec<PostCounterRow>> {
        self.repos.posts.counters_after(after_id, limit).await
    }

    async fn like_edges_after(&self, after_id: i32, limit: i64) -> AppResult<Vec<LikeEdge>> {
        self.repos.posts.like_edges_after(after_id, limit).await
    }
}
