//! In-process store.
//!
//! Mirrors the PostgreSQL schema's behavior: unique usernames and emails,
//! cascading post deletes, counters adjusted under the same lock as their
//! edge, and a floor at zero on every decrement.

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::{AppError, AppResult};
use crate::models::{
    EdgeChange, LikeEdge, NewPost, NewUser, Post, PostCounterRow, PostWithAuthor, UpdateUser,
    User, UserSummary,
};
use crate::store::Store;

#[derive(Debug, Clone, Copy)]
struct ShareEdge {
    post_id: i32,
}

#[derive(Debug, Default)]
struct State {
    users: BTreeMap<i32, User>,
    posts: BTreeMap<i32, Post>,
    likes: BTreeMap<i32, LikeEdge>,
    shares: BTreeMap<i32, ShareEdge>,
    next_user_id: i32,
    next_post_id: i32,
    next_like_id: i32,
    next_share_id: i32,
}

fn next_id(counter: &mut i32) -> i32 {
    *counter += 1;
    *counter
}

fn duplicate(field: &str, value: &str) -> AppError {
    AppError::Duplicate {
        entity: "users".to_string(),
        field: field.to_string(),
        value: value.to_string(),
    }
}

impl State {
    fn check_unique(
        &self,
        user_id: Option<i32>,
        username: Option<&str>,
        email: Option<&str>,
    ) -> AppResult<()> {
        for user in self.users.values().filter(|u| Some(u.id) != user_id) {
            if let Some(name) = username
                && user.username == name
            {
                return Err(duplicate("username", name));
            }
            if let Some(mail) = email
                && user.email == mail
            {
                return Err(duplicate("email", mail));
            }
        }
        Ok(())
    }

    fn with_author(&self, post: &Post) -> PostWithAuthor {
        let author = self
            .users
            .get(&post.user_id)
            .map(UserSummary::from)
            .unwrap_or_else(|| UserSummary {
                id: post.user_id,
                username: String::new(),
            });
        PostWithAuthor {
            post: post.clone(),
            author,
        }
    }

    fn post_mut(&mut self, post_id: i32) -> AppResult<&mut Post> {
        self.posts
            .get_mut(&post_id)
            .ok_or_else(|| AppError::not_found("post", post_id))
    }

    fn has_like(&self, user_id: i32, post_id: i32) -> bool {
        self.likes
            .values()
            .any(|edge| edge.user_id == user_id && edge.post_id == post_id)
    }
}

/// Counter deltas applied with their edge, each clamped at zero.
fn adjust_counters(post: &mut Post, delta_likes: i32, delta_shares: i32) {
    post.likes_count = post.likes_count.saturating_add(delta_likes).max(0);
    post.shares_count = post.shares_count.saturating_add(delta_shares).max(0);
}

fn change(post: &Post, applied: bool) -> EdgeChange {
    EdgeChange {
        applied,
        likes_count: post.likes_count,
        shares_count: post.shares_count,
    }
}

/// Store kept entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<State>,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail with `AppError::Database`.
    ///
    /// Used to exercise the partial-failure paths of the toggle protocol.
    pub fn set_fail_writes(&self, enabled: bool) {
        self.fail_writes.store(enabled, Ordering::SeqCst);
    }

    fn check_writable(&self, operation: &str) -> AppResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(AppError::Database {
                operation: operation.to_string(),
                source: anyhow::anyhow!("store unavailable"),
            });
        }
        Ok(())
    }

    /// Overwrite a post's counter columns directly, bypassing edges.
    pub async fn set_post_counters(&self, post_id: i32, likes: i32, shares: i32) -> AppResult<()> {
        let mut state = self.state.write().await;
        let post = state.post_mut(post_id)?;
        post.likes_count = likes;
        post.shares_count = shares;
        Ok(())
    }

    /// Number of like edges between a user and a post, duplicates included.
    pub async fn like_edge_count(&self, user_id: i32, post_id: i32) -> usize {
        let state = self.state.read().await;
        state
            .likes
            .values()
            .filter(|edge| edge.user_id == user_id && edge.post_id == post_id)
            .count()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_user(&self, new_user: NewUser) -> AppResult<User> {
        self.check_writable("insert user")?;
        let mut state = self.state.write().await;
        state.check_unique(None, Some(&new_user.username), Some(&new_user.email))?;

        let now = jiff::Timestamp::now();
        let user = User {
            id: next_id(&mut state.next_user_id),
            username: new_user.username,
            email: new_user.email,
            password: new_user.password,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        state.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get_user(&self, user_id: i32) -> AppResult<Option<User>> {
        Ok(self.state.read().await.users.get(&user_id).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> AppResult<Option<User>> {
        let state = self.state.read().await;
        Ok(state.users.values().find(|u| u.username == username).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let state = self.state.read().await;
        Ok(state.users.values().find(|u| u.email == email).cloned())
    }

    async fn update_user(&self, user_id: i32, changes: UpdateUser) -> AppResult<User> {
        self.check_writable("update user")?;
        let mut state = self.state.write().await;
        state.check_unique(
            Some(user_id),
            changes.username.as_deref(),
            changes.email.as_deref(),
        )?;

        let user = state
            .users
            .get_mut(&user_id)
            .ok_or_else(|| AppError::not_found("user", user_id))?;
        if let Some(username) = changes.username {
            user.username = username;
        }
        if let Some(email) = changes.email {
            user.email = email;
        }
        if let Some(password) = changes.password {
            user.password = password;
        }
        user.updated_at = jiff::Timestamp::now();
        Ok(user.clone())
    }

    async fn get_post(&self, post_id: i32) -> AppResult<Option<Post>> {
        Ok(self.state.read().await.posts.get(&post_id).cloned())
    }

    async fn get_post_with_author(&self, post_id: i32) -> AppResult<Option<PostWithAuthor>> {
        let state = self.state.read().await;
        Ok(state.posts.get(&post_id).map(|post| state.with_author(post)))
    }

    async fn list_posts_page(&self, offset: i64, limit: i64) -> AppResult<Vec<PostWithAuthor>> {
        let state = self.state.read().await;
        let mut posts: Vec<&Post> = state.posts.values().collect();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        Ok(posts
            .into_iter()
            .skip(usize::try_from(offset).unwrap_or(0))
            .take(usize::try_from(limit).unwrap_or(0))
            .map(|post| state.with_author(post))
            .collect())
    }

    async fn count_posts(&self) -> AppResult<i64> {
        Ok(self.state.read().await.posts.len() as i64)
    }

    async fn insert_post(&self, new_post: NewPost) -> AppResult<Post> {
        self.check_writable("insert post")?;
        let mut state = self.state.write().await;
        if !state.users.contains_key(&new_post.user_id) {
            return Err(AppError::Validation {
                field: "user_id".to_string(),
                reason: format!("Referenced user {} does not exist", new_post.user_id),
            });
        }

        let now = jiff::Timestamp::now();
        let post = Post {
            id: next_id(&mut state.next_post_id),
            user_id: new_post.user_id,
            image_path: new_post.image_path,
            caption: new_post.caption,
            likes_count: 0,
            shares_count: 0,
            created_at: now,
            updated_at: now,
        };
        state.posts.insert(post.id, post.clone());
        Ok(post)
    }

    async fn update_post_caption(
        &self,
        post_id: i32,
        caption: Option<String>,
    ) -> AppResult<Option<Post>> {
        self.check_writable("update post caption")?;
        let mut state = self.state.write().await;
        Ok(state.posts.get_mut(&post_id).map(|post| {
            post.caption = caption;
            post.updated_at = jiff::Timestamp::now();
            post.clone()
        }))
    }

    async fn delete_post(&self, post_id: i32) -> AppResult<Option<Post>> {
        self.check_writable("delete post")?;
        let mut state = self.state.write().await;
        let removed = state.posts.remove(&post_id);
        if removed.is_some() {
            state.likes.retain(|_, edge| edge.post_id != post_id);
            state.shares.retain(|_, edge| edge.post_id != post_id);
        }
        Ok(removed)
    }

    async fn find_like_edge(&self, user_id: i32, post_id: i32) -> AppResult<bool> {
        Ok(self.state.read().await.has_like(user_id, post_id))
    }

    async fn liked_post_ids(&self, user_id: i32, post_ids: &[i32]) -> AppResult<HashSet<i32>> {
        let state = self.state.read().await;
        Ok(state
            .likes
            .values()
            .filter(|edge| edge.user_id == user_id && post_ids.contains(&edge.post_id))
            .map(|edge| edge.post_id)
            .collect())
    }

    async fn insert_like_edge(&self, user_id: i32, post_id: i32) -> AppResult<EdgeChange> {
        self.check_writable("insert like edge")?;
        let mut state = self.state.write().await;
        state.post_mut(post_id)?;

        if state.has_like(user_id, post_id) {
            return Ok(change(state.post_mut(post_id)?, false));
        }

        let id = next_id(&mut state.next_like_id);
        state.likes.insert(id, LikeEdge { id, user_id, post_id });

        let post = state.post_mut(post_id)?;
        adjust_counters(post, 1, 0);
        Ok(change(post, true))
    }

    async fn delete_like_edge(&self, user_id: i32, post_id: i32) -> AppResult<EdgeChange> {
        self.check_writable("delete like edge")?;
        let mut state = self.state.write().await;
        state.post_mut(post_id)?;

        let before = state.likes.len();
        state
            .likes
            .retain(|_, edge| !(edge.user_id == user_id && edge.post_id == post_id));
        let applied = state.likes.len() != before;

        let post = state.post_mut(post_id)?;
        if applied {
            adjust_counters(post, -1, 0);
        }
        Ok(change(post, applied))
    }

    async fn insert_share_edge(&self, user_id: i32, post_id: i32) -> AppResult<EdgeChange> {
        self.check_writable("insert share edge")?;
        let mut state = self.state.write().await;
        state.post_mut(post_id)?;

        let id = next_id(&mut state.next_share_id);
        state.shares.insert(id, ShareEdge { post_id });
        tracing::trace!(share_id = id, user_id, post_id, "Share edge recorded");

        let post = state.post_mut(post_id)?;
        adjust_counters(post, 0, 1);
        Ok(change(post, true))
    }

    async fn post_counters_after(
        &self,
        after_id: i32,
        limit: i64,
    ) -> AppResult<Vec<PostCounterRow>> {
        let state = self.state.read().await;
        Ok(state
            .posts
            .range(after_id.saturating_add(1)..)
            .take(usize::try_from(limit).unwrap_or(0))
            .map(|(_, post)| PostCounterRow {
                id: post.id,
                likes_count: post.likes_count,
                shares_count: post.shares_count,
            })
            .collect())
    }

    async fn like_edges_after(&self, after_id: i32, limit: i64) -> AppResult<Vec<LikeEdge>> {
        let state = self.state.read().await;
        Ok(state
            .likes
            .range(after_id.saturating_add(1)..)
            .take(usize::try_from(limit).unwrap_or(0))
            .map(|(_, edge)| *edge)
            .collect())
    }
}
