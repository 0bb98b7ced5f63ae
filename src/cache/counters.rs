//! Fail-open counter and membership cache.
//!
//! `CounterCache` is the only way the rest of the crate touches the cache.
//! Every operation absorbs transport errors: writes report `false`, reads
//! return the empty value, and the `lookup_*` variants expose the
//! `Hit`/`Miss`/`TransportError` distinction for callers that need it.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::cache::keys::{self, LIKES_FIELD, SHARES_FIELD};
use crate::cache::{CacheError, CacheLookup, CacheTransport};

/// Like and share totals for one post.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostCounts {
    pub likes: i64,
    pub shares: i64,
}

impl PostCounts {
    pub fn new(likes: i64, shares: i64) -> Self {
        Self { likes, shares }
    }

    pub fn clamped(self) -> Self {
        Self {
            likes: self.likes.max(0),
            shares: self.shares.max(0),
        }
    }
}

/// Raw counter hash as found in the cache. Fields may be missing or negative.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CachedCounter {
    pub likes: Option<i64>,
    pub shares: Option<i64>,
}

impl CachedCounter {
    /// Overlay onto Store values field by field, clamped at zero.
    pub fn resolve(&self, store: PostCounts) -> PostCounts {
        PostCounts {
            likes: self.likes.unwrap_or(store.likes).max(0),
            shares: self.shares.unwrap_or(store.shares).max(0),
        }
    }
}

fn absorb(operation: &'static str, key: &str, err: &CacheError) {
    match err {
        // Cache disabled, nothing worth reporting
        CacheError::NotInitialized => {
            tracing::debug!(operation, key = %key, "Cache disabled, using fallback value")
        }
        _ => tracing::warn!(
            operation,
            key = %key,
            error = %err,
            "Cache unavailable, using fallback value"
        ),
    }
}

/// Cache facade for counters, like sets, timeline snapshots and sessions.
#[derive(Clone)]
pub struct CounterCache {
    transport: Arc<dyn CacheTransport>,
}

impl CounterCache {
    pub fn new(transport: Arc<dyn CacheTransport>) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &Arc<dyn CacheTransport> {
        &self.transport
    }

    fn ok_or_absorb<T>(
        &self,
        operation: &'static str,
        key: &str,
        result: Result<T, CacheError>,
    ) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                absorb(operation, key, &e);
                None
            }
        }
    }

    fn lookup<T>(
        &self,
        operation: &'static str,
        key: &str,
        result: Result<Option<T>, CacheError>,
    ) -> CacheLookup<T> {
        if let Err(ref e) = result {
            absorb(operation, key, e);
        }
        CacheLookup::from(result)
    }

    // ------------------------------------------------------------------------
    // Post counters
    // ------------------------------------------------------------------------

    pub async fn lookup_counter(&self, post_id: i32) -> CacheLookup<CachedCounter> {
        let key = keys::post_counter(post_id);
        let result = self.transport.hash_get_all(&key).await.map(|fields| {
            if fields.is_empty() {
                None
            } else {
                Some(CachedCounter {
                    likes: fields.get(LIKES_FIELD).copied(),
                    shares: fields.get(SHARES_FIELD).copied(),
                })
            }
        });
        self.lookup("hgetall", &key, result)
    }

    /// Clamped counts, zero when absent or unreachable.
    pub async fn get_counts(&self, post_id: i32) -> PostCounts {
        self.lookup_counter(post_id)
            .await
            .hit()
            .map(|counter| counter.resolve(PostCounts::default()))
            .unwrap_or_default()
    }

    /// Idempotent overwrite of both fields.
    pub async fn set_counts(&self, post_id: i32, likes: i64, shares: i64) -> bool {
        let key = keys::post_counter(post_id);
        let result = self
            .transport
            .hash_set_all(&key, &[(LIKES_FIELD, likes), (SHARES_FIELD, shares)])
            .await;
        self.ok_or_absorb("hset", &key, result).is_some()
    }

    pub async fn set_likes(&self, post_id: i32, likes: i64) -> bool {
        let key = keys::post_counter(post_id);
        let result = self.transport.hash_set_all(&key, &[(LIKES_FIELD, likes)]).await;
        self.ok_or_absorb("hset", &key, result).is_some()
    }

    /// Write Store counts into the fields the counter does not have yet.
    ///
    /// A live field is never overwritten, so an increment racing the seed is
    /// kept. Returns true when the counter is seeded afterwards.
    pub async fn seed_counts(&self, post_id: i32, store: PostCounts) -> bool {
        let key = keys::post_counter(post_id);
        let result = self
            .transport
            .hash_set_if_absent(
                &key,
                &[(LIKES_FIELD, store.likes), (SHARES_FIELD, store.shares)],
            )
            .await;
        self.ok_or_absorb("hsetnx", &key, result).is_some()
    }

    async fn incr(&self, post_id: i32, field: &str, delta: i64) -> CacheLookup<i64> {
        let key = keys::post_counter(post_id);
        let result = self.transport.hash_incr(&key, field, delta).await.map(Some);
        self.lookup("hincrby", &key, result)
    }

    pub async fn increment_likes(&self, post_id: i32) -> CacheLookup<i64> {
        self.incr(post_id, LIKES_FIELD, 1).await
    }

    /// May go negative; callers write back the Store value in that case.
    pub async fn decrement_likes(&self, post_id: i32) -> CacheLookup<i64> {
        self.incr(post_id, LIKES_FIELD, -1).await
    }

    pub async fn increment_shares(&self, post_id: i32) -> CacheLookup<i64> {
        self.incr(post_id, SHARES_FIELD, 1).await
    }

    pub async fn delete_counts(&self, post_id: i32) -> bool {
        let key = keys::post_counter(post_id);
        let result = self.transport.delete(&key).await;
        self.ok_or_absorb("del", &key, result).is_some()
    }

    // ------------------------------------------------------------------------
    // Like membership
    // ------------------------------------------------------------------------

    pub async fn add_user_like(&self, user_id: i32, post_id: i32) -> bool {
        let key = keys::user_likes(user_id);
        let result = self.transport.set_add(&key, &post_id.to_string()).await;
        self.ok_or_absorb("sadd", &key, result).is_some()
    }

    pub async fn remove_user_like(&self, user_id: i32, post_id: i32) -> bool {
        let key = keys::user_likes(user_id);
        let result = self.transport.set_remove(&key, &post_id.to_string()).await;
        self.ok_or_absorb("srem", &key, result).is_some()
    }

    /// `Hit` when the user's like set answers, `Miss` when the user has no
    /// like set cached.
    pub async fn lookup_user_like(&self, user_id: i32, post_id: i32) -> CacheLookup<bool> {
        let key = keys::user_likes(user_id);
        let result = match self.transport.set_is_member(&key, &post_id.to_string()).await {
            Ok(true) => Ok(Some(true)),
            // An absent set answers false too, tell the two apart
            Ok(false) => self
                .transport
                .exists(&key)
                .await
                .map(|exists| exists.then_some(false)),
            Err(e) => Err(e),
        };
        self.lookup("sismember", &key, result)
    }

    pub async fn has_user_liked(&self, user_id: i32, post_id: i32) -> bool {
        self.lookup_user_like(user_id, post_id)
            .await
            .hit()
            .unwrap_or(false)
    }

    /// `Miss` when the user has no like set in the cache.
    pub async fn lookup_user_liked_posts(&self, user_id: i32) -> CacheLookup<HashSet<i32>> {
        let key = keys::user_likes(user_id);
        let result = self.transport.set_members(&key).await.map(|members| {
            let ids: HashSet<i32> = members
                .iter()
                .filter_map(|member| match member.parse::<i32>() {
                    Ok(id) => Some(id),
                    Err(_) => {
                        tracing::debug!(
                            key = %key,
                            member = %member,
                            "Skipping malformed like set member"
                        );
                        None
                    }
                })
                .collect();
            (!ids.is_empty()).then_some(ids)
        });
        self.lookup("smembers", &key, result)
    }

    pub async fn get_user_liked_posts(&self, user_id: i32) -> HashSet<i32> {
        self.lookup_user_liked_posts(user_id)
            .await
            .hit()
            .unwrap_or_default()
    }

    /// Make a user's like set hold exactly `post_ids`. Empty removes the set.
    pub async fn replace_user_likes(&self, user_id: i32, post_ids: &[i32]) -> bool {
        let key = keys::user_likes(user_id);
        let members: Vec<String> = post_ids.iter().map(ToString::to_string).collect();
        let result = self.transport.set_replace(&key, &members).await;
        self.ok_or_absorb("set_replace", &key, result).is_some()
    }

    /// Users with a like set in the cache, `None` when it cannot be listed.
    pub async fn users_with_like_sets(&self) -> Option<Vec<i32>> {
        let result = self.transport.scan_keys(keys::ALL_USER_LIKES_PATTERN).await;
        self.ok_or_absorb("scan", keys::ALL_USER_LIKES_PATTERN, result)
            .map(|found| {
                found
                    .iter()
                    .filter_map(|key| keys::user_likes_owner(key))
                    .collect()
            })
    }

    // ------------------------------------------------------------------------
    // Timeline snapshots
    // ------------------------------------------------------------------------

    pub async fn cache_timeline_page<T>(
        &self,
        user_id: i32,
        page: u32,
        rows: &T,
        ttl: Duration,
    ) -> bool
    where
        T: Serialize + Sync + ?Sized,
    {
        let key = keys::timeline_page(user_id, page);
        let payload = match serde_json::to_string(rows) {
            Ok(payload) => payload,
            Err(e) => {
                absorb("set", &key, &CacheError::from(e));
                return false;
            }
        };
        let result = self.transport.set(&key, &payload, Some(ttl)).await;
        self.ok_or_absorb("setex", &key, result).is_some()
    }

    /// A snapshot that fails to decode is reported as a transport error.
    pub async fn lookup_timeline_page<T: DeserializeOwned>(
        &self,
        user_id: i32,
        page: u32,
    ) -> CacheLookup<T> {
        let key = keys::timeline_page(user_id, page);
        let result = match self.transport.get(&key).await {
            Ok(Some(payload)) => serde_json::from_str(&payload)
                .map(Some)
                .map_err(CacheError::from),
            Ok(None) => Ok(None),
            Err(e) => Err(e),
        };
        self.lookup("get", &key, result)
    }

    pub async fn get_cached_timeline_page<T: DeserializeOwned>(
        &self,
        user_id: i32,
        page: u32,
    ) -> Option<T> {
        self.lookup_timeline_page(user_id, page).await.hit()
    }

    /// Drop every cached page of one user. Returns the number of pages removed.
    pub async fn invalidate_user_timeline_cache(&self, user_id: i32) -> u64 {
        let pattern = keys::user_timeline_pattern(user_id);
        let result = self.transport.delete_pattern(&pattern).await;
        self.ok_or_absorb("delete_pattern", &pattern, result)
            .unwrap_or(0)
    }

    pub async fn invalidate_all_timelines(&self) -> u64 {
        let result = self
            .transport
            .delete_pattern(keys::ALL_TIMELINES_PATTERN)
            .await;
        self.ok_or_absorb("delete_pattern", keys::ALL_TIMELINES_PATTERN, result)
            .unwrap_or(0)
    }

    // ------------------------------------------------------------------------
    // Sessions, blacklist and presence
    // ------------------------------------------------------------------------

    /// Store the canonical session token and track it in the active set.
    pub async fn set_session(&self, user_id: i32, token: &str, ttl: Duration) -> bool {
        let key = keys::session(user_id);
        let stored = self.transport.set(&key, token, Some(ttl)).await;
        if self.ok_or_absorb("setex", &key, stored).is_none() {
            return false;
        }

        let active = keys::active_sessions(user_id);
        let tracked = self.transport.set_add(&active, token).await;
        self.ok_or_absorb("sadd", &active, tracked).is_some()
    }

    pub async fn get_session(&self, user_id: i32) -> Option<String> {
        let key = keys::session(user_id);
        let result = self.transport.get(&key).await;
        self.lookup("get", &key, result).hit()
    }

    pub async fn delete_session(&self, user_id: i32, token: &str) -> bool {
        let key = keys::session(user_id);
        let deleted = self.transport.delete(&key).await;
        let deleted = self.ok_or_absorb("del", &key, deleted).is_some();

        let active = keys::active_sessions(user_id);
        let untracked = self.transport.set_remove(&active, token).await;
        let untracked = self.ok_or_absorb("srem", &active, untracked).is_some();

        deleted && untracked
    }

    pub async fn active_sessions(&self, user_id: i32) -> Vec<String> {
        let key = keys::active_sessions(user_id);
        let result = self.transport.set_members(&key).await;
        self.ok_or_absorb("smembers", &key, result)
            .unwrap_or_default()
    }

    pub async fn blacklist_token(&self, token: &str, ttl: Duration) -> bool {
        let key = keys::blacklist(token);
        let result = self.transport.set(&key, "1", Some(ttl)).await;
        self.ok_or_absorb("setex", &key, result).is_some()
    }

    pub async fn is_token_blacklisted(&self, token: &str) -> bool {
        let key = keys::blacklist(token);
        let result = self.transport.exists(&key).await;
        self.ok_or_absorb("exists", &key, result).unwrap_or(false)
    }

    pub async fn set_user_online(&self, user_id: i32, ttl: Duration) -> bool {
        let key = keys::user_online(user_id);
        let result = self.transport.set(&key, "1", Some(ttl)).await;
        self.ok_or_absorb("setex", &key, result).is_some()
    }

    pub async fn is_user_online(&self, user_id: i32) -> bool {
        let key = keys::user_online(user_id);
        let result = self.transport.exists(&key).await;
        self.ok_or_absorb("exists", &key, result).unwrap_or(false)
    }
}
