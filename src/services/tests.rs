//! End-to-end service scenarios against `MemoryStore` and the in-memory cache.

use std::sync::Arc;
use std::time::Duration;

use proptest::prelude::*;
use tempfile::TempDir;

use super::*;
use crate::auth::test_provider;
use crate::blob::{ImageUpload, LocalBlobStore};
use crate::cache::testing::{FailingTransport, JitterTransport};
use crate::cache::{CacheTransport, CounterCache, MemoryTransport, PostCounts};
use crate::config::{MemoryCacheConfig, Settings};
use crate::error::AppError;
use crate::jobs::ReconciliationJob;
use crate::models::{NewPost, NewUser};
use crate::store::{MemoryStore, Store};

struct Harness {
    store: Arc<MemoryStore>,
    cache: CounterCache,
    services: Services,
    uploads: TempDir,
}

impl Harness {
    fn with_transport(transport: Arc<dyn CacheTransport>) -> Self {
        let uploads = TempDir::new().unwrap();
        let store = Arc::new(MemoryStore::new());
        let cache = CounterCache::new(transport);
        let blobs = Arc::new(LocalBlobStore::new(uploads.path(), "/uploads"));
        let services = Services::new(
            store.clone(),
            cache.clone(),
            Arc::new(test_provider()),
            blobs,
            &Settings::default(),
        );
        Self {
            store,
            cache,
            services,
            uploads,
        }
    }

    fn new() -> Self {
        Self::with_transport(Arc::new(MemoryTransport::new(&MemoryCacheConfig::default())))
    }

    fn failing() -> Self {
        Self::with_transport(Arc::new(FailingTransport))
    }

    async fn user(&self, username: &str) -> i32 {
        self.store
            .insert_user(NewUser {
                username: username.to_string(),
                email: format!("{}@example.com", username),
                password: "unused".to_string(),
            })
            .await
            .unwrap()
            .id
    }

    async fn post(&self, user_id: i32) -> i32 {
        self.store
            .insert_post(NewPost {
                user_id,
                image_path: format!("{}.jpg", uuid::Uuid::new_v4()),
                caption: Some("sunset".to_string()),
            })
            .await
            .unwrap()
            .id
    }

    async fn store_likes(&self, post_id: i32) -> i32 {
        self.store.get_post(post_id).await.unwrap().unwrap().likes_count
    }
}

// ----------------------------------------------------------------------------
// Toggle protocol
// ----------------------------------------------------------------------------

#[tokio::test]
async fn test_like_then_unlike_from_empty_state() {
    let h = Harness::new();
    let author = h.user("author").await;
    let post = h.post(author).await;

    let first = h.services.posts.toggle_like(author, post).await.unwrap();
    assert!(first.liked);
    assert_eq!(first.likes_count, 1);
    assert_eq!(h.store_likes(post).await, 1);
    assert_eq!(h.cache.get_counts(post).await.likes, 1);
    assert!(h.cache.has_user_liked(author, post).await);

    let second = h.services.posts.toggle_like(author, post).await.unwrap();
    assert!(!second.liked);
    assert_eq!(second.likes_count, 0);
    assert_eq!(h.store_likes(post).await, 0);
    assert_eq!(h.cache.get_counts(post).await.likes, 0);
    assert!(!h.cache.has_user_liked(author, post).await);
}

#[tokio::test]
async fn test_double_toggle_leaves_counts_unchanged() {
    let h = Harness::new();
    let author = h.user("author").await;
    let viewer = h.user("viewer").await;
    let post = h.post(author).await;
    h.store.set_post_counters(post, 5, 2).await.unwrap();

    h.services.posts.toggle_like(viewer, post).await.unwrap();
    let back = h.services.posts.toggle_like(viewer, post).await.unwrap();

    assert!(!back.liked);
    assert_eq!(back.likes_count, 5);
    assert_eq!(h.store_likes(post).await, 5);
    assert_eq!(h.cache.get_counts(post).await, PostCounts::new(5, 2));
}

#[tokio::test]
async fn test_toggle_seeds_counter_from_store() {
    let h = Harness::new();
    let author = h.user("author").await;
    let post = h.post(author).await;
    h.store.set_post_counters(post, 7, 0).await.unwrap();

    let outcome = h.services.posts.toggle_like(author, post).await.unwrap();

    assert_eq!(outcome.likes_count, 8);
    assert_eq!(h.cache.get_counts(post).await.likes, 8);
}

#[tokio::test]
async fn test_toggle_after_cache_loss_reads_membership_from_store() {
    let h = Harness::new();
    let author = h.user("author").await;
    let post = h.post(author).await;

    h.services.posts.toggle_like(author, post).await.unwrap();
    h.cache.transport().clear().await.unwrap();

    // No like set cached, so the Store edge says the post is liked
    let outcome = h.services.posts.toggle_like(author, post).await.unwrap();
    assert!(!outcome.liked);
    assert_eq!(outcome.likes_count, 0);
    assert_eq!(h.store_likes(post).await, 0);
    assert_eq!(h.cache.get_counts(post).await.likes, 0);
    assert_eq!(h.store.like_edge_count(author, post).await, 0);
}

#[tokio::test]
async fn test_toggle_with_stale_like_set_writes_back_store_count() {
    let h = Harness::new();
    let author = h.user("author").await;
    let viewer = h.user("viewer").await;
    let post = h.post(author).await;

    h.services.posts.toggle_like(author, post).await.unwrap();
    // The set exists but no longer holds the post
    h.cache.remove_user_like(author, post).await;
    h.cache.add_user_like(author, 999).await;
    h.services.posts.toggle_like(viewer, post).await.unwrap();

    // Cache says "not liked"; the Store insert is a no-op and the counter
    // is written back from the Store.
    let outcome = h.services.posts.toggle_like(author, post).await.unwrap();
    assert!(outcome.liked);
    assert_eq!(outcome.likes_count, 2);
    assert_eq!(h.store_likes(post).await, 2);
    assert_eq!(h.cache.get_counts(post).await.likes, 2);
    assert_eq!(h.store.like_edge_count(author, post).await, 1);
}

#[tokio::test]
async fn test_toggle_missing_post_is_not_found() {
    let h = Harness::new();
    let user = h.user("someone").await;

    let err = h.services.posts.toggle_like(user, 404).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound { .. }));
}

#[tokio::test]
async fn test_toggle_with_cache_down_uses_store() {
    let h = Harness::failing();
    let author = h.user("author").await;
    let post = h.post(author).await;

    let liked = h.services.posts.toggle_like(author, post).await.unwrap();
    assert!(liked.liked);
    assert_eq!(liked.likes_count, 1);

    let unliked = h.services.posts.toggle_like(author, post).await.unwrap();
    assert!(!unliked.liked);
    assert_eq!(unliked.likes_count, 0);
    assert_eq!(h.store_likes(post).await, 0);
}

#[tokio::test]
async fn test_store_failure_after_cache_update_is_reported() {
    let h = Harness::new();
    let author = h.user("author").await;
    let post = h.post(author).await;
    h.store.set_fail_writes(true);

    let err = h.services.posts.toggle_like(author, post).await.unwrap_err();
    assert!(matches!(err, AppError::Database { .. }));

    // The cache already moved; the Store did not.
    assert!(h.cache.has_user_liked(author, post).await);
    assert_eq!(h.cache.get_counts(post).await.likes, 1);
    assert_eq!(h.store_likes(post).await, 0);

    h.store.set_fail_writes(false);
    ReconciliationJob::new(h.store.clone(), h.cache.clone())
        .run()
        .await
        .unwrap();

    assert!(!h.cache.has_user_liked(author, post).await);
    assert_eq!(h.cache.get_counts(post).await.likes, 0);
    let page = h.services.timeline.get_timeline(author, 0, None).await.unwrap();
    assert!(!page.posts[0].is_liked);
    assert_eq!(page.posts[0].post.likes_count, 0);

    let retried = h.services.posts.toggle_like(author, post).await.unwrap();
    assert!(retried.liked);
    assert_eq!(retried.likes_count, 1);
}

// ----------------------------------------------------------------------------
// Concurrent toggles
// ----------------------------------------------------------------------------

async fn users(h: &Harness, count: usize) -> Vec<i32> {
    let mut ids = Vec::with_capacity(count);
    for i in 0..count {
        ids.push(h.user(&format!("fan{}", i)).await);
    }
    ids
}

#[tokio::test]
async fn test_concurrent_first_likes_are_all_counted() {
    for max_yields in 0..6 {
        let h = Harness::with_transport(Arc::new(JitterTransport::new(max_yields)));
        let author = h.user("author").await;
        let post = h.post(author).await;
        h.store.set_post_counters(post, 3, 0).await.unwrap();
        let fans = users(&h, 8).await;

        let results = futures::future::join_all(
            fans.iter().map(|fan| h.services.posts.toggle_like(*fan, post)),
        )
        .await;

        for result in results {
            assert!(result.unwrap().liked);
        }
        assert_eq!(h.store_likes(post).await, 11, "yields {}", max_yields);
        assert_eq!(h.cache.get_counts(post).await.likes, 11, "yields {}", max_yields);
        for fan in &fans {
            assert!(h.cache.has_user_liked(*fan, post).await);
        }

        let results = futures::future::join_all(
            fans.iter().map(|fan| h.services.posts.toggle_like(*fan, post)),
        )
        .await;

        for result in results {
            assert!(!result.unwrap().liked);
        }
        assert_eq!(h.store_likes(post).await, 3, "yields {}", max_yields);
        assert_eq!(h.cache.get_counts(post).await.likes, 3, "yields {}", max_yields);
    }
}

#[tokio::test]
async fn test_concurrent_first_shares_are_all_counted() {
    for max_yields in 0..4 {
        let h = Harness::with_transport(Arc::new(JitterTransport::new(max_yields)));
        let author = h.user("author").await;
        let post = h.post(author).await;
        let fans = users(&h, 5).await;

        let results = futures::future::join_all(
            fans.iter().map(|fan| h.services.posts.share_post(*fan, post)),
        )
        .await;

        for result in results {
            result.unwrap();
        }
        let stored = h.store.get_post(post).await.unwrap().unwrap().shares_count;
        assert_eq!(stored, 5);
        assert_eq!(h.cache.get_counts(post).await.shares, 5, "yields {}", max_yields);
    }
}

#[tokio::test]
async fn test_racing_toggles_by_one_user_stay_repairable() {
    let h = Harness::with_transport(Arc::new(JitterTransport::new(3)));
    let author = h.user("author").await;
    let post = h.post(author).await;

    let (first, second) = tokio::join!(
        h.services.posts.toggle_like(author, post),
        h.services.posts.toggle_like(author, post),
    );
    first.unwrap();
    second.unwrap();

    let edges = h.store.like_edge_count(author, post).await;
    assert!(edges <= 1);
    assert_eq!(h.store_likes(post).await as usize, edges);
    assert!(h.cache.get_counts(post).await.likes >= 0);

    ReconciliationJob::new(h.store.clone(), h.cache.clone())
        .run()
        .await
        .unwrap();
    assert_eq!(h.cache.get_counts(post).await.likes as usize, edges);
    assert_eq!(h.cache.has_user_liked(author, post).await, edges == 1);
}

// ----------------------------------------------------------------------------
// Timeline assembly
// ----------------------------------------------------------------------------

#[tokio::test]
async fn test_timeline_falls_back_to_store_counters() {
    let h = Harness::new();
    let author = h.user("author").await;
    let post = h.post(author).await;
    h.store.set_post_counters(post, 4, 3).await.unwrap();

    let page = h.services.timeline.get_timeline(author, 0, None).await.unwrap();

    assert_eq!(page.total, 1);
    assert_eq!(page.posts[0].post.likes_count, 4);
    assert_eq!(page.posts[0].post.shares_count, 3);
    assert_eq!(page.posts[0].post.username, "author");
}

#[tokio::test]
async fn test_timeline_prefers_cached_counters() {
    let h = Harness::new();
    let author = h.user("author").await;
    let post = h.post(author).await;
    h.store.set_post_counters(post, 1, 1).await.unwrap();
    h.cache.set_counts(post, 9, 2).await;

    let page = h.services.timeline.get_timeline(author, 0, None).await.unwrap();

    assert_eq!(page.posts[0].post.likes_count, 9);
    assert_eq!(page.posts[0].post.shares_count, 2);
}

#[tokio::test]
async fn test_timeline_orders_and_pages() {
    let h = Harness::new();
    let author = h.user("author").await;
    let first = h.post(author).await;
    let second = h.post(author).await;
    let third = h.post(author).await;

    let page0 = h.services.timeline.get_timeline(author, 0, Some(2)).await.unwrap();
    let page1 = h.services.timeline.get_timeline(author, 1, Some(2)).await.unwrap();

    let ids: Vec<i32> = page0.posts.iter().map(|p| p.post.id).collect();
    assert_eq!(ids, vec![third, second]);
    assert_eq!(page1.posts.len(), 1);
    assert_eq!(page1.posts[0].post.id, first);
    assert_eq!(page0.total, 3);
    assert_eq!(page0.per_page, 2);
}

#[tokio::test]
async fn test_timeline_clamps_page_size() {
    let h = Harness::new();
    assert_eq!(h.services.timeline.effective_per_page(None), 20);
    assert_eq!(h.services.timeline.effective_per_page(Some(0)), 1);
    assert_eq!(h.services.timeline.effective_per_page(Some(1000)), 100);
}

#[tokio::test]
async fn test_timeline_snapshot_served_until_invalidated() {
    let h = Harness::new();
    let author = h.user("author").await;
    let post = h.post(author).await;

    let before = h.services.timeline.get_timeline(author, 0, None).await.unwrap();
    assert_eq!(before.posts[0].post.likes_count, 0);

    h.cache.set_counts(post, 50, 0).await;
    let cached = h.services.timeline.get_timeline(author, 0, None).await.unwrap();
    assert_eq!(cached.posts[0].post.likes_count, 0);

    assert_eq!(h.cache.invalidate_user_timeline_cache(author).await, 1);
    let fresh = h.services.timeline.get_timeline(author, 0, None).await.unwrap();
    assert_eq!(fresh.posts[0].post.likes_count, 50);
}

#[tokio::test]
async fn test_snapshot_for_other_page_size_is_rebuilt() {
    let h = Harness::new();
    let author = h.user("author").await;
    h.post(author).await;
    h.post(author).await;

    let small = h.services.timeline.get_timeline(author, 0, Some(1)).await.unwrap();
    let large = h.services.timeline.get_timeline(author, 0, Some(10)).await.unwrap();

    assert_eq!(small.posts.len(), 1);
    assert_eq!(large.posts.len(), 2);
}

#[tokio::test]
async fn test_invalidated_page_is_absent() {
    let h = Harness::new();
    let rows = vec!["row".to_string()];

    assert!(h.cache.cache_timeline_page(1, 1, &rows, Duration::from_secs(300)).await);
    h.cache.invalidate_user_timeline_cache(1).await;

    let page: Option<Vec<String>> = h.cache.get_cached_timeline_page(1, 1).await;
    assert!(page.is_none());
}

#[tokio::test]
async fn test_toggle_refreshes_own_timeline() {
    let h = Harness::new();
    let author = h.user("author").await;
    let post = h.post(author).await;

    let before = h.services.timeline.get_timeline(author, 0, None).await.unwrap();
    assert!(!before.posts[0].is_liked);

    h.services.posts.toggle_like(author, post).await.unwrap();

    let after = h.services.timeline.get_timeline(author, 0, None).await.unwrap();
    assert!(after.posts[0].is_liked);
    assert_eq!(after.posts[0].post.likes_count, 1);
}

#[tokio::test]
async fn test_empty_like_set_reads_as_not_liked() {
    let h = Harness::new();
    let author = h.user("author").await;
    let post = h.post(author).await;
    h.store.insert_like_edge(author, post).await.unwrap();

    let page = h.services.timeline.get_timeline(author, 0, None).await.unwrap();

    assert!(!page.posts[0].is_liked);
    assert_eq!(page.posts[0].post.likes_count, 1);
}

#[tokio::test]
async fn test_timeline_with_cache_down_uses_store() {
    let h = Harness::failing();
    let author = h.user("author").await;
    let post = h.post(author).await;
    h.services.posts.toggle_like(author, post).await.unwrap();

    let page = h.services.timeline.get_timeline(author, 0, None).await.unwrap();

    assert!(page.posts[0].is_liked);
    assert_eq!(page.posts[0].post.likes_count, 1);
}

// ----------------------------------------------------------------------------
// Posts
// ----------------------------------------------------------------------------

#[tokio::test]
async fn test_create_post_stores_blob() {
    let h = Harness::new();
    let author = h.user("author").await;
    let upload = ImageUpload::new("beach.PNG", "image/png", vec![0x89, 0x50, 0x4e, 0x47]);

    let post = h
        .services
        .posts
        .create_post(author, &upload, Some("beach".to_string()))
        .await
        .unwrap();

    assert!(post.image_path.ends_with(".png"));
    assert!(h.uploads.path().join(&post.image_path).exists());

    let view = h.services.posts.get_post(post.id).await.unwrap();
    assert_eq!(view.image_url, format!("/uploads/{}", post.image_path));
    assert_eq!(view.caption.as_deref(), Some("beach"));
}

#[tokio::test]
async fn test_create_post_rejects_non_image() {
    let h = Harness::new();
    let author = h.user("author").await;
    let upload = ImageUpload::new("notes.txt", "text/plain", b"hello".to_vec());

    let err = h
        .services
        .posts
        .create_post(author, &upload, None)
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Validation { ref field, .. } if field == "file"));
    assert_eq!(h.store.count_posts().await.unwrap(), 0);
}

#[tokio::test]
async fn test_only_owner_can_edit_or_delete() {
    let h = Harness::new();
    let author = h.user("author").await;
    let other = h.user("other").await;
    let post = h.post(author).await;

    let err = h
        .services
        .posts
        .update_caption(other, post, Some("mine now".to_string()))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound { .. }));

    let err = h.services.posts.delete_post(other, post).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound { .. }));

    let updated = h
        .services
        .posts
        .update_caption(author, post, Some("golden hour".to_string()))
        .await
        .unwrap();
    assert_eq!(updated.caption.as_deref(), Some("golden hour"));
}

#[tokio::test]
async fn test_delete_post_drops_counter_and_edges() {
    let h = Harness::new();
    let author = h.user("author").await;
    let post = h.post(author).await;
    h.services.posts.toggle_like(author, post).await.unwrap();

    h.services.posts.delete_post(author, post).await.unwrap();

    assert!(h.store.get_post(post).await.unwrap().is_none());
    assert_eq!(h.store.like_edge_count(author, post).await, 0);
    assert!(h.cache.lookup_counter(post).await.is_miss());
}

#[tokio::test]
async fn test_share_counts_and_link() {
    let h = Harness::new();
    let author = h.user("author").await;
    let viewer = h.user("viewer").await;
    let post = h.post(author).await;

    let first = h.services.posts.share_post(viewer, post).await.unwrap();
    let second = h.services.posts.share_post(viewer, post).await.unwrap();

    assert_eq!(first.shares_count, 1);
    assert_eq!(second.shares_count, 2);
    assert_eq!(second.share_url, format!("http://localhost:5173/post/{}", post));
    assert_eq!(h.cache.get_counts(post).await.shares, 2);
    let stored = h.store.get_post(post).await.unwrap().unwrap();
    assert_eq!(stored.shares_count, 2);
}

#[tokio::test]
async fn test_share_with_cache_down_uses_store() {
    let h = Harness::failing();
    let author = h.user("author").await;
    let post = h.post(author).await;

    let outcome = h.services.posts.share_post(author, post).await.unwrap();
    assert_eq!(outcome.shares_count, 1);
}

// ----------------------------------------------------------------------------
// Users and sessions
// ----------------------------------------------------------------------------

fn registration(username: &str) -> RegisterUser {
    RegisterUser {
        username: username.to_string(),
        email: format!("{}@example.com", username),
        password: "secret123".to_string(),
    }
}

#[tokio::test]
async fn test_register_validates_input() {
    let h = Harness::new();
    let mut input = registration("al");
    input.password = "123".to_string();

    let err = h.services.users.register(input).await.unwrap_err();
    assert!(matches!(err, AppError::Validation { .. }));
}

#[tokio::test]
async fn test_register_rejects_duplicate_username() {
    let h = Harness::new();
    h.services.users.register(registration("alice")).await.unwrap();

    let mut again = registration("alice");
    again.email = "other@example.com".to_string();
    let err = h.services.users.register(again).await.unwrap_err();
    assert!(matches!(err, AppError::Duplicate { ref field, .. } if field == "username"));
}

#[tokio::test]
async fn test_login_records_session_and_presence() {
    let h = Harness::new();
    let user = h.services.users.register(registration("alice")).await.unwrap();
    assert_ne!(user.password, "secret123");

    let session = h.services.users.login("alice", "secret123").await.unwrap();

    assert_eq!(session.user.id, user.id);
    assert_eq!(h.cache.get_session(user.id).await, Some(session.token.token.clone()));
    assert!(h.services.users.is_online(user.id).await);

    let resolved = h
        .services
        .users
        .authenticate_token(&session.token.token)
        .await
        .unwrap();
    assert_eq!(resolved.id, user.id);
}

#[tokio::test]
async fn test_login_rejects_wrong_password() {
    let h = Harness::new();
    h.services.users.register(registration("alice")).await.unwrap();

    let err = h.services.users.login("alice", "wrong-password").await.unwrap_err();
    assert!(matches!(err, AppError::Unauthorized { .. }));
    assert!(h.services.users.authenticate("nobody", "x").await.unwrap().is_none());
}

#[tokio::test]
async fn test_logout_revokes_token() {
    let h = Harness::new();
    let user = h.services.users.register(registration("alice")).await.unwrap();
    let session = h.services.users.login("alice", "secret123").await.unwrap();

    h.services.users.logout(&session.token.token).await.unwrap();

    assert!(h.cache.is_token_blacklisted(&session.token.token).await);
    assert!(h.cache.get_session(user.id).await.is_none());
    let err = h
        .services
        .users
        .authenticate_token(&session.token.token)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Unauthorized { .. }));
}

#[test]
fn test_revocation_outlives_last_accepted_second() {
    assert_eq!(user_service::revocation_ttl(Duration::ZERO), Duration::from_secs(1));
    assert_eq!(user_service::revocation_ttl(Duration::from_secs(30)), Duration::from_secs(31));
}

#[tokio::test]
async fn test_login_works_with_cache_down() {
    let h = Harness::failing();
    h.services.users.register(registration("alice")).await.unwrap();

    let session = h.services.users.login("alice", "secret123").await.unwrap();
    assert!(
        h.services
            .users
            .authenticate_token(&session.token.token)
            .await
            .is_ok()
    );
}

#[tokio::test]
async fn test_update_profile() {
    let h = Harness::new();
    let user = h.services.users.register(registration("alice")).await.unwrap();

    let updated = h
        .services
        .users
        .update_profile(
            user.id,
            ProfileUpdate {
                email: Some("alice@photos.example".to_string()),
                password: Some("another-secret".to_string()),
                ..ProfileUpdate::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.email, "alice@photos.example");
    assert!(h.services.users.login("alice", "another-secret").await.is_ok());

    let err = h
        .services
        .users
        .update_profile(
            user.id,
            ProfileUpdate {
                email: Some("not-an-email".to_string()),
                ..ProfileUpdate::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation { .. }));
}

#[tokio::test]
async fn test_get_user_by_username_not_found() {
    let h = Harness::new();
    let err = h.services.users.get_user_by_username("ghost").await.unwrap_err();
    assert!(matches!(err, AppError::NotFound { .. }));
}

// ----------------------------------------------------------------------------
// Counter floor
// ----------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum Step {
    Toggle(usize),
    LoseCache,
}

fn arb_step() -> impl Strategy<Value = Step> {
    prop_oneof![
        8 => (0usize..4).prop_map(Step::Toggle),
        1 => Just(Step::LoseCache),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_toggles_never_go_negative(steps in proptest::collection::vec(arb_step(), 1..40)) {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();

        rt.block_on(async {
            let h = Harness::new();
            let author = h.user("author").await;
            let post = h.post(author).await;
            let mut users = Vec::new();
            for i in 0..4 {
                users.push(h.user(&format!("user{}", i)).await);
            }

            for step in steps {
                match step {
                    Step::Toggle(i) => {
                        let outcome = h.services.posts.toggle_like(users[i], post).await.unwrap();
                        let store_likes = i64::from(h.store_likes(post).await);

                        assert!(outcome.likes_count >= 0);
                        assert!(store_likes >= 0);
                        assert_eq!(h.cache.get_counts(post).await.likes, store_likes);
                    }
                    Step::LoseCache => {
                        h.cache.transport().clear().await.unwrap();
                    }
                }
            }

            let mut edges = 0;
            for user in &users {
                edges += h.store.like_edge_count(*user, post).await;
            }
            assert_eq!(h.store_likes(post).await as usize, edges);
        });
    }
}
