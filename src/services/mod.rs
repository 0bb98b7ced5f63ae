//! Service layer for business logic operations.
//!
//! Services coordinate the Store, the counter cache and the auth and blob
//! capabilities. Every collaborator is injected; nothing is reached through
//! global state.

mod post_service;
mod timeline_service;
mod user_service;

#[cfg(test)]
mod tests;

pub use post_service::{LikeToggle, PostService, PostView, ShareOutcome};
pub use timeline_service::{TimelinePage, TimelinePost, TimelineService};
pub use user_service::{LoginSession, ProfileUpdate, RegisterUser, UserService};

use std::sync::Arc;
use std::time::Duration;

use crate::auth::AuthProvider;
use crate::blob::{BlobStore, UploadPolicy};
use crate::cache::CounterCache;
use crate::config::Settings;
use crate::store::Store;

/// Aggregates all services for convenient access.
///
/// Cloning is cheap since every collaborator is shared through `Arc`.
#[derive(Clone)]
pub struct Services {
    pub users: UserService,
    pub posts: PostService,
    pub timeline: TimelineService,
}

impl Services {
    /// Wires the services from their collaborators and the loaded settings.
    pub fn new(
        store: Arc<dyn Store>,
        cache: CounterCache,
        auth: Arc<dyn AuthProvider>,
        blobs: Arc<dyn BlobStore>,
        settings: &Settings,
    ) -> Self {
        Self {
            users: UserService::new(
                store.clone(),
                cache.clone(),
                auth,
                Duration::from_secs(settings.cache.session_ttl_seconds),
                Duration::from_secs(settings.cache.online_ttl_seconds),
            ),
            posts: PostService::new(
                store.clone(),
                cache.clone(),
                blobs.clone(),
                UploadPolicy::from_config(&settings.uploads),
                settings.sharing.frontend_url.clone(),
            ),
            timeline: TimelineService::new(store, cache, blobs, settings.timeline.clone()),
        }
    }
}
