//! Transport doubles for fail-open and concurrency tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::cache::{CacheError, CacheTransport, MemoryTransport};
use crate::config::settings::MemoryCacheConfig;

fn refused() -> CacheError {
    CacheError::Connection("connection refused".to_string())
}

#[derive(Debug, Default)]
pub struct FailingTransport;

#[async_trait]
impl CacheTransport for FailingTransport {
    fn backend_name(&self) -> &'static str {
        "failing"
    }

    async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
        Err(refused())
    }

    async fn set(
        &self,
        _key: &str,
        _value: &str,
        _ttl: Option<Duration>,
    ) -> Result<(), CacheError> {
        Err(refused())
    }

    async fn delete(&self, _key: &str) -> Result<(), CacheError> {
        Err(refused())
    }

    async fn exists(&self, _key: &str) -> Result<bool, CacheError> {
        Err(refused())
    }

    async fn hash_incr(&self, _key: &str, _field: &str, _delta: i64) -> Result<i64, CacheError> {
        Err(refused())
    }

    async fn hash_set_all(&self, _key: &str, _fields: &[(&str, i64)]) -> Result<(), CacheError> {
        Err(refused())
    }

    async fn hash_set_if_absent(
        &self,
        _key: &str,
        _fields: &[(&str, i64)],
    ) -> Result<(), CacheError> {
        Err(refused())
    }

    async fn hash_get_all(&self, _key: &str) -> Result<HashMap<String, i64>, CacheError> {
        Err(refused())
    }

    async fn set_add(&self, _key: &str, _member: &str) -> Result<(), CacheError> {
        Err(refused())
    }

    async fn set_remove(&self, _key: &str, _member: &str) -> Result<(), CacheError> {
        Err(refused())
    }

    async fn set_is_member(&self, _key: &str, _member: &str) -> Result<bool, CacheError> {
        Err(refused())
    }

    async fn set_members(&self, _key: &str) -> Result<Vec<String>, CacheError> {
        Err(refused())
    }

    async fn set_replace(&self, _key: &str, _members: &[String]) -> Result<(), CacheError> {
        Err(refused())
    }

    async fn scan_keys(&self, _pattern: &str) -> Result<Vec<String>, CacheError> {
        Err(refused())
    }

    async fn delete_pattern(&self, _pattern: &str) -> Result<u64, CacheError> {
        Err(refused())
    }

    async fn count_keys(&self, _pattern: &str) -> Result<u64, CacheError> {
        Err(refused())
    }

    async fn ping(&self) -> Result<(), CacheError> {
        Err(refused())
    }
}

/// Memory transport that yields to the scheduler before every call.
///
/// The number of yields cycles through `0..=max_yields`, so callers running
/// concurrently interleave the way network round trips do.
pub struct JitterTransport {
    inner: MemoryTransport,
    max_yields: usize,
    calls: AtomicUsize,
}

impl JitterTransport {
    pub fn new(max_yields: usize) -> Self {
        Self {
            inner: MemoryTransport::new(&MemoryCacheConfig::default()),
            max_yields,
            calls: AtomicUsize::new(0),
        }
    }

    async fn jitter(&self) {
        let yields = self.calls.fetch_add(1, Ordering::Relaxed) % (self.max_yields + 1);
        for _ in 0..yields {
            tokio::task::yield_now().await;
        }
    }
}

#[async_trait]
impl CacheTransport for JitterTransport {
    fn backend_name(&self) -> &'static str {
        "jitter"
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        self.jitter().await;
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), CacheError> {
        self.jitter().await;
        self.inner.set(key, value, ttl).await
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.jitter().await;
        self.inner.delete(key).await
    }

    async fn exists(&self, key: &str) -> Result<bool, CacheError> {
        self.jitter().await;
        self.inner.exists(key).await
    }

    async fn hash_incr(&self, key: &str, field: &str, delta: i64) -> Result<i64, CacheError> {
        self.jitter().await;
        self.inner.hash_incr(key, field, delta).await
    }

    async fn hash_set_all(&self, key: &str, fields: &[(&str, i64)]) -> Result<(), CacheError> {
        self.jitter().await;
        self.inner.hash_set_all(key, fields).await
    }

    async fn hash_set_if_absent(
        &self,
        key: &str,
        fields: &[(&str, i64)],
    ) -> Result<(), CacheError> {
        self.jitter().await;
        self.inner.hash_set_if_absent(key, fields).await
    }

    async fn hash_get_all(&self, key: &str) -> Result<HashMap<String, i64>, CacheError> {
        self.jitter().await;
        self.inner.hash_get_all(key).await
    }

    async fn set_add(&self, key: &str, member: &str) -> Result<(), CacheError> {
        self.jitter().await;
        self.inner.set_add(key, member).await
    }

    async fn set_remove(&self, key: &str, member: &str) -> Result<(), CacheError> {
        self.jitter().await;
        self.inner.set_remove(key, member).await
    }

    async fn set_is_member(&self, key: &str, member: &str) -> Result<bool, CacheError> {
        self.jitter().await;
        self.inner.set_is_member(key, member).await
    }

    async fn set_members(&self, key: &str) -> Result<Vec<String>, CacheError> {
        self.jitter().await;
        self.inner.set_members(key).await
    }

    async fn set_replace(&self, key: &str, members: &[String]) -> Result<(), CacheError> {
        self.jitter().await;
        self.inner.set_replace(key, members).await
    }

    async fn scan_keys(&self, pattern: &str) -> Result<Vec<String>, CacheError> {
        self.jitter().await;
        self.inner.scan_keys(pattern).await
    }

    async fn delete_pattern(&self, pattern: &str) -> Result<u64, CacheError> {
        self.jitter().await;
        self.inner.delete_pattern(pattern).await
    }

    async fn count_keys(&self, pattern: &str) -> Result<u64, CacheError> {
        self.jitter().await;
        self.inner.count_keys(pattern).await
    }

    async fn ping(&self) -> Result<(), CacheError> {
        self.inner.ping().await
    }
}
