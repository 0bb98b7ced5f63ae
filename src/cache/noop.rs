//! NoOp cache transport.
//!
//! Used when caching is disabled. Every call reports `NotInitialized`, so the
//! fail-open layer treats a disabled cache exactly like an unreachable one and
//! the Store answers everything.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;

use crate::cache::{CacheError, CacheTransport};

/// A transport that doesn't store anything.
///
/// Used when `cache.enabled = false` in configuration.
#[derive(Debug, Default)]
pub struct NoOpTransport;

impl NoOpTransport {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CacheTransport for NoOpTransport {
    fn backend_name(&self) -> &'static str {
        "noop"
    }

    async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
        Err(CacheError::NotInitialized)
    }

    async fn set(
        &self,
        _key: &str,
        _value: &str,
        _ttl: Option<Duration>,
    ) -> Result<(), CacheError> {
        Err(CacheError::NotInitialized)
    }

    async fn delete(&self, _key: &str) -> Result<(), CacheError> {
        Err(CacheError::NotInitialized)
    }

    async fn exists(&self, _key: &str) -> Result<bool, CacheError> {
        Err(CacheError::NotInitialized)
    }

    async fn hash_incr(&self, _key: &str, _field: &str, _delta: i64) -> Result<i64, CacheError> {
        Err(CacheError::NotInitialized)
    }

    async fn hash_set_all(&self, _key: &str, _fields: &[(&str, i64)]) -> Result<(), CacheError> {
        Err(CacheError::NotInitialized)
    }

    async fn hash_set_if_absent(
        &self,
        _key: &str,
        _fields: &[(&str, i64)],
    ) -> Result<(), CacheError> {
        Err(CacheError::NotInitialized)
    }

    async fn hash_get_all(&self, _key: &str) -> Result<HashMap<String, i64>, CacheError> {
        Err(CacheError::NotInitialized)
    }

    async fn set_add(&self, _key: &str, _member: &str) -> Result<(), CacheError> {
        Err(CacheError::NotInitialized)
    }

    async fn set_remove(&self, _key: &str, _member: &str) -> Result<(), CacheError> {
        Err(CacheError::NotInitialized)
    }

    async fn set_is_member(&self, _key: &str, _member: &str) -> Result<bool, CacheError> {
        Err(CacheError::NotInitialized)
    }

    async fn set_members(&self, _key: &str) -> Result<Vec<String>, CacheError> {
        Err(CacheError::NotInitialized)
    }

    async fn set_replace(&self, _key: &str, _members: &[String]) -> Result<(), CacheError> {
        Err(CacheError::NotInitialized)
    }

    async fn scan_keys(&self, _pattern: &str) -> Result<Vec<String>, CacheError> {
        Err(CacheError::NotInitialized)
    }

    async fn delete_pattern(&self, _pattern: &str) -> Result<u64, CacheError> {
        Err(CacheError::NotInitialized)
    }

    async fn count_keys(&self, _pattern: &str) -> Result<u64, CacheError> {
        Err(CacheError::NotInitialized)
    }

    async fn ping(&self) -> Result<(), CacheError> {
        Err(CacheError::NotInitialized)
    }
}
