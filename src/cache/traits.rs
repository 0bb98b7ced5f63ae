//! CacheTransport trait definition.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;

use crate::cache::CacheError;

/// Raw key/value transport behind the counter cache.
///
/// Every method may fail with a `CacheError`; the fail-open layer in
/// `CounterCache` decides what an error means. Keys are unprefixed, each
/// transport applies its own namespace. Patterns use glob syntax (`*`, `?`).
#[async_trait]
pub trait CacheTransport: Send + Sync {
    /// Short backend name for logs and operator output.
    fn backend_name(&self) -> &'static str;

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Store a string, with expiration when `ttl` is set.
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), CacheError>;

    async fn delete(&self, key: &str) -> Result<(), CacheError>;

    async fn exists(&self, key: &str) -> Result<bool, CacheError>;

    /// Atomically add `delta` to a hash field and return the new value.
    async fn hash_incr(&self, key: &str, field: &str, delta: i64) -> Result<i64, CacheError>;

    /// Overwrite the given hash fields, leaving other fields untouched.
    async fn hash_set_all(&self, key: &str, fields: &[(&str, i64)]) -> Result<(), CacheError>;

    /// Set each hash field only where it is not present yet.
    async fn hash_set_if_absent(
        &self,
        key: &str,
        fields: &[(&str, i64)],
    ) -> Result<(), CacheError>;

    /// All fields of a hash; empty when the key does not exist.
    async fn hash_get_all(&self, key: &str) -> Result<HashMap<String, i64>, CacheError>;

    async fn set_add(&self, key: &str, member: &str) -> Result<(), CacheError>;

    async fn set_remove(&self, key: &str, member: &str) -> Result<(), CacheError>;

    async fn set_is_member(&self, key: &str, member: &str) -> Result<bool, CacheError>;

    /// All members of a set; empty when the key does not exist.
    async fn set_members(&self, key: &str) -> Result<Vec<String>, CacheError>;

    /// Atomically replace a set's members. An empty slice removes the key.
    async fn set_replace(&self, key: &str, members: &[String]) -> Result<(), CacheError>;

    /// Keys matching `pattern`, without the transport's namespace.
    async fn scan_keys(&self, pattern: &str) -> Result<Vec<String>, CacheError>;

    /// Delete every key matching `pattern` and return how many were removed.
    async fn delete_pattern(&self, pattern: &str) -> Result<u64, CacheError>;

    async fn count_keys(&self, pattern: &str) -> Result<u64, CacheError>;

    async fn ping(&self) -> Result<(), CacheError>;

    /// Remove everything in this transport's namespace.
    async fn clear(&self) -> Result<(), CacheError> {
        self.delete_pattern("*").await.map(|_| ())
    }

    /// Release resources. Later calls fail with `CacheError::NotInitialized`.
    async fn close(&self) -> Result<(), CacheError> {
        Ok(())
    }
}
