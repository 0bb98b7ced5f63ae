//! Redis cache transport using a bb8 connection pool.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bb8::{Pool, PooledConnection};
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client, RedisError};

use crate::cache::{CacheError, CacheTransport};
use crate::config::settings::RedisCacheConfig;

type RedisPool = Pool<Client>;

fn op_err(e: RedisError) -> CacheError {
    CacheError::Operation(e.to_string())
}

/// Redis-backed transport with bb8 connection pool.
///
/// The pool is built lazily so an unreachable server at startup only
/// degrades the cache instead of aborting the process.
pub struct RedisTransport {
    pool: RedisPool,
    key_prefix: String,
    closed: AtomicBool,
}

impl RedisTransport {
    pub fn new(config: &RedisCacheConfig) -> Result<Self, CacheError> {
        let client =
            Client::open(config.url.as_str()).map_err(|e| CacheError::Connection(e.to_string()))?;

        let pool = Pool::builder()
            .max_size(config.pool_size)
            .connection_timeout(Duration::from_secs(config.connection_timeout))
            .build_unchecked(client);

        Ok(Self {
            pool,
            key_prefix: config.key_prefix.clone(),
            closed: AtomicBool::new(false),
        })
    }

    fn prefixed_key(&self, key: &str) -> String {
        format!("{}:{}", self.key_prefix, key)
    }

    fn strip_prefix<'a>(&self, key: &'a str) -> &'a str {
        key.strip_prefix(&self.key_prefix)
            .and_then(|rest| rest.strip_prefix(':'))
            .unwrap_or(key)
    }

    async fn get_conn(&self) -> Result<PooledConnection<'_, Client>, CacheError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(CacheError::NotInitialized);
        }
        self.pool
            .get()
            .await
            .map_err(|e| CacheError::Connection(e.to_string()))
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>, CacheError> {
        let mut conn: PooledConnection<'_, Client> = self.get_conn().await?;
        let conn_ref: &mut MultiplexedConnection = &mut conn;
        redis::cmd("KEYS")
            .arg(self.prefixed_key(pattern))
            .query_async(conn_ref)
            .await
            .map_err(op_err)
    }
}

#[async_trait]
impl CacheTransport for RedisTransport {
    fn backend_name(&self) -> &'static str {
        "redis"
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn: PooledConnection<'_, Client> = self.get_conn().await?;
        let conn_ref: &mut MultiplexedConnection = &mut conn;
        conn_ref.get(self.prefixed_key(key)).await.map_err(op_err)
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), CacheError> {
        let mut conn: PooledConnection<'_, Client> = self.get_conn().await?;
        let prefixed = self.prefixed_key(key);

        let conn_ref: &mut MultiplexedConnection = &mut conn;
        match ttl {
            // SETEX rejects zero, round sub-second TTLs up
            Some(ttl) => conn_ref
                .set_ex::<_, _, ()>(&prefixed, value, ttl.as_secs().max(1))
                .await
                .map_err(op_err),
            None => conn_ref
                .set::<_, _, ()>(&prefixed, value)
                .await
                .map_err(op_err),
        }
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut conn: PooledConnection<'_, Client> = self.get_conn().await?;
        let conn_ref: &mut MultiplexedConnection = &mut conn;
        conn_ref
            .del::<_, ()>(self.prefixed_key(key))
            .await
            .map_err(op_err)
    }

    async fn exists(&self, key: &str) -> Result<bool, CacheError> {
        let mut conn: PooledConnection<'_, Client> = self.get_conn().await?;
        let conn_ref: &mut MultiplexedConnection = &mut conn;
        conn_ref.exists(self.prefixed_key(key)).await.map_err(op_err)
    }

    async fn hash_incr(&self, key: &str, field: &str, delta: i64) -> Result<i64, CacheError> {
        let mut conn: PooledConnection<'_, Client> = self.get_conn().await?;
        let conn_ref: &mut MultiplexedConnection = &mut conn;
        conn_ref
            .hincr(self.prefixed_key(key), field, delta)
            .await
            .map_err(op_err)
    }

    async fn hash_set_all(&self, key: &str, fields: &[(&str, i64)]) -> Result<(), CacheError> {
        if fields.is_empty() {
            return Ok(());
        }
        let mut conn: PooledConnection<'_, Client> = self.get_conn().await?;
        let conn_ref: &mut MultiplexedConnection = &mut conn;
        conn_ref
            .hset_multiple::<_, _, _, ()>(self.prefixed_key(key), fields)
            .await
            .map_err(op_err)
    }

    async fn hash_set_if_absent(
        &self,
        key: &str,
        fields: &[(&str, i64)],
    ) -> Result<(), CacheError> {
        if fields.is_empty() {
            return Ok(());
        }
        let prefixed = self.prefixed_key(key);
        let mut pipe = redis::pipe();
        pipe.atomic();
        for (field, value) in fields {
            pipe.hset_nx(&prefixed, *field, *value).ignore();
        }

        let mut conn: PooledConnection<'_, Client> = self.get_conn().await?;
        let conn_ref: &mut MultiplexedConnection = &mut conn;
        pipe.query_async(conn_ref).await.map_err(op_err)
    }

    async fn hash_get_all(&self, key: &str) -> Result<HashMap<String, i64>, CacheError> {
        let mut conn: PooledConnection<'_, Client> = self.get_conn().await?;
        let conn_ref: &mut MultiplexedConnection = &mut conn;
        conn_ref
            .hgetall(self.prefixed_key(key))
            .await
            .map_err(op_err)
    }

    async fn set_add(&self, key: &str, member: &str) -> Result<(), CacheError> {
        let mut conn: PooledConnection<'_, Client> = self.get_conn().await?;
        let conn_ref: &mut MultiplexedConnection = &mut conn;
        conn_ref
            .sadd::<_, _, ()>(self.prefixed_key(key), member)
            .await
            .map_err(op_err)
    }

    async fn set_remove(&self, key: &str, member: &str) -> Result<(), CacheError> {
        let mut conn: PooledConnection<'_, Client> = self.get_conn().await?;
        let conn_ref: &mut MultiplexedConnection = &mut conn;
        conn_ref
            .srem::<_, _, ()>(self.prefixed_key(key), member)
            .await
            .map_err(op_err)
    }

    async fn set_is_member(&self, key: &str, member: &str) -> Result<bool, CacheError> {
        let mut conn: PooledConnection<'_, Client> = self.get_conn().await?;
        let conn_ref: &mut MultiplexedConnection = &mut conn;
        conn_ref
            .sismember(self.prefixed_key(key), member)
            .await
            .map_err(op_err)
    }

    async fn set_members(&self, key: &str) -> Result<Vec<String>, CacheError> {
        let mut conn: PooledConnection<'_, Client> = self.get_conn().await?;
        let conn_ref: &mut MultiplexedConnection = &mut conn;
        conn_ref
            .smembers(self.prefixed_key(key))
            .await
            .map_err(op_err)
    }

    async fn set_replace(&self, key: &str, members: &[String]) -> Result<(), CacheError> {
        let prefixed = self.prefixed_key(key);
        let mut pipe = redis::pipe();
        pipe.atomic().del(&prefixed).ignore();
        if !members.is_empty() {
            pipe.sadd(&prefixed, members).ignore();
        }

        let mut conn: PooledConnection<'_, Client> = self.get_conn().await?;
        let conn_ref: &mut MultiplexedConnection = &mut conn;
        pipe.query_async(conn_ref).await.map_err(op_err)
    }

    async fn scan_keys(&self, pattern: &str) -> Result<Vec<String>, CacheError> {
        let keys = self.keys(pattern).await?;
        Ok(keys
            .iter()
            .map(|key| self.strip_prefix(key).to_string())
            .collect())
    }

    async fn delete_pattern(&self, pattern: &str) -> Result<u64, CacheError> {
        let keys = self.keys(pattern).await?;
        if keys.is_empty() {
            return Ok(0);
        }

        tracing::debug!(
            pattern = %pattern,
            first = %self.strip_prefix(&keys[0]),
            count = keys.len(),
            "Deleting cache keys by pattern"
        );

        let mut conn: PooledConnection<'_, Client> = self.get_conn().await?;
        let conn_ref: &mut MultiplexedConnection = &mut conn;
        conn_ref.del(keys).await.map_err(op_err)
    }

    async fn count_keys(&self, pattern: &str) -> Result<u64, CacheError> {
        self.keys(pattern).await.map(|keys| keys.len() as u64)
    }

    async fn ping(&self) -> Result<(), CacheError> {
        let mut conn: PooledConnection<'_, Client> = self.get_conn().await?;
        let conn_ref: &mut MultiplexedConnection = &mut conn;
        let _: String = redis::cmd("PING")
            .query_async(conn_ref)
            .await
            .map_err(op_err)?;
        Ok(())
    }

    async fn close(&self) -> Result<(), CacheError> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transport() -> RedisTransport {
        RedisTransport::new(&RedisCacheConfig {
            url: "redis://127.0.0.1:1".to_string(),
            pool_size: 1,
            connection_timeout: 1,
            key_prefix: "vistagram".to_string(),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_construction_does_not_connect() {
        let transport = transport();
        assert_eq!(transport.backend_name(), "redis");
        assert_eq!(transport.prefixed_key("post:1"), "vistagram:post:1");
        assert_eq!(transport.strip_prefix("vistagram:post:1"), "post:1");
    }

    #[test]
    fn test_invalid_url_is_rejected() {
        let result = RedisTransport::new(&RedisCacheConfig {
            url: "not a url".to_string(),
            pool_size: 1,
            connection_timeout: 1,
            key_prefix: "vistagram".to_string(),
        });
        assert!(matches!(result, Err(CacheError::Connection(_))));
    }

    #[tokio::test]
    async fn test_closed_transport_rejects_calls() {
        let transport = transport();
        transport.close().await.unwrap();
        assert!(matches!(
            transport.get("post:1").await,
            Err(CacheError::NotInitialized)
        ));
    }
}
