//! Cache manager implementation
//!
//! This module provides the QueryCache trait and the Redis-backed
//! CacheManager that implements it.

use crate::errors::CacheError;
use async_trait::async_trait;
use config::CacheConfig;
use redis::{AsyncCommands, Client};
use std::collections::hash_map::DefaultHasher;
use std::fmt::Debug;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Storage for serialized query results, addressed by the query's cache key
/// and grouped by the table it reads from.
#[async_trait]
pub trait QueryCache: Send + Sync + Debug {
    async fn get(&self, prefix: &str, table: &str, key: &str) -> Result<Option<String>, CacheError>;

    async fn set(
        &self,
        prefix: &str,
        table: &str,
        key: &str,
        value: &str,
        ttl: u64,
    ) -> Result<(), CacheError>;

    /// Drop every cached query for `table`, returning how many were removed
    async fn invalidate_table(&self, prefix: &str, table: &str) -> Result<i32, CacheError>;
}

/// Redis-based cache manager
#[derive(Clone)]
pub struct CacheManager {
    client: Arc<Client>,
    config: Arc<CacheConfig>,
    connection_pool: Arc<RwLock<Option<redis::aio::MultiplexedConnection>>>,
}

impl Debug for CacheManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let connection_status = match self.connection_pool.try_read() {
            Ok(pool) if pool.is_some() => "connected",
            Ok(_) => "no_connection",
            Err(_) => "lock_error",
        };

        f.debug_struct("CacheManager")
            .field("redis_url", &self.config.redis_url)
            .field("key_prefix", &self.config.key_prefix)
            .field("connected", &connection_status)
            .finish()
    }
}

impl CacheManager {
    /// Create a new cache manager. No connection is opened until first use.
    pub fn new(config: CacheConfig) -> Result<Self, CacheError> {
        let client = Client::open(config.redis_url.as_str())?;

        Ok(Self {
            client: Arc::new(client),
            config: Arc::new(config),
            connection_pool: Arc::new(RwLock::new(None)),
        })
    }

    /// Get or create Redis connection
    async fn get_connection(&self) -> Result<redis::aio::MultiplexedConnection, CacheError> {
        let mut pool = self.connection_pool.write().await;

        if pool.is_none() {
            let connection = self.client.get_multiplexed_async_connection().await?;
            *pool = Some(connection);
        }

        Ok(pool
            .as_ref()
            .ok_or_else(|| CacheError::Connection("Failed to get connection from pool".into()))?
            .clone())
    }

    /// Redis key for a query: `{prefix}:{table}:query:{hash}`
    pub fn build_query_key(&self, prefix: &str, table_name: &str, query_key: &str) -> String {
        format!(
            "{}:{}:query:{}",
            prefix,
            table_name,
            self.hash_query(&query_key)
        )
    }

    /// Generate hash for a query key
    pub fn hash_query<T: Hash>(&self, query: &T) -> String {
        let mut hasher = DefaultHasher::new();
        query.hash(&mut hasher);
        format!("{:x}", hasher.finish())
    }

    /// Ping Redis to check connectivity
    pub async fn ping(&self) -> Result<String, CacheError> {
        let mut conn = self.get_connection().await?;
        let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(pong)
    }

    /// Get current configuration
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }
}

#[async_trait]
impl QueryCache for CacheManager {
    async fn get(&self, prefix: &str, table: &str, key: &str) -> Result<Option<String>, CacheError> {
        let cache_key = self.build_query_key(prefix, table, key);
        let mut conn = self.get_connection().await?;

        let cached: Option<String> = conn.get(&cache_key).await?;
        Ok(cached)
    }

    async fn set(
        &self,
        prefix: &str,
        table: &str,
        key: &str,
        value: &str,
        ttl: u64,
    ) -> Result<(), CacheError> {
        if ttl == 0 {
            return Err(CacheError::InvalidTtl(ttl));
        }
        let cache_key = self.build_query_key(prefix, table, key);
        let mut conn = self.get_connection().await?;

        let _: () = conn.set_ex(&cache_key, value, ttl).await?;
        Ok(())
    }

    async fn invalidate_table(&self, prefix: &str, table: &str) -> Result<i32, CacheError> {
        let pattern = format!("{}:{}:query:*", prefix, table);
        let mut conn = self.get_connection().await?;

        let keys: Vec<String> = conn.keys(&pattern).await?;
        if keys.is_empty() {
            return Ok(0);
        }

        let deleted: i32 = conn.del(keys).await?;
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> CacheManager {
        CacheManager::new(CacheConfig::new(
            "redis://127.0.0.1:6379".to_string(),
            4,
            500,
            8,
            1000,
        ))
        .unwrap()
    }

    #[test]
    fn test_query_key_layout() {
        let manager = manager();
        let key = manager.build_query_key("app", "Order", "SELECT ?|i32:1|main");
        let hash = manager.hash_query(&"SELECT ?|i32:1|main");
        assert_eq!(key, format!("app:Order:query:{}", hash));
    }

    #[test]
    fn test_different_values_hash_differently() {
        let manager = manager();
        assert_ne!(
            manager.build_query_key("app", "Order", "SELECT ?|i32:1|main"),
            manager.build_query_key("app", "Order", "SELECT ?|i32:2|main")
        );
        assert_eq!(
            manager.hash_query(&"same"),
            manager.hash_query(&"same")
        );
    }

    #[test]
    fn test_invalid_url_is_rejected() {
        let result = CacheManager::new(CacheConfig::new("not a url".to_string(), 1, 1, 1, 1));
        assert!(matches!(result, Err(CacheError::ConnectionError(_))));
    }

    #[tokio::test]
    async fn test_zero_ttl_rejected_before_connecting() {
        let manager = manager();
        let result = manager.set("app", "Order", "k", "[]", 0).await;
        assert!(matches!(result, Err(CacheError::InvalidTtl(0))));
    }
}
