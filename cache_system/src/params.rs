//! Cache parameter configuration
//!
//! This module defines the CacheParams struct pairing a QueryCache with the
//! TTL and key prefix used for query results.

use crate::errors::CacheError;
use crate::manager::QueryCache;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Cache parameters for query results
#[derive(Debug, Clone)]
pub struct CacheParams {
    /// The cache backend
    pub cache: Arc<dyn QueryCache>,
    /// TTL for cached results in seconds
    pub ttl: u64,
    /// Prefix for cache keys
    pub prefix: String,
}

impl CacheParams {
    pub fn new(cache: Arc<dyn QueryCache>, ttl: u64, prefix: &str) -> Self {
        Self {
            ttl,
            prefix: prefix.to_string(),
            cache,
        }
    }

    /// Cached rows for `key`, if present
    pub async fn get_query<T>(&self, table: &str, key: &str) -> Result<Option<Vec<T>>, CacheError>
    where
        T: for<'de> Deserialize<'de>,
    {
        match self.cache.get(&self.prefix, table, key).await? {
            Some(json_str) => {
                let values: Vec<T> = serde_json::from_str(&json_str)?;
                Ok(Some(values))
            }
            None => Ok(None),
        }
    }

    pub async fn set_query<T>(&self, table: &str, key: &str, rows: &[T]) -> Result<(), CacheError>
    where
        T: Serialize,
    {
        let json_str = serde_json::to_string(rows)?;
        self.cache
            .set(&self.prefix, table, key, &json_str, self.ttl)
            .await
    }

    pub async fn invalidate_table(&self, table: &str) -> Result<i32, CacheError> {
        self.cache.invalidate_table(&self.prefix, table).await
    }
}
