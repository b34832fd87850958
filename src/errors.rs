//! Error types for the SqlWeave crate
//!
//! This module contains all error types that can be returned by SqlWeave operations.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SqlWeaveError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Query error: {0}")]
    Query(#[from] query_object::QueryError),

    #[error("Cache error: {0}")]
    Cache(#[from] cache_system::CacheError),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
}
