//! Convenience re-exports for common SqlWeave usage
//!
//! This prelude module re-exports the most commonly used items from the SqlWeave crates,
//! making it easier to import everything you need with a single use statement.
//!
//! # Example
//!
//! ```rust
//! use sqlweave::prelude::*;
//!
//! let filter = Expression::column("Users.Age", DbType::Integer)?.gt(18);
//! assert_eq!(filter.parameters().len(), 1);
//! # Ok::<(), QueryError>(())
//! ```

// Core SqlWeave components
pub use crate::core::SqlWeave;
pub use crate::errors::SqlWeaveError;

// Re-export centralized config
pub use config::{AppConfig, CacheConfig, DatabaseConfig, QueryConfig};

// Query composition
pub use query_object::prelude::*;

// Cache system
pub use cache_system::{CacheError, CacheManager, CacheParams, QueryCache};

// Common external dependencies
pub use async_trait::async_trait;
pub use serde::{Deserialize, Serialize};
pub use sqlx;
pub use tokio;

// Commonly used sqlx types
pub use sqlx::{FromRow, PgPool};
