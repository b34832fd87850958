//! Cache system for Redis-based query caching
//!
//! This crate provides the QueryCache abstraction used by SqlWeave to store
//! query results, a Redis implementation, and its error types.

pub mod errors;
pub mod manager;
pub mod params;
pub mod prelude;

// Re-export centralized config
pub use config::CacheConfig;

pub use errors::CacheError;
pub use manager::{CacheManager, QueryCache};
pub use params::CacheParams;
