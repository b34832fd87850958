//! # SqlWeave
//!
//! Query composition for PostgreSQL: typed expressions and predicates with
//! their own parameters, join graphs, automatic joins for navigation paths
//! through mapped entities, and cache-through execution.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use sqlweave::prelude::*;
//!
//! #[derive(Debug, FromRow, Serialize, Deserialize)]
//! pub struct OrderRow {
//!     pub id: i32,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let registry = EntityRegistry::from_entities([
//!         EntityMeta::new("Order", "orders", "id")
//!             .column("id", DbType::Integer)
//!             .column("customer_id", DbType::Integer)
//!             .reference("Customer", "Customer", "customer_id"),
//!         EntityMeta::new("Customer", "customers", "id")
//!             .column("id", DbType::Integer)
//!             .column("city", DbType::Text),
//!     ])?;
//!
//!     let config = DatabaseConfig::new(
//!         "localhost".to_string(), 5432, "shop".to_string(),
//!         "postgres".to_string(), "password".to_string(),
//!         1, 5, 30, 600, 3600,
//!     );
//!     let weave = SqlWeave::new(config, registry).await?;
//!
//!     let city = weave.registry().column("Order", "Customer.city")?;
//!     let mut section = QuerySection::new(
//!         city.eq("Paris")
//!             .with_source(Source::for_entity(weave.registry(), "Order")?),
//!     )?
//!     .select_as(weave.registry().column("Order", "id")?, "id")?;
//!
//!     let rows: Vec<OrderRow> = weave.fetch_all(&mut section).await?;
//!     println!("{} orders", rows.len());
//!
//!     Ok(())
//! }
//! ```

/// Conditional debug logging macros
/// These macros only compile in code when the `debug-logging` feature is enabled
#[cfg(feature = "debug-logging")]
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {
        tracing::debug!($($arg)*)
    };
}

#[cfg(not(feature = "debug-logging"))]
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {};
}

#[cfg(feature = "debug-logging")]
#[macro_export]
macro_rules! trace_log {
    ($($arg:tt)*) => {
        tracing::trace!($($arg)*)
    };
}

#[cfg(not(feature = "debug-logging"))]
#[macro_export]
macro_rules! trace_log {
    ($($arg:tt)*) => {};
}

mod binding;
pub mod core;
pub mod errors;
pub mod prelude;

// Re-export the main public types for convenience
pub use core::SqlWeave;
pub use errors::SqlWeaveError;

// Re-export centralized config
pub use config::{AppConfig, CacheConfig, DatabaseConfig, QueryConfig};

// Re-export internal crates
pub use cache_system;
pub use query_object;
pub use type_mapping;

// Re-export external dependencies used in public API
pub use async_trait;
pub use sqlx;
