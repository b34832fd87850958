//! Convenience re-exports for common query-object usage

// Building blocks
pub use crate::expression::{DatePart, Expression, Operand};
pub use crate::predicate::Predicate;
pub use crate::source::Source;

// Statements
pub use crate::ordering::SortOrder;
pub use crate::render::Dialect;
pub use crate::section::{Pagination, QuerySection};
pub use crate::statement::Statement;

// Metadata and resolution
pub use crate::metadata::{EntityMeta, EntityRegistry, MetadataProvider};
pub use crate::resolver::CascadeResolver;

// Keys and errors
pub use crate::cache_key::CacheKey;
pub use crate::errors::QueryError;

// Value types
pub use type_mapping::{DbType, SqlValue};
