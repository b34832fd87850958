//! Query Object - Query composition core for SqlWeave
//!
//! This crate turns typed expressions into parameterized SQL: expressions and
//! predicates with their parameter bags, table sources with joins, cascade
//! resolution of navigation paths into joins, and full query sections.

pub mod cache_key;
pub mod errors;
pub mod expression;
pub mod metadata;
pub mod ordering;
pub mod param;
pub mod predicate;
pub mod prelude;
pub mod render;
pub mod resolver;
pub mod section;
pub mod source;
pub mod statement;
pub mod validation;


pub use cache_key::CacheKey;
pub use errors::QueryError;
pub use expression::{DatePart, Expression, Operand};
pub use metadata::{
    ColumnMeta, EntityMeta, EntityRegistry, MetadataProvider, Navigation, NavigationKind,
};
pub use ordering::SortOrder;
pub use param::{ParamName, Parameter};
pub use predicate::{OrderItem, Predicate};
pub use render::Dialect;
pub use resolver::CascadeResolver;
pub use section::{Pagination, QuerySection, SelectItem};
pub use source::{Join, Source};
pub use statement::Statement;
pub use validation::{ValidatedIdentifier, ValidationError};
