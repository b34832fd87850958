//! Logical value types shared by the sqlweave crates
//! This crate provides the column types and runtime parameter values used by
//! query composition, statement binding and cache keys

pub mod coerce;
pub mod serialize;
pub mod sql;
pub mod types;

pub use coerce::CoerceError;
pub use types::{DbType, SqlValue};
