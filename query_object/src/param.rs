//! Statement parameters
//!
//! Parameter names are minted from a process-wide counter, so expressions built
//! independently (on any thread) never share a generated name.

use crate::errors::QueryError;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use type_mapping::{DbType, SqlValue};

static NEXT_PARAM_ID: AtomicU64 = AtomicU64::new(1);

/// Name of a statement parameter, without the dialect's placeholder marker
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ParamName(String);

impl ParamName {
    /// Mint a name no other call in this process has returned
    pub fn fresh() -> Self {
        let id = NEXT_PARAM_ID.fetch_add(1, Ordering::Relaxed);
        Self(format!("p{}", id))
    }

    /// Caller-chosen name, as used by custom SQL fragments. A leading `@` is
    /// stripped so both `@id` and `id` name the same parameter.
    pub(crate) fn named(name: &str) -> Self {
        Self(name.trim_start_matches('@').to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ParamName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Declared type and bound value of a parameter
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub db_type: DbType,
    pub value: SqlValue,
}

impl Parameter {
    pub fn new(db_type: DbType, value: impl Into<SqlValue>) -> Self {
        Self {
            db_type,
            value: value.into(),
        }
    }

    /// The value converted to the declared type, as it must be bound
    pub fn coerced(self) -> Result<Parameter, QueryError> {
        let db_type = self.db_type;
        let value = self
            .value
            .coerce_to(db_type)
            .map_err(|err| QueryError::invalid(format!("parameter value: {}", err)))?;
        Ok(Parameter { db_type, value })
    }
}

/// Whether `c` may appear in a parameter name after the marker
pub(crate) fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}
