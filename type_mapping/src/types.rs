//! Type mapping definitions
//!
//! This module provides the logical column types used by query expressions
//! and the runtime values bound to statement parameters.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Logical data type of an expression, column or parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DbType {
    Boolean,
    SmallInt,
    Integer,
    BigInt,
    Real,
    Double,
    Decimal,
    Text,
    Uuid,
    Timestamp,
    Date,
    Json,
    Bytes,
}

impl fmt::Display for DbType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DbType::Boolean => "boolean",
            DbType::SmallInt => "small_int",
            DbType::Integer => "integer",
            DbType::BigInt => "big_int",
            DbType::Real => "real",
            DbType::Double => "double",
            DbType::Decimal => "decimal",
            DbType::Text => "text",
            DbType::Uuid => "uuid",
            DbType::Timestamp => "timestamp",
            DbType::Date => "date",
            DbType::Json => "json",
            DbType::Bytes => "bytes",
        };
        f.write_str(name)
    }
}

/// Runtime value carried by a statement parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SqlValue {
    Null,
    Boolean(bool),
    SmallInt(i16),
    Integer(i32),
    BigInt(i64),
    Real(f32),
    Double(f64),
    Decimal(String), // Store as string to preserve precision
    Text(String),
    Uuid(Uuid),
    Timestamp(DateTime<Utc>),
    Date(NaiveDate),
    Json(serde_json::Value),
    Bytes(Vec<u8>),
}

impl SqlValue {
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    /// Natural type of the value, `None` for `Null`
    pub fn db_type(&self) -> Option<DbType> {
        let ty = match self {
            SqlValue::Null => return None,
            SqlValue::Boolean(_) => DbType::Boolean,
            SqlValue::SmallInt(_) => DbType::SmallInt,
            SqlValue::Integer(_) => DbType::Integer,
            SqlValue::BigInt(_) => DbType::BigInt,
            SqlValue::Real(_) => DbType::Real,
            SqlValue::Double(_) => DbType::Double,
            SqlValue::Decimal(_) => DbType::Decimal,
            SqlValue::Text(_) => DbType::Text,
            SqlValue::Uuid(_) => DbType::Uuid,
            SqlValue::Timestamp(_) => DbType::Timestamp,
            SqlValue::Date(_) => DbType::Date,
            SqlValue::Json(_) => DbType::Json,
            SqlValue::Bytes(_) => DbType::Bytes,
        };
        Some(ty)
    }
}

impl From<String> for SqlValue {
    fn from(val: String) -> Self {
        SqlValue::Text(val)
    }
}

impl From<&str> for SqlValue {
    fn from(val: &str) -> Self {
        SqlValue::Text(val.to_string())
    }
}

impl From<i16> for SqlValue {
    fn from(val: i16) -> Self {
        SqlValue::SmallInt(val)
    }
}

impl From<i32> for SqlValue {
    fn from(val: i32) -> Self {
        SqlValue::Integer(val)
    }
}

impl From<i64> for SqlValue {
    fn from(val: i64) -> Self {
        SqlValue::BigInt(val)
    }
}

impl From<f32> for SqlValue {
    fn from(val: f32) -> Self {
        SqlValue::Real(val)
    }
}

impl From<f64> for SqlValue {
    fn from(val: f64) -> Self {
        SqlValue::Double(val)
    }
}

impl From<bool> for SqlValue {
    fn from(val: bool) -> Self {
        SqlValue::Boolean(val)
    }
}

impl From<Uuid> for SqlValue {
    fn from(val: Uuid) -> Self {
        SqlValue::Uuid(val)
    }
}

impl From<DateTime<Utc>> for SqlValue {
    fn from(val: DateTime<Utc>) -> Self {
        SqlValue::Timestamp(val)
    }
}

impl From<NaiveDate> for SqlValue {
    fn from(val: NaiveDate) -> Self {
        SqlValue::Date(val)
    }
}

impl From<serde_json::Value> for SqlValue {
    fn from(val: serde_json::Value) -> Self {
        SqlValue::Json(val)
    }
}

impl From<Vec<u8>> for SqlValue {
    fn from(val: Vec<u8>) -> Self {
        SqlValue::Bytes(val)
    }
}

impl<T> From<Option<T>> for SqlValue
where
    T: Into<SqlValue>,
{
    fn from(val: Option<T>) -> Self {
        match val {
            Some(v) => v.into(),
            None => SqlValue::Null,
        }
    }
}
