//! Value coercion
//!
//! Converts a runtime value to the declared type of the parameter it is bound
//! to, so a text literal compared with a uuid column is sent as a uuid.

use crate::types::{DbType, SqlValue};
use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Error)]
#[error("cannot convert {value} to {target}")]
pub struct CoerceError {
    pub value: String,
    pub target: DbType,
}

impl CoerceError {
    fn new(value: &SqlValue, target: DbType) -> Self {
        Self {
            value: value.key_fragment(),
            target,
        }
    }
}

impl SqlValue {
    /// This value as `target`. NULL and values already of that type pass
    /// through unchanged; lossy or unparsable conversions fail.
    pub fn coerce_to(self, target: DbType) -> Result<SqlValue, CoerceError> {
        if self.db_type().is_none_or(|ty| ty == target) {
            return Ok(self);
        }

        let fail = |value: &SqlValue| CoerceError::new(value, target);
        let coerced = match (&self, target) {
            (SqlValue::SmallInt(_) | SqlValue::Integer(_) | SqlValue::BigInt(_), _) => {
                let wide = match &self {
                    SqlValue::SmallInt(i) => i64::from(*i),
                    SqlValue::Integer(i) => i64::from(*i),
                    SqlValue::BigInt(i) => *i,
                    _ => return Err(fail(&self)),
                };
                from_integer(wide, target)
            }
            (SqlValue::Real(f), DbType::Double) => Some(SqlValue::Double(f64::from(*f))),
            (SqlValue::Double(f), DbType::Real) if f.is_finite() && (*f as f32) as f64 == *f => {
                Some(SqlValue::Real(*f as f32))
            }
            (SqlValue::Real(f), DbType::Decimal) if f.is_finite() => {
                Some(SqlValue::Decimal(f.to_string()))
            }
            (SqlValue::Double(f), DbType::Decimal) if f.is_finite() => {
                Some(SqlValue::Decimal(f.to_string()))
            }
            (SqlValue::Decimal(d), DbType::Double) => d.parse().ok().map(SqlValue::Double),
            (SqlValue::Text(s), _) => from_text(s, target),
            (SqlValue::Date(d), DbType::Timestamp) => d
                .and_hms_opt(0, 0, 0)
                .map(|dt| SqlValue::Timestamp(dt.and_utc())),
            (SqlValue::Timestamp(ts), DbType::Date) => Some(SqlValue::Date(ts.date_naive())),
            (SqlValue::Decimal(d), DbType::Text) => Some(SqlValue::Text(d.clone())),
            (SqlValue::Uuid(u), DbType::Text) => Some(SqlValue::Text(u.to_string())),
            (SqlValue::Json(v), DbType::Text) => Some(SqlValue::Text(v.to_string())),
            _ => None,
        };

        coerced.ok_or_else(|| fail(&self))
    }
}

fn from_integer(value: i64, target: DbType) -> Option<SqlValue> {
    match target {
        DbType::SmallInt => i16::try_from(value).ok().map(SqlValue::SmallInt),
        DbType::Integer => i32::try_from(value).ok().map(SqlValue::Integer),
        DbType::BigInt => Some(SqlValue::BigInt(value)),
        DbType::Real => Some(SqlValue::Real(value as f32)),
        DbType::Double => Some(SqlValue::Double(value as f64)),
        DbType::Decimal => Some(SqlValue::Decimal(value.to_string())),
        DbType::Text => Some(SqlValue::Text(value.to_string())),
        _ => None,
    }
}

fn from_text(text: &str, target: DbType) -> Option<SqlValue> {
    let trimmed = text.trim();
    match target {
        DbType::Boolean => trimmed.parse().ok().map(SqlValue::Boolean),
        DbType::SmallInt => trimmed.parse().ok().map(SqlValue::SmallInt),
        DbType::Integer => trimmed.parse().ok().map(SqlValue::Integer),
        DbType::BigInt => trimmed.parse().ok().map(SqlValue::BigInt),
        DbType::Real => trimmed.parse().ok().map(SqlValue::Real),
        DbType::Double => trimmed.parse().ok().map(SqlValue::Double),
        DbType::Decimal => trimmed
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .map(|_| SqlValue::Decimal(trimmed.to_string())),
        DbType::Uuid => Uuid::parse_str(trimmed).ok().map(SqlValue::Uuid),
        DbType::Timestamp => DateTime::parse_from_rfc3339(trimmed)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
            .or_else(|| {
                NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
                    .ok()
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
                    .map(|dt| dt.and_utc())
            })
            .map(SqlValue::Timestamp),
        DbType::Date => NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
            .ok()
            .map(SqlValue::Date),
        DbType::Json => serde_json::from_str(text).ok().map(SqlValue::Json),
        DbType::Text | DbType::Bytes => None,
    }
}
