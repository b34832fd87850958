//! Binding of statement parameters to sqlx queries
//!
//! Parameters are coerced to their declared type first (`Parameter::coerced`),
//! then bound by variant. A NULL is bound as a typed `None` so Postgres sees
//! the parameter's declared type.

/// Bind a `query_object::Parameter` to any sqlx query, query_as or
/// query_scalar builder
macro_rules! bind_sql_value {
    ($query:expr, $param:expr) => {{
        let param: query_object::Parameter = $param;
        match param.value {
            type_mapping::SqlValue::Null => match param.db_type {
                type_mapping::DbType::Boolean => $query.bind(Option::<bool>::None),
                type_mapping::DbType::SmallInt => $query.bind(Option::<i16>::None),
                type_mapping::DbType::Integer => $query.bind(Option::<i32>::None),
                type_mapping::DbType::BigInt => $query.bind(Option::<i64>::None),
                type_mapping::DbType::Real => $query.bind(Option::<f32>::None),
                type_mapping::DbType::Double => $query.bind(Option::<f64>::None),
                type_mapping::DbType::Decimal | type_mapping::DbType::Text => {
                    $query.bind(Option::<String>::None)
                }
                type_mapping::DbType::Uuid => $query.bind(Option::<uuid::Uuid>::None),
                type_mapping::DbType::Timestamp => {
                    $query.bind(Option::<chrono::DateTime<chrono::Utc>>::None)
                }
                type_mapping::DbType::Date => $query.bind(Option::<chrono::NaiveDate>::None),
                type_mapping::DbType::Json => {
                    $query.bind(Option::<sqlx::types::Json<serde_json::Value>>::None)
                }
                type_mapping::DbType::Bytes => $query.bind(Option::<Vec<u8>>::None),
            },
            type_mapping::SqlValue::Boolean(b) => $query.bind(b),
            type_mapping::SqlValue::SmallInt(i) => $query.bind(i),
            type_mapping::SqlValue::Integer(i) => $query.bind(i),
            type_mapping::SqlValue::BigInt(i) => $query.bind(i),
            type_mapping::SqlValue::Real(f) => $query.bind(f),
            type_mapping::SqlValue::Double(f) => $query.bind(f),
            // Rendered with a ::numeric cast
            type_mapping::SqlValue::Decimal(s) => $query.bind(s),
            type_mapping::SqlValue::Text(s) => $query.bind(s),
            type_mapping::SqlValue::Uuid(u) => $query.bind(u),
            type_mapping::SqlValue::Timestamp(dt) => $query.bind(dt),
            type_mapping::SqlValue::Date(d) => $query.bind(d),
            type_mapping::SqlValue::Json(v) => $query.bind(sqlx::types::Json(v)),
            type_mapping::SqlValue::Bytes(b) => $query.bind(b),
        }
    }};
}

pub(crate) use bind_sql_value;
