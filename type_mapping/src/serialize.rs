//! Serialization utilities
//!
//! Stable textual forms of runtime values, used wherever a value has to take
//! part in a derived key (cache keys, statement fingerprints).

use crate::types::SqlValue;

impl SqlValue {
    /// Type-tagged, unambiguous rendering of the value.
    ///
    /// Two values produce the same fragment only when they are the same
    /// variant holding the same data, so `Integer(1)` and `Text("1")` differ.
    pub fn key_fragment(&self) -> String {
        match self {
            SqlValue::Null => "null".to_string(),
            SqlValue::Boolean(b) => format!("bool:{}", b),
            SqlValue::SmallInt(i) => format!("i16:{}", i),
            SqlValue::Integer(i) => format!("i32:{}", i),
            SqlValue::BigInt(i) => format!("i64:{}", i),
            SqlValue::Real(f) => format!("f32:{:?}", f),
            SqlValue::Double(f) => format!("f64:{:?}", f),
            SqlValue::Decimal(d) => format!("dec:{}", d),
            SqlValue::Text(s) => format!("text:{:?}", s),
            SqlValue::Uuid(u) => format!("uuid:{}", u),
            SqlValue::Timestamp(ts) => format!("ts:{}", ts.to_rfc3339()),
            SqlValue::Date(d) => format!("date:{}", d),
            SqlValue::Json(v) => format!("json:{}", v),
            SqlValue::Bytes(b) => {
                let hex: String = b.iter().map(|byte| format!("{:02x}", byte)).collect();
                format!("bytes:{}", hex)
            }
        }
    }
}
