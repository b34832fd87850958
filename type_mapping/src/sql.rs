//! SQL type conversion utilities
//!
//! Placeholder casts for the logical [`DbType`]s.

use crate::types::DbType;

impl DbType {
    /// Explicit cast a PostgreSQL placeholder needs when the bound value is
    /// sent as text (decimals are carried as strings to keep precision)
    pub fn pg_placeholder_cast(&self) -> Option<&'static str> {
        match self {
            DbType::Decimal => Some("numeric"),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_casts() {
        assert_eq!(DbType::Decimal.pg_placeholder_cast(), Some("numeric"));
        assert_eq!(DbType::Text.pg_placeholder_cast(), None);
    }
}
