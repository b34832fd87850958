//! Row limits and offsets per dialect

use crate::errors::QueryError;
use crate::render::Dialect;

/// Pagination configuration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Pagination {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl Pagination {
    pub fn new() -> Self {
        Self {
            limit: None,
            offset: None,
        }
    }

    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_offset(mut self, offset: i64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.limit.is_none() && self.offset.is_none()
    }

    pub(crate) fn validate(&self) -> Result<(), QueryError> {
        if self.limit.is_some_and(|limit| limit < 0) {
            return Err(QueryError::invalid("limit cannot be negative"));
        }
        if self.offset.is_some_and(|offset| offset < 0) {
            return Err(QueryError::invalid("offset cannot be negative"));
        }
        Ok(())
    }

    /// `TOP (n)` for SQL Server when only a limit is set
    pub(crate) fn top_clause(&self, dialect: Dialect) -> Option<String> {
        match (dialect, self.limit, self.offset) {
            (Dialect::SqlServer, Some(limit), None) => Some(format!("TOP ({})", limit)),
            _ => None,
        }
    }

    /// Clause appended after ORDER BY. SQL Server's `OFFSET .. FETCH` needs
    /// an ORDER BY, so one is supplied when the query has none.
    pub(crate) fn suffix(&self, dialect: Dialect, has_order: bool) -> String {
        match dialect {
            Dialect::Postgres => {
                let mut clauses = Vec::new();

                if let Some(limit) = self.limit {
                    clauses.push(format!("LIMIT {}", limit));
                }

                if let Some(offset) = self.offset {
                    clauses.push(format!("OFFSET {}", offset));
                }

                clauses.join(" ")
            }
            Dialect::SqlServer => {
                let Some(offset) = self.offset else {
                    return String::new();
                };
                let mut sql = String::new();
                if !has_order {
                    sql.push_str("ORDER BY (SELECT NULL) ");
                }
                sql.push_str(&format!("OFFSET {} ROWS", offset));
                if let Some(limit) = self.limit {
                    sql.push_str(&format!(" FETCH NEXT {} ROWS ONLY", limit));
                }
                sql
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_postgres_suffix() {
        let page = Pagination::new().with_limit(10).with_offset(20);
        assert_eq!(page.suffix(Dialect::Postgres, false), "LIMIT 10 OFFSET 20");
        assert_eq!(page.top_clause(Dialect::Postgres), None);
        assert_eq!(Pagination::new().suffix(Dialect::Postgres, false), "");
    }

    #[test]
    fn test_sql_server_forms() {
        let top = Pagination::new().with_limit(5);
        assert_eq!(top.top_clause(Dialect::SqlServer), Some("TOP (5)".to_string()));
        assert_eq!(top.suffix(Dialect::SqlServer, false), "");

        let page = Pagination::new().with_limit(10).with_offset(20);
        assert_eq!(page.top_clause(Dialect::SqlServer), None);
        assert_eq!(
            page.suffix(Dialect::SqlServer, true),
            "OFFSET 20 ROWS FETCH NEXT 10 ROWS ONLY"
        );
        assert_eq!(
            page.suffix(Dialect::SqlServer, false),
            "ORDER BY (SELECT NULL) OFFSET 20 ROWS FETCH NEXT 10 ROWS ONLY"
        );
    }

    #[test]
    fn test_negative_values_are_rejected() {
        assert!(Pagination::new().with_limit(-1).validate().is_err());
        assert!(Pagination::new().with_offset(-1).validate().is_err());
        assert!(Pagination::new().with_limit(0).validate().is_ok());
    }
}
