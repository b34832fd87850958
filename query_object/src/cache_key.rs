//! Cache keys for rendered queries

use crate::param::{ParamName, Parameter};
use std::fmt;

/// Deterministic key for a query: its text with every placeholder spelled
/// `?`, each parameter value in placeholder order, then the connection id,
/// separated by `|`.
///
/// Queries of the same shape with different values get different keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub(crate) fn from_rendered(
        wildcard_sql: &str,
        parameters: &[(ParamName, Parameter)],
        connection_id: &str,
    ) -> Self {
        let mut key = String::from(wildcard_sql);
        for (_, param) in parameters {
            key.push('|');
            key.push_str(&param.value.key_fragment());
        }
        key.push('|');
        key.push_str(connection_id);
        Self(key)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
