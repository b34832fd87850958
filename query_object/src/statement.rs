//! Rendered statements handed to the executor

use crate::param::{ParamName, Parameter};
use crate::render::Dialect;

/// SQL text plus the parameters its placeholders refer to.
///
/// Parameters are listed in the order their placeholders first appear, so
/// PostgreSQL's `$n` is `parameters()[n - 1]`. Every placeholder has exactly
/// one entry and every entry is referenced.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub(crate) sql: String,
    pub(crate) parameters: Vec<(ParamName, Parameter)>,
    pub(crate) dialect: Dialect,
}

impl Statement {
    pub(crate) fn new(sql: String, parameters: Vec<(ParamName, Parameter)>, dialect: Dialect) -> Self {
        Self {
            sql,
            parameters,
            dialect,
        }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn parameters(&self) -> &[(ParamName, Parameter)] {
        &self.parameters
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn into_parts(self) -> (String, Vec<(ParamName, Parameter)>) {
        (self.sql, self.parameters)
    }
}
