//! SQL rendering
//!
//! Expressions render into a [`RenderContext`], which decides how identifiers
//! are quoted and how placeholders are spelled, and records every parameter in
//! the order its placeholder first appears.

use crate::param::{ParamName, Parameter};
use std::collections::{BTreeMap, HashMap};

/// SQL dialect for quoting, placeholders and dialect-specific functions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Dialect {
    /// `[ident]`, `@name` placeholders
    #[default]
    SqlServer,
    /// `"ident"`, `$1, $2` placeholders numbered by first appearance
    Postgres,
}

impl Dialect {
    /// Quote a single identifier, escaping the closing quote character
    pub fn quote_ident(self, name: &str) -> String {
        match self {
            Dialect::SqlServer => format!("[{}]", name.replace(']', "]]")),
            Dialect::Postgres => format!("\"{}\"", name.replace('"', "\"\"")),
        }
    }

    /// Quote a dotted name part by part (`dbo.Users` -> `[dbo].[Users]`)
    pub fn quote_path(self, name: &str) -> String {
        name.split('.')
            .map(|part| self.quote_ident(part))
            .collect::<Vec<_>>()
            .join(".")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Placeholders {
    /// Dialect placeholders, bound by the executor
    Native,
    /// Every placeholder spelled `?`; used for cache keys and equality
    Wildcard,
}

#[derive(Debug)]
pub(crate) struct RenderContext {
    dialect: Dialect,
    placeholders: Placeholders,
    bound: Vec<(ParamName, Parameter)>,
    index: HashMap<ParamName, usize>,
}

impl RenderContext {
    pub(crate) fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            placeholders: Placeholders::Native,
            bound: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub(crate) fn wildcard(dialect: Dialect) -> Self {
        Self {
            placeholders: Placeholders::Wildcard,
            ..Self::new(dialect)
        }
    }

    pub(crate) fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Output names for one owner's parameter bag.
    ///
    /// Separately owned expressions rendered into one statement (filter,
    /// projection, join conditions) may reuse a caller-chosen name; any name
    /// already bound by an earlier owner is mapped to a fresh one.
    pub(crate) fn scope(
        &self,
        params: &BTreeMap<ParamName, Parameter>,
    ) -> HashMap<ParamName, ParamName> {
        params
            .keys()
            .map(|name| {
                let output = if self.index.contains_key(name) {
                    loop {
                        let fresh = ParamName::fresh();
                        if !self.index.contains_key(&fresh) && !params.contains_key(&fresh) {
                            break fresh;
                        }
                    }
                } else {
                    name.clone()
                };
                (name.clone(), output)
            })
            .collect()
    }

    /// Placeholder text for `name`, binding `param` the first time it is seen
    pub(crate) fn placeholder(&mut self, name: &ParamName, param: &Parameter) -> String {
        let position = match self.index.get(name) {
            Some(position) => *position,
            None => {
                self.bound.push((name.clone(), param.clone()));
                let position = self.bound.len() - 1;
                self.index.insert(name.clone(), position);
                position
            }
        };

        match (self.placeholders, self.dialect) {
            (Placeholders::Wildcard, _) => "?".to_string(),
            (Placeholders::Native, Dialect::SqlServer) => format!("@{}", name),
            (Placeholders::Native, Dialect::Postgres) => match param.db_type.pg_placeholder_cast() {
                Some(cast) => format!("${}::{}", position + 1, cast),
                None => format!("${}", position + 1),
            },
        }
    }

    pub(crate) fn into_parameters(self) -> Vec<(ParamName, Parameter)> {
        self.bound
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use type_mapping::DbType;

    #[test]
    fn test_quoting() {
        assert_eq!(Dialect::SqlServer.quote_ident("Users"), "[Users]");
        assert_eq!(Dialect::SqlServer.quote_ident("a]b"), "[a]]b]");
        assert_eq!(Dialect::Postgres.quote_ident("a\"b"), "\"a\"\"b\"");
        assert_eq!(Dialect::SqlServer.quote_path("dbo.Users"), "[dbo].[Users]");
        assert_eq!(Dialect::Postgres.quote_path("public.users"), "\"public\".\"users\"");
    }

    #[test]
    fn test_postgres_placeholders_follow_first_appearance() {
        let mut ctx = RenderContext::new(Dialect::Postgres);
        let a = ParamName::named("a");
        let b = ParamName::named("b");
        let int = Parameter::new(DbType::Integer, 1);
        let dec = Parameter::new(DbType::Decimal, "1.50");

        assert_eq!(ctx.placeholder(&b, &int), "$1");
        assert_eq!(ctx.placeholder(&a, &dec), "$2::numeric");
        assert_eq!(ctx.placeholder(&b, &int), "$1");

        let bound = ctx.into_parameters();
        assert_eq!(bound.len(), 2);
        assert_eq!(bound[0].0, b);
    }

    #[test]
    fn test_scope_renames_names_bound_by_earlier_owner() {
        let mut ctx = RenderContext::new(Dialect::SqlServer);
        let shared = ParamName::named("id");
        let param = Parameter::new(DbType::Integer, 1);
        ctx.placeholder(&shared, &param);

        let mut bag = BTreeMap::new();
        bag.insert(shared.clone(), Parameter::new(DbType::Integer, 2));
        let names = ctx.scope(&bag);
        assert_ne!(names[&shared], shared);
    }

    #[test]
    fn test_wildcard_placeholders() {
        let mut ctx = RenderContext::wildcard(Dialect::SqlServer);
        let name = ParamName::fresh();
        assert_eq!(ctx.placeholder(&name, &Parameter::new(DbType::Text, "x")), "?");
        assert_eq!(ctx.into_parameters().len(), 1);
    }
}
