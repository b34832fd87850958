//! Expressions
//!
//! An [`Expression`] is a renderable SQL fragment together with the
//! parameters it references. Expressions are not `Clone`: every combinator
//! consumes its operands, and reusing a fragment in a second place goes
//! through [`Expression::detach`], which gives the copy its own parameter
//! names.

pub mod fragment;
pub mod operators;

use crate::errors::QueryError;
use crate::param::{is_name_char, ParamName, Parameter};
use crate::render::{Dialect, RenderContext};
use crate::statement::Statement;
use crate::validation::{require_identifier, require_qualified};
use fragment::{ColumnRef, Fragment, NavigationPath};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use type_mapping::{DbType, SqlValue};

pub use fragment::DatePart;
pub use operators::Operand;

#[derive(Debug)]
pub struct Expression {
    pub(crate) fragment: Fragment,
    pub(crate) params: BTreeMap<ParamName, Parameter>,
    pub(crate) value_type: DbType,
}

impl Expression {
    /// Column reference. `name` may be qualified (`Users.Age`,
    /// `dbo.Users.Age`); the last part is the column.
    pub fn column(name: &str, value_type: DbType) -> Result<Self, QueryError> {
        let name = require_qualified("column name", name)?;
        let (qualifier, column) = match name.rsplit_once('.') {
            Some((qualifier, column)) => (
                qualifier.split('.').map(str::to_string).collect(),
                column.to_string(),
            ),
            None => (Vec::new(), name),
        };
        Ok(Self::from_column(
            ColumnRef {
                qualifier,
                column,
                path: None,
            },
            value_type,
        ))
    }

    /// Column of a table or join alias
    pub fn qualified(alias: &str, column: &str, value_type: DbType) -> Result<Self, QueryError> {
        let alias = require_qualified("alias", alias)?;
        let column = require_identifier("column name", column)?;
        Ok(Self::from_column(
            ColumnRef {
                qualifier: alias.split('.').map(str::to_string).collect(),
                column,
                path: None,
            },
            value_type,
        ))
    }

    /// Column reached from the source's entity through navigation properties.
    ///
    /// `table` is the table owning `column` at the end of the path. The
    /// reference stays unresolved until a cascade resolver adds the joins and
    /// qualifies it with the joined alias.
    pub fn navigation(
        hops: &[&str],
        table: &str,
        column: &str,
        value_type: DbType,
    ) -> Result<Self, QueryError> {
        let hops = hops
            .iter()
            .map(|hop| require_identifier("navigation property", hop))
            .collect::<Result<Vec<_>, _>>()?;
        let table = require_qualified("table name", table)?;
        let column = require_identifier("column name", column)?;
        Ok(Self::from_column(
            ColumnRef {
                qualifier: Vec::new(),
                column,
                path: Some(NavigationPath { hops, table }),
            },
            value_type,
        ))
    }

    fn from_column(column: ColumnRef, value_type: DbType) -> Self {
        let mut fragment = Fragment::new();
        fragment.push_column(column);
        Self {
            fragment,
            params: BTreeMap::new(),
            value_type,
        }
    }

    /// A single parameter under a freshly minted name
    pub fn parameter(value_type: DbType, value: impl Into<SqlValue>) -> Self {
        let name = ParamName::fresh();
        let mut fragment = Fragment::new();
        fragment.push_param(name.clone());
        let mut params = BTreeMap::new();
        params.insert(name, Parameter::new(value_type, value));
        Self {
            fragment,
            params,
            value_type,
        }
    }

    /// Caller-supplied SQL referencing parameters as `@name`.
    ///
    /// `names`, `types` and `values` are parallel; all three must have the
    /// same length (all empty for a fragment without parameters). Every
    /// supplied name must be referenced and every `@name` must be supplied.
    /// Text inside single quotes, quoted identifiers (`[..]`, `".."`) and
    /// `@@` system variables is left alone.
    pub fn custom(
        sql: &str,
        value_type: DbType,
        names: &[&str],
        types: &[DbType],
        values: Vec<SqlValue>,
    ) -> Result<Self, QueryError> {
        if names.len() != types.len() || names.len() != values.len() {
            return Err(QueryError::invalid(format!(
                "custom SQL parameter lists differ in length: {} names, {} types, {} values",
                names.len(),
                types.len(),
                values.len()
            )));
        }

        let mut params = BTreeMap::new();
        for ((name, db_type), value) in names.iter().zip(types).zip(values) {
            let name = ParamName::named(name);
            if name.as_str().is_empty() || !name.as_str().chars().all(is_name_char) {
                return Err(QueryError::invalid(format!(
                    "invalid parameter name '{}'",
                    name
                )));
            }
            if params
                .insert(name.clone(), Parameter::new(*db_type, value))
                .is_some()
            {
                return Err(QueryError::invalid(format!(
                    "parameter '@{}' is supplied twice",
                    name
                )));
            }
        }

        let fragment = parse_custom(sql, &params)?;

        let mut referenced = Vec::new();
        fragment.param_refs(&mut referenced);
        let referenced: HashSet<&ParamName> = referenced.into_iter().collect();
        if let Some(unused) = params.keys().find(|name| !referenced.contains(name)) {
            return Err(QueryError::invalid(format!(
                "parameter '@{}' is supplied but not referenced",
                unused
            )));
        }

        Ok(Self {
            fragment,
            params,
            value_type,
        })
    }

    /// Expression without text; compares as NULL
    pub fn empty(value_type: DbType) -> Self {
        Self {
            fragment: Fragment::new(),
            params: BTreeMap::new(),
            value_type,
        }
    }

    /// Independent copy with every parameter renamed to a fresh name
    pub fn detach(&self) -> Expression {
        let mut renames = HashMap::new();
        let mut params = BTreeMap::new();
        for (name, param) in &self.params {
            let fresh = ParamName::fresh();
            renames.insert(name.clone(), fresh.clone());
            params.insert(fresh, param.clone());
        }

        let mut fragment = self.fragment.clone();
        fragment.remap(&renames);

        Expression {
            fragment,
            params,
            value_type: self.value_type,
        }
    }

    /// `self <op> right`, keeping the left side's type
    pub fn append(mut self, operator: &str, right: impl Into<Operand>) -> Expression {
        let right = right.into().into_expression(self.value_type);
        let fragment = self.absorb(right);
        self.fragment.push_sql(format!(" {} ", operator.trim()));
        self.fragment.extend(fragment);
        self
    }

    pub fn with_type(mut self, value_type: DbType) -> Self {
        self.value_type = value_type;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.fragment.is_empty()
    }

    pub fn value_type(&self) -> DbType {
        self.value_type
    }

    pub fn parameters(&self) -> &BTreeMap<ParamName, Parameter> {
        &self.params
    }

    /// Whether any column still carries an unresolved navigation path
    pub fn has_unresolved_paths(&self) -> bool {
        let mut found = false;
        self.fragment
            .for_each_column(&mut |column| found |= column.path.is_some());
        found
    }

    pub fn render(&self, dialect: Dialect) -> Statement {
        let mut ctx = RenderContext::new(dialect);
        let sql = self.render_into(&mut ctx);
        Statement::new(sql, ctx.into_parameters(), dialect)
    }

    /// SQL text in the default dialect
    pub fn to_sql(&self) -> String {
        self.render(Dialect::default()).sql
    }

    /// Merge `other`'s parameters into this bag and return its fragment,
    /// with any name that collides with ours renamed
    pub(crate) fn absorb(&mut self, other: Expression) -> Fragment {
        let Expression {
            mut fragment,
            params,
            ..
        } = other;

        let incoming: HashSet<ParamName> = params.keys().cloned().collect();
        let mut renames = HashMap::new();
        for (name, param) in params {
            let name = if self.params.contains_key(&name) {
                let fresh = loop {
                    let fresh = ParamName::fresh();
                    if !self.params.contains_key(&fresh) && !incoming.contains(&fresh) {
                        break fresh;
                    }
                };
                renames.insert(name, fresh.clone());
                fresh
            } else {
                name
            };
            self.params.insert(name, param);
        }

        if !renames.is_empty() {
            tracing::trace!("Renamed {} colliding parameters while merging", renames.len());
            fragment.remap(&renames);
        }
        fragment
    }

    pub(crate) fn render_into(&self, ctx: &mut RenderContext) -> String {
        let names = ctx.scope(&self.params);
        self.fragment.render(ctx, &names, &self.params)
    }

    pub(crate) fn for_each_column(&self, f: &mut dyn FnMut(&ColumnRef)) {
        self.fragment.for_each_column(f);
    }

    pub(crate) fn for_each_column_mut(&mut self, f: &mut dyn FnMut(&mut ColumnRef)) {
        self.fragment.for_each_column_mut(f);
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_sql())
    }
}

fn parse_custom(
    sql: &str,
    params: &BTreeMap<ParamName, Parameter>,
) -> Result<Fragment, QueryError> {
    let mut fragment = Fragment::new();
    let mut text = String::new();
    // closing delimiter of the literal or quoted identifier being copied
    let mut closing: Option<char> = None;
    let mut chars = sql.chars().peekable();

    while let Some(c) = chars.next() {
        if let Some(end) = closing {
            text.push(c);
            if c == end {
                closing = None;
            }
            continue;
        }

        match c {
            '\'' | '"' => {
                closing = Some(c);
                text.push(c);
            }
            '[' => {
                closing = Some(']');
                text.push(c);
            }
            '@' => {
                let system = chars.peek() == Some(&'@');
                if system {
                    chars.next();
                }
                let mut name = String::new();
                while let Some(&next) = chars.peek() {
                    if !is_name_char(next) {
                        break;
                    }
                    name.push(next);
                    chars.next();
                }

                if system || name.is_empty() {
                    text.push('@');
                    if system {
                        text.push('@');
                    }
                    text.push_str(&name);
                    continue;
                }

                let name = ParamName::named(&name);
                if !params.contains_key(&name) {
                    return Err(QueryError::invalid(format!(
                        "parameter '@{}' is referenced but not supplied",
                        name
                    )));
                }
                fragment.push_sql(std::mem::take(&mut text));
                fragment.push_param(name);
            }
            _ => text.push(c),
        }
    }

    fragment.push_sql(text);
    Ok(fragment)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_quoting() {
        let age = Expression::column("Users.Age", DbType::Integer).unwrap();
        assert_eq!(age.to_sql(), "[Users].[Age]");
        assert!(age.parameters().is_empty());

        let plain = Expression::column("Age", DbType::Integer).unwrap();
        assert_eq!(plain.render(Dialect::Postgres).sql(), "\"Age\"");

        let schema = Expression::column("dbo.Users.Age", DbType::Integer).unwrap();
        assert_eq!(schema.to_sql(), "[dbo].[Users].[Age]");
    }

    #[test]
    fn test_empty_column_name_is_rejected() {
        assert!(matches!(
            Expression::column("", DbType::Integer),
            Err(QueryError::InvalidArgument(_))
        ));
        assert!(Expression::qualified("", "Id", DbType::Integer).is_err());
    }

    #[test]
    fn test_parameter_has_one_entry() {
        let param = Expression::parameter(DbType::Integer, 18);
        assert_eq!(param.parameters().len(), 1);
        let (name, value) = param.parameters().iter().next().unwrap();
        assert_eq!(param.to_sql(), format!("@{}", name));
        assert_eq!(value.value, SqlValue::Integer(18));
    }

    #[test]
    fn test_custom_reads_back_supplied_parameters() {
        let expr = Expression::custom(
            "[Age] BETWEEN @low AND @high",
            DbType::Boolean,
            &["@low", "high"],
            &[DbType::Integer, DbType::Integer],
            vec![SqlValue::Integer(1), SqlValue::Integer(9)],
        )
        .unwrap();

        let mut supplied: Vec<(&str, DbType, &SqlValue)> = expr
            .parameters()
            .iter()
            .map(|(name, p)| (name.as_str(), p.db_type, &p.value))
            .collect();
        supplied.sort_by_key(|(name, _, _)| *name);
        assert_eq!(
            supplied,
            vec![
                ("high", DbType::Integer, &SqlValue::Integer(9)),
                ("low", DbType::Integer, &SqlValue::Integer(1)),
            ]
        );
        assert_eq!(expr.to_sql(), "[Age] BETWEEN @low AND @high");
    }

    #[test]
    fn test_custom_argument_errors() {
        let mismatched = Expression::custom(
            "@a",
            DbType::Integer,
            &["a"],
            &[],
            vec![SqlValue::Integer(1)],
        );
        assert!(matches!(mismatched, Err(QueryError::InvalidArgument(_))));

        let missing = Expression::custom("@a + @b", DbType::Integer, &["a"], &[DbType::Integer], vec![SqlValue::Integer(1)]);
        assert!(matches!(missing, Err(QueryError::InvalidArgument(_))));

        let unused = Expression::custom("1", DbType::Integer, &["a"], &[DbType::Integer], vec![SqlValue::Integer(1)]);
        assert!(matches!(unused, Err(QueryError::InvalidArgument(_))));

        let twice = Expression::custom(
            "@a",
            DbType::Integer,
            &["a", "@a"],
            &[DbType::Integer, DbType::Integer],
            vec![SqlValue::Integer(1), SqlValue::Integer(2)],
        );
        assert!(matches!(twice, Err(QueryError::InvalidArgument(_))));
    }

    #[test]
    fn test_custom_skips_literals_and_system_variables() {
        let expr = Expression::custom(
            "[Mail] = 'x@y.z' AND @@ROWCOUNT > @n",
            DbType::Boolean,
            &["n"],
            &[DbType::Integer],
            vec![SqlValue::Integer(0)],
        )
        .unwrap();
        assert_eq!(expr.to_sql(), "[Mail] = 'x@y.z' AND @@ROWCOUNT > @n");
        assert_eq!(expr.render(Dialect::Postgres).sql(), "[Mail] = 'x@y.z' AND @@ROWCOUNT > $1");
    }

    #[test]
    fn test_custom_skips_quoted_identifiers() {
        let expr = Expression::custom(
            "[Mail@Home] = @mail OR \"Alt@Mail\" = @mail",
            DbType::Boolean,
            &["mail"],
            &[DbType::Text],
            vec![SqlValue::from("a@b.c")],
        )
        .unwrap();
        assert_eq!(expr.parameters().len(), 1);
        assert_eq!(
            expr.render(Dialect::Postgres).sql(),
            "[Mail@Home] = $1 OR \"Alt@Mail\" = $1"
        );
    }

    #[test]
    fn test_detach_renames_every_parameter() {
        let original = Expression::parameter(DbType::Text, "a").append("+", "b");
        let copy = original.detach();

        let original_names: HashSet<_> = original.parameters().keys().collect();
        let copy_names: HashSet<_> = copy.parameters().keys().collect();
        assert_eq!(copy_names.len(), 2);
        assert!(original_names.is_disjoint(&copy_names));

        let mut values: Vec<_> = copy.parameters().values().map(|p| p.value.clone()).collect();
        values.sort_by_key(|v| v.key_fragment());
        assert_eq!(values, vec![SqlValue::from("a"), SqlValue::from("b")]);
    }

    #[test]
    fn test_append_merges_detached_copies_without_collisions() {
        let base = Expression::parameter(DbType::Integer, 1);
        let merged = base.detach().append("+", base.detach()).append("+", base);
        assert_eq!(merged.parameters().len(), 3);

        let statement = merged.render(Dialect::SqlServer);
        assert_eq!(statement.parameters().len(), 3);
    }

    #[test]
    fn test_append_renames_colliding_custom_names() {
        let left = Expression::custom("@x", DbType::Integer, &["x"], &[DbType::Integer], vec![SqlValue::Integer(1)]).unwrap();
        let right = Expression::custom("@x", DbType::Integer, &["x"], &[DbType::Integer], vec![SqlValue::Integer(2)]).unwrap();
        let sum = left.append("+", right);

        assert_eq!(sum.parameters().len(), 2);
        let statement = sum.render(Dialect::Postgres);
        assert_eq!(statement.sql(), "$1 + $2");
        assert_eq!(statement.parameters()[0].1.value, SqlValue::Integer(1));
        assert_eq!(statement.parameters()[1].1.value, SqlValue::Integer(2));
    }

    #[test]
    fn test_navigation_renders_marker_until_resolved() {
        let city = Expression::navigation(&["Customer", "Address"], "Address", "City", DbType::Text).unwrap();
        assert!(city.has_unresolved_paths());
        assert_eq!(city.to_sql(), "[_{Customer}_{Address}_Address].[City]");
    }
}
