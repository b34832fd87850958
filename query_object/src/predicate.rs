//! Boolean predicates
//!
//! A [`Predicate`] is a boolean expression that may additionally carry the
//! [`Source`] it filters, a grouping and an ordering. With a source it renders
//! as the tail of a statement (`<source> [GROUP BY .. HAVING ..|WHERE ..]
//! [ORDER BY ..]`); without one it renders as a bare condition.

use crate::cache_key::CacheKey;
use crate::errors::QueryError;
use crate::expression::fragment::{ColumnRef, Fragment};
use crate::expression::Expression;
use crate::ordering::SortOrder;
use crate::param::{ParamName, Parameter};
use crate::render::{Dialect, RenderContext};
use crate::source::Source;
use crate::statement::Statement;
use std::collections::BTreeMap;
use std::fmt;
use std::ops::{BitAnd, BitOr, Not};
use type_mapping::{DbType, SqlValue};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Connective {
    And,
    Or,
}

impl Connective {
    fn keyword(self) -> &'static str {
        match self {
            Connective::And => " AND ",
            Connective::Or => " OR ",
        }
    }
}

/// One ORDER BY item
#[derive(Debug)]
pub struct OrderItem {
    pub(crate) expr: Expression,
    pub(crate) order: SortOrder,
}

impl OrderItem {
    pub fn expression(&self) -> &Expression {
        &self.expr
    }

    pub fn order(&self) -> SortOrder {
        self.order
    }
}

#[derive(Debug)]
pub struct Predicate {
    pub(crate) expr: Expression,
    negated: bool,
    /// Top-level connective of `expr`, if it joins more than one operand
    connective: Option<Connective>,
    pub(crate) source: Option<Source>,
    pub(crate) group_by: Vec<Expression>,
    pub(crate) order_by: Vec<OrderItem>,
}

impl Default for Predicate {
    fn default() -> Self {
        Self::new()
    }
}

impl Predicate {
    /// Empty predicate; matches every row
    pub fn new() -> Self {
        Self::from_expression(Expression::empty(DbType::Boolean))
    }

    /// Boolean expression used as a condition
    pub fn from_expression(expr: Expression) -> Self {
        Self {
            expr: expr.with_type(DbType::Boolean),
            negated: false,
            connective: None,
            source: None,
            group_by: Vec::new(),
            order_by: Vec::new(),
        }
    }

    /// Condition from raw SQL with `@name` parameters, see [`Expression::custom`]
    pub fn custom(
        sql: &str,
        names: &[&str],
        types: &[DbType],
        values: Vec<SqlValue>,
    ) -> Result<Self, QueryError> {
        Expression::custom(sql, DbType::Boolean, names, types, values).map(Self::from_expression)
    }

    pub fn is_empty(&self) -> bool {
        self.expr.is_empty()
    }

    pub fn is_negated(&self) -> bool {
        self.negated
    }

    /// `self AND other`; a no-op when `other` is empty.
    ///
    /// Only `other`'s condition is taken over; its source, grouping and
    /// ordering are dropped.
    pub fn and(self, other: Predicate) -> Predicate {
        self.combine(Connective::And, other)
    }

    /// `self OR other`; a no-op when `other` is empty
    pub fn or(self, other: Predicate) -> Predicate {
        self.combine(Connective::Or, other)
    }

    fn combine(mut self, connective: Connective, other: Predicate) -> Predicate {
        if other.is_empty() {
            return self;
        }

        let negation_written = self.materialize_negation();
        let had_content = !self.expr.is_empty();
        // A bare receiver (custom SQL, a different connective) is grouped
        // so the new connective applies to all of it
        if had_content
            && !negation_written
            && self.connective != Some(connective)
            && !self.expr.fragment.is_wrapped()
        {
            let body = std::mem::take(&mut self.expr.fragment);
            self.expr.fragment = body.wrapped();
        }

        let Predicate {
            expr,
            negated,
            source,
            group_by,
            order_by,
            ..
        } = other;
        if source.is_some() || !group_by.is_empty() || !order_by.is_empty() {
            tracing::debug!("Combined predicate drops the source, grouping and ordering of its operand");
        }

        let fragment = self.expr.absorb(expr);
        let fragment = if fragment.is_wrapped() {
            fragment
        } else {
            fragment.wrapped()
        };

        if had_content {
            self.expr.fragment.push_sql(connective.keyword());
            self.connective = Some(connective);
        }
        if negated {
            self.expr.fragment.push_sql("NOT ");
        }
        self.expr.fragment.extend(fragment);
        self
    }

    /// Write a pending negation into the text, reporting whether there was one
    fn materialize_negation(&mut self) -> bool {
        if !self.negated {
            return false;
        }
        self.negated = false;
        self.connective = None;

        let body = std::mem::take(&mut self.expr.fragment);
        self.expr.fragment = if body.is_empty() {
            Fragment::sql("(1=0)")
        } else {
            let mut fragment = Fragment::sql("NOT ");
            fragment.extend(if body.is_wrapped() { body } else { body.wrapped() });
            fragment
        };
        true
    }

    /// Toggle negation; applied when rendering
    pub fn negate(&mut self) {
        self.negated = !self.negated;
    }

    pub fn with_source(mut self, source: Source) -> Self {
        self.source = Some(source);
        self
    }

    pub fn source(&self) -> Option<&Source> {
        self.source.as_ref()
    }

    pub fn source_mut(&mut self) -> Option<&mut Source> {
        self.source.as_mut()
    }

    pub fn group_by(mut self, expr: Expression) -> Self {
        self.group_by.push(expr);
        self
    }

    pub fn order_by(mut self, expr: Expression, order: SortOrder) -> Self {
        self.order_by.push(OrderItem { expr, order });
        self
    }

    pub fn grouping(&self) -> &[Expression] {
        &self.group_by
    }

    pub fn ordering(&self) -> &[OrderItem] {
        &self.order_by
    }

    /// Parameters of the condition itself
    pub fn parameters(&self) -> &BTreeMap<ParamName, Parameter> {
        self.expr.parameters()
    }

    /// Independent copy: fresh parameter names throughout, including the
    /// source's join conditions and the grouping and ordering expressions
    pub fn detach(&self) -> Predicate {
        Predicate {
            expr: self.expr.detach(),
            negated: self.negated,
            connective: self.connective,
            source: self.source.as_ref().map(Source::detach),
            group_by: self.group_by.iter().map(Expression::detach).collect(),
            order_by: self
                .order_by
                .iter()
                .map(|item| OrderItem {
                    expr: item.expr.detach(),
                    order: item.order,
                })
                .collect(),
        }
    }

    pub fn has_unresolved_paths(&self) -> bool {
        let mut found = false;
        self.for_each_column(&mut |column| found |= column.path.is_some());
        found
    }

    pub fn render(&self, dialect: Dialect) -> Statement {
        let mut ctx = RenderContext::new(dialect);
        let sql = self.render_into(&mut ctx);
        Statement::new(sql, ctx.into_parameters(), dialect)
    }

    pub fn to_sql(&self) -> String {
        self.render(Dialect::default()).sql
    }

    /// Key shared only by predicates with the same shape and the same values
    pub fn cache_key(&self, connection_id: &str) -> CacheKey {
        let mut ctx = RenderContext::wildcard(Dialect::default());
        let sql = self.render_into(&mut ctx);
        CacheKey::from_rendered(&sql, &ctx.into_parameters(), connection_id)
    }

    pub(crate) fn render_into(&self, ctx: &mut RenderContext) -> String {
        match self.source {
            Some(_) => self.render_clauses(ctx, true),
            None => self.render_filter(ctx),
        }
    }

    /// Bare condition: `1=1` when empty, `NOT (..)` when negated
    pub(crate) fn render_filter(&self, ctx: &mut RenderContext) -> String {
        if self.expr.is_empty() {
            return if self.negated { "1=0" } else { "1=1" }.to_string();
        }

        let sql = self.expr.render_into(ctx);
        match (self.negated, self.expr.fragment.is_wrapped()) {
            (false, _) => sql,
            (true, true) => format!("NOT {}", sql),
            (true, false) => format!("NOT ({})", sql),
        }
    }

    /// Source followed by grouping, filter and (optionally) ordering
    pub(crate) fn render_clauses(&self, ctx: &mut RenderContext, with_order: bool) -> String {
        let mut sql = match &self.source {
            Some(source) => source.render_into(ctx),
            None => String::new(),
        };
        let has_filter = !self.expr.is_empty() || self.negated;

        if self.group_by.is_empty() {
            if has_filter {
                sql.push_str(" WHERE ");
                sql.push_str(&self.render_filter(ctx));
            }
        } else {
            let columns: Vec<String> = self
                .group_by
                .iter()
                .map(|expr| expr.render_into(ctx))
                .collect();
            sql.push_str(" GROUP BY ");
            sql.push_str(&columns.join(", "));
            if has_filter {
                sql.push_str(" HAVING ");
                sql.push_str(&self.render_filter(ctx));
            }
        }

        if with_order && !self.order_by.is_empty() {
            let items: Vec<String> = self
                .order_by
                .iter()
                .map(|item| format!("{} {}", item.expr.render_into(ctx), item.order.to_sql()))
                .collect();
            sql.push_str(" ORDER BY ");
            sql.push_str(&items.join(", "));
        }

        sql.trim_start().to_string()
    }

    pub(crate) fn for_each_column(&self, f: &mut dyn FnMut(&ColumnRef)) {
        self.expr.for_each_column(f);
        for expr in &self.group_by {
            expr.for_each_column(f);
        }
        for item in &self.order_by {
            item.expr.for_each_column(f);
        }
    }

    pub(crate) fn for_each_column_mut(&mut self, f: &mut dyn FnMut(&mut ColumnRef)) {
        self.expr.for_each_column_mut(f);
        for expr in &mut self.group_by {
            expr.for_each_column_mut(f);
        }
        for item in &mut self.order_by {
            item.expr.for_each_column_mut(f);
        }
    }

    fn wildcard_sql(&self) -> String {
        let mut ctx = RenderContext::wildcard(Dialect::default());
        self.render_into(&mut ctx)
    }
}

/// Predicates are equal when they render the same text with every
/// placeholder replaced by `?`; parameter names and values are not compared.
impl PartialEq for Predicate {
    fn eq(&self, other: &Self) -> bool {
        self.wildcard_sql() == other.wildcard_sql()
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_sql())
    }
}

impl BitAnd for Predicate {
    type Output = Predicate;

    fn bitand(self, rhs: Predicate) -> Predicate {
        Predicate::new().and(self).and(rhs)
    }
}

impl BitOr for Predicate {
    type Output = Predicate;

    fn bitor(self, rhs: Predicate) -> Predicate {
        Predicate::new().or(self).or(rhs)
    }
}

impl Not for Predicate {
    type Output = Predicate;

    fn not(mut self) -> Predicate {
        self.negate();
        self
    }
}
