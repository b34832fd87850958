//! Query sections
//!
//! A [`QuerySection`] combines a predicate bound to a source with a
//! projection and pagination, and renders the final `SELECT`.

pub mod pagination;

use crate::cache_key::CacheKey;
use crate::errors::QueryError;
use crate::expression::Expression;
use crate::metadata::MetadataProvider;
use crate::predicate::Predicate;
use crate::render::{Dialect, RenderContext};
use crate::resolver::CascadeResolver;
use crate::source::Source;
use crate::statement::Statement;
use crate::validation::require_identifier;
pub use pagination::Pagination;

/// One projected expression, optionally named
#[derive(Debug)]
pub struct SelectItem {
    pub(crate) expr: Expression,
    pub(crate) alias: Option<String>,
}

impl SelectItem {
    pub fn expression(&self) -> &Expression {
        &self.expr
    }

    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }
}

#[derive(Debug)]
pub struct QuerySection {
    predicate: Predicate,
    projection: Vec<SelectItem>,
    distinct: bool,
    pagination: Pagination,
}

impl QuerySection {
    /// Section over a predicate that carries its source
    pub fn new(predicate: Predicate) -> Result<Self, QueryError> {
        if predicate.source().is_none() {
            return Err(QueryError::invalid("query predicate has no source"));
        }
        Ok(Self {
            predicate,
            projection: Vec::new(),
            distinct: false,
            pagination: Pagination::new(),
        })
    }

    /// Unfiltered section over `source`
    pub fn from_source(source: Source) -> Self {
        Self {
            predicate: Predicate::new().with_source(source),
            projection: Vec::new(),
            distinct: false,
            pagination: Pagination::new(),
        }
    }

    /// AND `condition` into the filter
    pub fn filter(mut self, condition: Predicate) -> Self {
        self.predicate = std::mem::take(&mut self.predicate).and(condition);
        self
    }

    pub fn select(mut self, expr: Expression) -> Self {
        self.projection.push(SelectItem { expr, alias: None });
        self
    }

    pub fn select_as(mut self, expr: Expression, alias: &str) -> Result<Self, QueryError> {
        let alias = require_identifier("column alias", alias)?;
        self.projection.push(SelectItem {
            expr,
            alias: Some(alias),
        });
        Ok(self)
    }

    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    pub fn paginate(mut self, pagination: Pagination) -> Result<Self, QueryError> {
        pagination.validate()?;
        self.pagination = pagination;
        Ok(self)
    }

    pub fn predicate(&self) -> &Predicate {
        &self.predicate
    }

    pub fn predicate_mut(&mut self) -> &mut Predicate {
        &mut self.predicate
    }

    pub fn projection(&self) -> &[SelectItem] {
        &self.projection
    }

    pub fn pagination(&self) -> &Pagination {
        &self.pagination
    }

    pub fn source(&self) -> Option<&Source> {
        self.predicate.source()
    }

    /// Expand navigation paths in the filter, grouping, ordering and
    /// projection into joins. Returns the number of joins added.
    pub fn resolve(&mut self, provider: &dyn MetadataProvider) -> Result<usize, QueryError> {
        CascadeResolver::new(provider).resolve(
            &mut self.predicate,
            self.projection.iter_mut().map(|item| &mut item.expr),
        )
    }

    pub fn to_statement(&self, dialect: Dialect) -> Result<Statement, QueryError> {
        let mut ctx = RenderContext::new(dialect);
        let sql = self.render_select(&mut ctx)?;
        tracing::debug!("Prepared statement: {}", sql);
        Ok(Statement::new(sql, ctx.into_parameters(), dialect))
    }

    /// `SELECT COUNT(*)` over the same rows, ignoring ordering and pagination
    pub fn count_statement(&self, dialect: Dialect) -> Result<Statement, QueryError> {
        let mut ctx = RenderContext::new(dialect);
        let source = self.renderable_source()?;

        let sql = if self.distinct || !self.predicate.group_by.is_empty() {
            let inner = if self.distinct {
                format!("DISTINCT {}", self.render_projection(&mut ctx, source))
            } else {
                format!("1 AS {}", dialect.quote_ident("one"))
            };
            let body = self.predicate.render_clauses(&mut ctx, false);
            format!(
                "SELECT COUNT(*) FROM (SELECT {} FROM {}) AS {}",
                inner,
                body,
                dialect.quote_ident("counted")
            )
        } else {
            format!(
                "SELECT COUNT(*) FROM {}",
                self.predicate.render_clauses(&mut ctx, false)
            )
        };

        Ok(Statement::new(sql, ctx.into_parameters(), dialect))
    }

    /// Key for caching this query's result, see [`CacheKey`]
    pub fn cache_key(&self, dialect: Dialect, connection_id: &str) -> Result<CacheKey, QueryError> {
        let mut ctx = RenderContext::wildcard(dialect);
        let sql = self.render_select(&mut ctx)?;
        Ok(CacheKey::from_rendered(&sql, &ctx.into_parameters(), connection_id))
    }

    fn renderable_source(&self) -> Result<&Source, QueryError> {
        let source = self
            .predicate
            .source()
            .ok_or_else(|| QueryError::invalid("query predicate has no source"))?;

        let unresolved = self.predicate.has_unresolved_paths()
            || source.has_unresolved_paths()
            || self.projection.iter().any(|item| item.expr.has_unresolved_paths());
        if unresolved {
            return Err(QueryError::unsupported(
                "query has unresolved navigation paths; resolve it first",
            ));
        }
        Ok(source)
    }

    fn render_projection(&self, ctx: &mut RenderContext, source: &Source) -> String {
        let dialect = ctx.dialect();
        if self.projection.is_empty() {
            return format!("{}.*", dialect.quote_path(source.alias()));
        }

        self.projection
            .iter()
            .map(|item| {
                let sql = item.expr.render_into(ctx);
                match &item.alias {
                    Some(alias) => format!("{} AS {}", sql, dialect.quote_ident(alias)),
                    None => sql,
                }
            })
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn render_select(&self, ctx: &mut RenderContext) -> Result<String, QueryError> {
        let source = self.renderable_source()?;
        let dialect = ctx.dialect();

        let mut sql = String::from("SELECT ");
        if self.distinct {
            sql.push_str("DISTINCT ");
        }
        if let Some(top) = self.pagination.top_clause(dialect) {
            sql.push_str(&top);
            sql.push(' ');
        }
        sql.push_str(&self.render_projection(ctx, source));
        sql.push_str(" FROM ");
        sql.push_str(&self.predicate.render_clauses(ctx, true));

        let suffix = self
            .pagination
            .suffix(dialect, !self.predicate.order_by.is_empty());
        if !suffix.is_empty() {
            sql.push(' ');
            sql.push_str(&suffix);
        }
        Ok(sql)
    }
}
