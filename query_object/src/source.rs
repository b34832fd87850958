//! Table sources and their join graph

use crate::errors::QueryError;
use crate::metadata::MetadataProvider;
use crate::predicate::Predicate;
use crate::render::{Dialect, RenderContext};
use crate::resolver::EntityScope;
use crate::statement::Statement;
use crate::validation::require_qualified;
use std::collections::HashSet;

/// An `INNER JOIN` of `table` under `alias`
#[derive(Debug)]
pub struct Join {
    pub(crate) table: String,
    pub(crate) alias: String,
    pub(crate) on: Predicate,
}

impl Join {
    /// Validated join entry. The condition must be non-empty and must not
    /// carry a source of its own.
    pub fn new(table: &str, alias: &str, on: Predicate) -> Result<Self, QueryError> {
        let table = require_qualified("join table name", table)?;
        let alias = require_qualified("join alias", alias)?;
        if on.is_empty() {
            return Err(QueryError::invalid(format!(
                "join condition for '{}' cannot be empty",
                alias
            )));
        }
        if on.source().is_some() {
            return Err(QueryError::unsupported(format!(
                "join condition for '{}' is bound to a source",
                alias
            )));
        }
        Ok(Self { table, alias, on })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    pub fn on(&self) -> &Predicate {
        &self.on
    }

    fn detach(&self) -> Join {
        Join {
            table: self.table.clone(),
            alias: self.alias.clone(),
            on: self.on.detach(),
        }
    }
}

/// Base table or view plus the joins added to it, in insertion order
#[derive(Debug)]
pub struct Source {
    table: String,
    alias: String,
    entity: Option<String>,
    joins: Vec<Join>,
}

impl Source {
    /// Source referred to by its own table name
    pub fn new(table: &str) -> Result<Self, QueryError> {
        let table = require_qualified("table name", table)?;
        Ok(Self {
            alias: table.clone(),
            table,
            entity: None,
            joins: Vec::new(),
        })
    }

    pub fn aliased(table: &str, alias: &str) -> Result<Self, QueryError> {
        let mut source = Self::new(table)?;
        source.alias = require_qualified("alias", alias)?;
        Ok(source)
    }

    /// Source for a mapped entity, joined to the tables of its base entities
    pub fn for_entity(provider: &dyn MetadataProvider, entity: &str) -> Result<Self, QueryError> {
        let table = provider.entity(entity)?.table.clone();
        Self::for_entity_as(provider, entity, &table)
    }

    pub fn for_entity_as(
        provider: &dyn MetadataProvider,
        entity: &str,
        alias: &str,
    ) -> Result<Self, QueryError> {
        let meta = provider.entity(entity)?;
        let mut source = Self::aliased(&meta.table, alias)?;
        let scope = EntityScope::root(provider, entity, &source.alias)?;
        source.attach(scope.lineage_joins()?)?;
        source.entity = Some(meta.name.clone());
        Ok(source)
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    /// Entity the source was built for, if any
    pub fn entity(&self) -> Option<&str> {
        self.entity.as_deref()
    }

    pub fn joins(&self) -> &[Join] {
        &self.joins
    }

    /// The source's own alias followed by every join alias
    pub fn aliases(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.alias.as_str()).chain(self.joins.iter().map(|join| join.alias.as_str()))
    }

    pub fn contains_alias(&self, alias: &str) -> bool {
        self.aliases().any(|existing| existing == alias)
    }

    /// Add `INNER JOIN table alias ON on`. On error the source is unchanged.
    pub fn join(&mut self, table: &str, alias: &str, on: Predicate) -> Result<(), QueryError> {
        let join = Join::new(table, alias, on)?;
        self.attach(vec![join])
    }

    /// Join another source under its own alias, bringing its joins along
    /// (e.g. the base tables of an entity source). All or nothing.
    pub fn join_source(&mut self, other: Source, on: Predicate) -> Result<(), QueryError> {
        let Source {
            table,
            alias,
            joins,
            ..
        } = other;
        let mut entries = vec![Join::new(&table, &alias, on)?];
        entries.extend(joins);
        self.attach(entries)
    }

    /// Append validated joins, failing without changes on any alias clash
    pub(crate) fn attach(&mut self, joins: Vec<Join>) -> Result<(), QueryError> {
        {
            let mut seen: HashSet<&str> = self.aliases().collect();
            for join in &joins {
                if !seen.insert(join.alias.as_str()) {
                    return Err(QueryError::AliasConflict {
                        alias: join.alias.clone(),
                    });
                }
            }
        }

        for join in joins {
            tracing::debug!(
                "Join added to {}: {} AS {}",
                self.alias,
                join.table,
                join.alias
            );
            self.joins.push(join);
        }
        Ok(())
    }

    pub fn has_unresolved_paths(&self) -> bool {
        self.joins.iter().any(|join| join.on.has_unresolved_paths())
    }

    /// Independent copy with fresh parameter names in every join condition
    pub fn detach(&self) -> Source {
        Source {
            table: self.table.clone(),
            alias: self.alias.clone(),
            entity: self.entity.clone(),
            joins: self.joins.iter().map(Join::detach).collect(),
        }
    }

    pub fn render(&self, dialect: Dialect) -> Statement {
        let mut ctx = RenderContext::new(dialect);
        let sql = self.render_into(&mut ctx);
        Statement::new(sql, ctx.into_parameters(), dialect)
    }

    pub fn to_sql(&self) -> String {
        self.render(Dialect::default()).sql
    }

    /// Each join after the first nests everything before it in parentheses
    pub(crate) fn render_into(&self, ctx: &mut RenderContext) -> String {
        let dialect = ctx.dialect();
        let mut sql = dialect.quote_path(&self.table);
        if self.alias != self.table {
            sql.push(' ');
            sql.push_str(&dialect.quote_path(&self.alias));
        }

        for (i, join) in self.joins.iter().enumerate() {
            if i > 0 {
                sql = format!("({})", sql);
            }
            let on = join.on.render_filter(ctx);
            sql.push_str(&format!(
                " INNER JOIN {} {} ON {}",
                dialect.quote_path(&join.table),
                dialect.quote_path(&join.alias),
                on
            ));
        }
        sql
    }
}
