//! Cascade join resolution
//!
//! Columns built from navigation paths (`Customer.Address.City` from an
//! `Order` source) carry the path instead of a table qualifier. The resolver
//! walks each path over entity metadata, adds one `INNER JOIN` per hop (and
//! per base table of every entity reached), and then qualifies each column
//! with the alias of the table that owns it.
//!
//! Aliases are derived from the path, so the same path always maps to the
//! same alias: `Order` → `Customer` → `Address` joins `Customer` as
//! `Order_Customer_Customer` and `Address` as
//! `Order_Customer_Address_Address`. A join whose alias already exists on
//! the source is not added again, which also makes a second run a no-op.

use crate::errors::QueryError;
use crate::expression::fragment::NavigationPath;
use crate::expression::Expression;
use crate::metadata::{EntityMeta, MetadataProvider, NavigationKind};
use crate::predicate::Predicate;
use crate::source::Join;
use std::collections::{HashMap, HashSet};

/// Generated alias component for a possibly schema-qualified name
fn alias_part(name: &str) -> String {
    name.replace('.', "_")
}

/// Naming scope of one entity occurrence in a statement
#[derive(Debug)]
pub(crate) struct EntityScope<'m> {
    meta: &'m EntityMeta,
    /// Base entities, nearest first
    ancestors: Vec<&'m EntityMeta>,
    prefix: String,
    alias: String,
}

impl<'m> EntityScope<'m> {
    /// Scope of the source's own entity, referred to as `alias`
    pub(crate) fn root(
        provider: &'m dyn MetadataProvider,
        entity: &str,
        alias: &str,
    ) -> Result<Self, QueryError> {
        Self::with_names(provider, entity, alias_part(alias), alias.to_string())
    }

    fn with_names(
        provider: &'m dyn MetadataProvider,
        entity: &str,
        prefix: String,
        alias: String,
    ) -> Result<Self, QueryError> {
        let mut lineage = provider.lineage(entity)?.into_iter();
        let meta = lineage
            .next()
            .ok_or_else(|| QueryError::entity_not_found(entity))?;
        Ok(Self {
            meta,
            ancestors: lineage.collect(),
            prefix,
            alias,
        })
    }

    /// Alias under which `table` of this entity's lineage is joined
    pub(crate) fn alias_for(&self, table: &str) -> String {
        if table == self.meta.table {
            self.alias.clone()
        } else {
            format!("{}_{}", self.prefix, alias_part(table))
        }
    }

    fn owns_table(&self, table: &str) -> bool {
        self.meta.table == table || self.ancestors.iter().any(|meta| meta.table == table)
    }

    /// Joins of each base table to the next more derived one on the shared key
    pub(crate) fn lineage_joins(&self) -> Result<Vec<Join>, QueryError> {
        let mut joins = Vec::with_capacity(self.ancestors.len());
        let mut derived = self.meta;
        for ancestor in &self.ancestors {
            let alias = self.alias_for(&ancestor.table);
            let on = Expression::qualified(&alias, &ancestor.primary_key, ancestor.key_type())?.eq(
                Expression::qualified(
                    &self.alias_for(&derived.table),
                    &derived.primary_key,
                    derived.key_type(),
                )?,
            );
            joins.push(Join::new(&ancestor.table, &alias, on)?);
            derived = ancestor;
        }
        Ok(joins)
    }

    /// Scope reached through `property`, with the join that connects it
    fn child(
        &self,
        provider: &'m dyn MetadataProvider,
        property: &str,
    ) -> Result<(EntityScope<'m>, Join), QueryError> {
        let (_, navigation) = provider.navigation(&self.meta.name, property)?;
        let target = provider.entity(&navigation.target)?;
        let prefix = format!("{}_{}", self.prefix, alias_part(property));
        let alias = format!("{}_{}", prefix, alias_part(&target.table));
        let next = Self::with_names(provider, &navigation.target, prefix, alias)?;

        let on = match navigation.kind {
            NavigationKind::Reference => {
                let (owner, key) = provider.column_owner(&self.meta.name, &navigation.foreign_key)?;
                Expression::qualified(&self.alias_for(&owner.table), &key.name, key.db_type)?.eq(
                    Expression::qualified(&next.alias, &target.primary_key, target.key_type())?,
                )
            }
            NavigationKind::Collection => {
                let key = target
                    .own_column(&navigation.foreign_key)
                    .ok_or_else(|| QueryError::property_not_found(&target.name, &navigation.foreign_key))?;
                Expression::qualified(&next.alias, &key.name, key.db_type)?.eq(
                    Expression::qualified(&self.alias, &self.meta.primary_key, self.meta.key_type())?,
                )
            }
        };

        let join = Join::new(&target.table, &next.alias, on)?;
        Ok((next, join))
    }
}

/// Joins to add and the alias each path resolves to
struct Plan {
    joins: Vec<Join>,
    aliases: HashSet<String>,
    resolved: HashMap<NavigationPath, String>,
}

impl Plan {
    fn add(&mut self, join: Join) {
        if self.aliases.insert(join.alias.clone()) {
            self.joins.push(join);
        }
    }

    fn add_all(&mut self, joins: Vec<Join>) {
        for join in joins {
            self.add(join);
        }
    }
}

/// Expands navigation paths of a predicate into joins on its source
pub struct CascadeResolver<'a> {
    provider: &'a dyn MetadataProvider,
}

impl<'a> CascadeResolver<'a> {
    pub fn new(provider: &'a dyn MetadataProvider) -> Self {
        Self { provider }
    }

    /// Resolve every path in the predicate's filter, grouping and ordering,
    /// and in `extras` (e.g. projected columns). Returns the number of joins
    /// added.
    ///
    /// Either the source gains all planned joins and every path is rewritten,
    /// or nothing changes.
    pub fn resolve<'e, I>(&self, predicate: &mut Predicate, extras: I) -> Result<usize, QueryError>
    where
        I: IntoIterator<Item = &'e mut Expression>,
    {
        let mut extras: Vec<&'e mut Expression> = extras.into_iter().collect();

        let mut paths: Vec<NavigationPath> = Vec::new();
        {
            let mut collect = |path: &NavigationPath| {
                if !paths.contains(path) {
                    paths.push(path.clone());
                }
            };
            predicate.for_each_column(&mut |column| {
                if let Some(path) = &column.path {
                    collect(path);
                }
            });
            for expr in extras.iter() {
                expr.for_each_column(&mut |column| {
                    if let Some(path) = &column.path {
                        collect(path);
                    }
                });
            }
        }
        if paths.is_empty() {
            return Ok(0);
        }

        let plan = self.plan(predicate, &paths)?;
        let added = plan.joins.len();
        let source = predicate
            .source_mut()
            .ok_or_else(|| QueryError::unsupported("navigation path without a source"))?;
        let root_table = source.table().to_string();
        source.attach(plan.joins)?;

        let resolved = plan.resolved;
        let mut qualify = |column: &mut crate::expression::fragment::ColumnRef| {
            let Some(path) = column.path.take() else {
                return;
            };
            match resolved.get(&path) {
                Some(alias) => {
                    column.qualifier = if *alias == root_table {
                        alias.split('.').map(str::to_string).collect()
                    } else {
                        vec![alias.clone()]
                    };
                }
                None => column.path = Some(path),
            }
        };
        predicate.for_each_column_mut(&mut qualify);
        for expr in extras.iter_mut() {
            expr.for_each_column_mut(&mut qualify);
        }

        tracing::debug!(
            "Resolved {} navigation paths with {} new joins",
            paths.len(),
            added
        );
        Ok(added)
    }

    fn plan(&self, predicate: &Predicate, paths: &[NavigationPath]) -> Result<Plan, QueryError> {
        let source = predicate
            .source()
            .ok_or_else(|| QueryError::unsupported("navigation path without a source"))?;
        let entity = source
            .entity()
            .ok_or_else(|| QueryError::unsupported("navigation path on a source without an entity"))?;

        if source.alias() != source.table() && paths.iter().any(|path| !path.hops.is_empty()) {
            return Err(QueryError::unsupported(format!(
                "cascade join from aliased root '{}' ({})",
                source.alias(),
                source.table()
            )));
        }

        let mut plan = Plan {
            joins: Vec::new(),
            aliases: source.aliases().map(str::to_string).collect(),
            resolved: HashMap::new(),
        };

        let root = EntityScope::root(self.provider, entity, source.alias())?;
        plan.add_all(root.lineage_joins()?);

        for path in paths {
            let mut scope = EntityScope::root(self.provider, entity, source.alias())?;
            for hop in &path.hops {
                let (next, join) = scope.child(self.provider, hop)?;
                plan.add(join);
                plan.add_all(next.lineage_joins()?);
                tracing::trace!("Hop {} resolved to {}", hop, next.alias);
                scope = next;
            }

            if !scope.owns_table(&path.table) {
                return Err(QueryError::ConfigurationNotFound(format!(
                    "table '{}' on entity '{}'",
                    path.table, scope.meta.name
                )));
            }
            plan.resolved.insert(path.clone(), scope.alias_for(&path.table));
        }

        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{EntityMeta, EntityRegistry};
    use crate::render::Dialect;
    use crate::source::Source;
    use type_mapping::DbType;

    fn registry() -> EntityRegistry {
        EntityRegistry::from_entities([
            EntityMeta::new("Order", "Order", "Id")
                .column("Id", DbType::Integer)
                .column("CustomerId", DbType::Integer)
                .column("Total", DbType::Double)
                .reference("Customer", "Customer", "CustomerId"),
            EntityMeta::new("Customer", "Customer", "Id")
                .column("Id", DbType::Integer)
                .column("AddressId", DbType::Integer)
                .reference("Address", "Address", "AddressId")
                .collection("Orders", "Order", "CustomerId"),
            EntityMeta::new("Address", "Address", "Id")
                .column("Id", DbType::Integer)
                .column("City", DbType::Text),
            EntityMeta::new("Party", "Party", "Id")
                .column("Id", DbType::Integer)
                .column("Name", DbType::Text),
            EntityMeta::new("Company", "Company", "Id")
                .column("Id", DbType::Integer)
                .extends("Party"),
            EntityMeta::new("Invoice", "Invoice", "Id")
                .column("Id", DbType::Integer)
                .column("IssuerId", DbType::Integer)
                .reference("Issuer", "Company", "IssuerId"),
        ])
        .unwrap()
    }

    #[test]
    fn test_two_hop_path() {
        let registry = registry();
        let city = registry.column("Order", "Customer.Address.City").unwrap();
        let mut predicate = city
            .eq("X")
            .with_source(Source::for_entity(&registry, "Order").unwrap());

        let added = CascadeResolver::new(&registry)
            .resolve(&mut predicate, std::iter::empty())
            .unwrap();
        assert_eq!(added, 2);

        let statement = predicate.render(Dialect::SqlServer);
        let name = &statement.parameters()[0].0;
        assert_eq!(
            statement.sql(),
            format!(
                "([Order] INNER JOIN [Customer] [Order_Customer_Customer] \
                 ON ([Order].[CustomerId] = [Order_Customer_Customer].[Id])) \
                 INNER JOIN [Address] [Order_Customer_Address_Address] \
                 ON ([Order_Customer_Customer].[AddressId] = [Order_Customer_Address_Address].[Id]) \
                 WHERE ([Order_Customer_Address_Address].[City] = @{})",
                name
            )
        );
    }

    #[test]
    fn test_shared_path_prefix_is_joined_once() {
        let registry = registry();
        let first = registry.column("Order", "Customer.Address.City").unwrap().eq("X");
        let second = registry.column("Order", "Customer.Address.City").unwrap().ne("Y");
        let third = registry.column("Order", "Customer.AddressId").unwrap().is_not_null();
        let mut predicate = (first | second & third)
            .with_source(Source::for_entity(&registry, "Order").unwrap());

        let added = CascadeResolver::new(&registry)
            .resolve(&mut predicate, std::iter::empty())
            .unwrap();
        assert_eq!(added, 2);
        assert_eq!(predicate.source().unwrap().joins().len(), 2);
        assert!(!predicate.has_unresolved_paths());
    }

    #[test]
    fn test_second_run_is_a_no_op() {
        let registry = registry();
        let mut predicate = registry
            .column("Order", "Customer.Address.City")
            .unwrap()
            .eq("X")
            .with_source(Source::for_entity(&registry, "Order").unwrap());

        let resolver = CascadeResolver::new(&registry);
        resolver.resolve(&mut predicate, std::iter::empty()).unwrap();
        let once = predicate.render(Dialect::SqlServer);
        let added = resolver.resolve(&mut predicate, std::iter::empty()).unwrap();

        assert_eq!(added, 0);
        assert_eq!(predicate.render(Dialect::SqlServer), once);
    }

    #[test]
    fn test_collection_hop_joins_on_target_key() {
        let registry = registry();
        let mut predicate = registry
            .column("Customer", "Orders.Total")
            .unwrap()
            .gt(100.0)
            .with_source(Source::for_entity(&registry, "Customer").unwrap());
        CascadeResolver::new(&registry)
            .resolve(&mut predicate, std::iter::empty())
            .unwrap();

        let join = &predicate.source().unwrap().joins()[0];
        assert_eq!(join.alias(), "Customer_Orders_Order");
        assert_eq!(
            join.on().to_sql(),
            "([Customer_Orders_Order].[CustomerId] = [Customer].[Id])"
        );
    }

    #[test]
    fn test_inherited_target_columns() {
        let registry = registry();
        let mut predicate = registry
            .column("Invoice", "Issuer.Name")
            .unwrap()
            .eq("Acme")
            .with_source(Source::for_entity(&registry, "Invoice").unwrap());
        CascadeResolver::new(&registry)
            .resolve(&mut predicate, std::iter::empty())
            .unwrap();

        let aliases: Vec<&str> = predicate.source().unwrap().aliases().collect();
        assert_eq!(
            aliases,
            vec!["Invoice", "Invoice_Issuer_Company", "Invoice_Issuer_Party"]
        );
        let party = &predicate.source().unwrap().joins()[1];
        assert_eq!(
            party.on().to_sql(),
            "([Invoice_Issuer_Party].[Id] = [Invoice_Issuer_Company].[Id])"
        );
        assert!(predicate.to_sql().contains("WHERE ([Invoice_Issuer_Party].[Name] = @"));
    }

    #[test]
    fn test_root_base_tables_come_from_the_source() {
        let registry = registry();
        let source = Source::for_entity(&registry, "Company").unwrap();
        assert_eq!(
            source.to_sql(),
            "[Company] INNER JOIN [Party] [Company_Party] ON ([Company_Party].[Id] = [Company].[Id])"
        );

        let mut predicate = registry
            .column("Company", "Name")
            .unwrap()
            .eq("Acme")
            .with_source(source);
        let added = CascadeResolver::new(&registry)
            .resolve(&mut predicate, std::iter::empty())
            .unwrap();
        assert_eq!(added, 0);
        assert!(predicate.to_sql().contains("WHERE ([Company_Party].[Name] = @"));
    }

    #[test]
    fn test_aliased_root_is_unsupported() {
        let registry = registry();
        let mut predicate = registry
            .column("Order", "Customer.Address.City")
            .unwrap()
            .eq("X")
            .with_source(Source::for_entity_as(&registry, "Order", "o").unwrap());

        let err = CascadeResolver::new(&registry)
            .resolve(&mut predicate, std::iter::empty())
            .unwrap_err();
        assert!(matches!(err, QueryError::Unsupported(_)));
        assert!(predicate.source().unwrap().joins().is_empty());
        assert!(predicate.has_unresolved_paths());
    }

    #[test]
    fn test_aliased_root_without_hops_is_qualified_with_alias() {
        let registry = registry();
        let mut predicate = registry
            .column("Order", "Total")
            .unwrap()
            .gt(1.0)
            .with_source(Source::for_entity_as(&registry, "Order", "o").unwrap());
        CascadeResolver::new(&registry)
            .resolve(&mut predicate, std::iter::empty())
            .unwrap();
        assert!(predicate.to_sql().starts_with("[Order] [o] WHERE ([o].[Total] > @"));
    }

    #[test]
    fn test_unknown_property_leaves_predicate_unchanged() {
        let registry = registry();
        let path = Expression::navigation(&["Customer", "Nope"], "Address", "City", DbType::Text).unwrap();
        let mut predicate = path
            .eq("X")
            .with_source(Source::for_entity(&registry, "Order").unwrap());

        let err = CascadeResolver::new(&registry)
            .resolve(&mut predicate, std::iter::empty())
            .unwrap_err();
        assert!(matches!(err, QueryError::ConfigurationNotFound(_)));
        assert!(predicate.source().unwrap().joins().is_empty());
    }

    #[test]
    fn test_paths_require_an_entity_source() {
        let registry = registry();
        let mut predicate = registry
            .column("Order", "Customer.Address.City")
            .unwrap()
            .eq("X")
            .with_source(Source::new("Order").unwrap());
        assert!(matches!(
            CascadeResolver::new(&registry).resolve(&mut predicate, std::iter::empty()),
            Err(QueryError::Unsupported(_))
        ));
    }

    #[test]
    fn test_extras_are_rewritten_consistently() {
        let registry = registry();
        let mut predicate = registry
            .column("Order", "Customer.Address.City")
            .unwrap()
            .eq("X")
            .with_source(Source::for_entity(&registry, "Order").unwrap());
        let mut projected = registry.column("Order", "Customer.Address.City").unwrap();

        CascadeResolver::new(&registry)
            .resolve(&mut predicate, [&mut projected])
            .unwrap();
        assert_eq!(projected.to_sql(), "[Order_Customer_Address_Address].[City]");
    }
}
