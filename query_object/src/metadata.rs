//! Entity metadata
//!
//! Maps entity names to tables, columns and navigation properties. The
//! composition engine reads metadata only through [`MetadataProvider`];
//! [`EntityRegistry`] is the in-memory implementation, built once at startup
//! (usually from a TOML file) and passed around by reference.

use crate::errors::QueryError;
use crate::expression::Expression;
use crate::validation::{require_identifier, require_qualified};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use type_mapping::DbType;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnMeta {
    pub name: String,
    #[serde(rename = "type")]
    pub db_type: DbType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NavigationKind {
    /// The declaring entity holds the foreign key to the target's primary key
    Reference,
    /// The target holds the foreign key to the declaring entity's primary key
    Collection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Navigation {
    pub property: String,
    pub target: String,
    pub kind: NavigationKind,
    pub foreign_key: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityMeta {
    pub name: String,
    pub table: String,
    pub primary_key: String,
    /// Base entity whose columns live in the base's own table
    #[serde(default)]
    pub base: Option<String>,
    #[serde(default)]
    pub columns: Vec<ColumnMeta>,
    #[serde(default, rename = "navigation")]
    pub navigations: Vec<Navigation>,
}

impl EntityMeta {
    pub fn new(name: &str, table: &str, primary_key: &str) -> Self {
        Self {
            name: name.to_string(),
            table: table.to_string(),
            primary_key: primary_key.to_string(),
            base: None,
            columns: Vec::new(),
            navigations: Vec::new(),
        }
    }

    pub fn column(mut self, name: &str, db_type: DbType) -> Self {
        self.columns.push(ColumnMeta {
            name: name.to_string(),
            db_type,
        });
        self
    }

    pub fn reference(self, property: &str, target: &str, foreign_key: &str) -> Self {
        self.navigation(property, target, NavigationKind::Reference, foreign_key)
    }

    pub fn collection(self, property: &str, target: &str, foreign_key: &str) -> Self {
        self.navigation(property, target, NavigationKind::Collection, foreign_key)
    }

    fn navigation(mut self, property: &str, target: &str, kind: NavigationKind, foreign_key: &str) -> Self {
        self.navigations.push(Navigation {
            property: property.to_string(),
            target: target.to_string(),
            kind,
            foreign_key: foreign_key.to_string(),
        });
        self
    }

    pub fn extends(mut self, base: &str) -> Self {
        self.base = Some(base.to_string());
        self
    }

    /// Column declared on this entity's own table
    pub fn own_column(&self, name: &str) -> Option<&ColumnMeta> {
        self.columns.iter().find(|column| column.name == name)
    }

    /// Type of the primary key column
    pub(crate) fn key_type(&self) -> DbType {
        self.own_column(&self.primary_key)
            .map(|column| column.db_type)
            .unwrap_or(DbType::Integer)
    }
}

/// Metadata lookups used by sources and the cascade resolver
pub trait MetadataProvider {
    /// Fails with `ConfigurationNotFound` for an unknown entity
    fn entity(&self, name: &str) -> Result<&EntityMeta, QueryError>;

    /// The entity followed by its base entities, most derived first
    fn lineage(&self, name: &str) -> Result<Vec<&EntityMeta>, QueryError> {
        let first = self.entity(name)?;
        let mut lineage = vec![first];
        let mut current = first;
        while let Some(base) = &current.base {
            if lineage.iter().any(|meta| &meta.name == base) {
                return Err(QueryError::Registry(format!(
                    "inheritance cycle through entity '{}'",
                    base
                )));
            }
            current = self.entity(base)?;
            lineage.push(current);
        }
        Ok(lineage)
    }

    /// Navigation property of `entity` or one of its bases, with the entity
    /// that declares it
    fn navigation(&self, entity: &str, property: &str) -> Result<(&EntityMeta, &Navigation), QueryError> {
        for meta in self.lineage(entity)? {
            if let Some(navigation) = meta.navigations.iter().find(|n| n.property == property) {
                return Ok((meta, navigation));
            }
        }
        Err(QueryError::property_not_found(entity, property))
    }

    /// Column of `entity` or one of its bases, with the entity whose table
    /// holds it
    fn column_owner(&self, entity: &str, column: &str) -> Result<(&EntityMeta, &ColumnMeta), QueryError> {
        for meta in self.lineage(entity)? {
            if let Some(found) = meta.own_column(column) {
                return Ok((meta, found));
            }
        }
        Err(QueryError::property_not_found(entity, column))
    }

    /// Column reached from `root` by a dotted path such as
    /// `Customer.Address.City`. The result carries an unresolved navigation
    /// path until a cascade resolver qualifies it.
    fn column(&self, root: &str, path: &str) -> Result<Expression, QueryError> {
        let parts: Vec<&str> = path.split('.').collect();
        let (column, hops) = match parts.split_last() {
            Some((column, hops)) if !column.is_empty() => (*column, hops),
            _ => return Err(QueryError::invalid("column path cannot be empty")),
        };

        let mut current = self.entity(root)?;
        for hop in hops {
            let (_, navigation) = self.navigation(&current.name, hop)?;
            current = self.entity(&navigation.target)?;
        }

        let (owner, meta) = self.column_owner(&current.name, column)?;
        Expression::navigation(hops, &owner.table, &meta.name, meta.db_type)
    }
}

#[derive(Debug, Deserialize)]
struct RegistryFile {
    #[serde(default, rename = "entity")]
    entities: Vec<EntityMeta>,
}

/// In-memory metadata keyed by entity name
#[derive(Debug, Clone, Default)]
pub struct EntityRegistry {
    entities: HashMap<String, EntityMeta>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one entity. Cross-entity references are checked by [`validate`].
    ///
    /// [`validate`]: EntityRegistry::validate
    pub fn register(&mut self, meta: EntityMeta) -> Result<(), QueryError> {
        if self.entities.contains_key(&meta.name) {
            return Err(QueryError::Registry(format!(
                "entity '{}' is registered twice",
                meta.name
            )));
        }
        self.entities.insert(meta.name.clone(), meta);
        Ok(())
    }

    /// Registry holding `entities`, validated as a whole
    pub fn from_entities(entities: impl IntoIterator<Item = EntityMeta>) -> Result<Self, QueryError> {
        let mut registry = Self::new();
        for meta in entities {
            registry.register(meta)?;
        }
        registry.validate()?;
        Ok(registry)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, QueryError> {
        let file: RegistryFile =
            toml::from_str(content).map_err(|e| QueryError::Registry(e.to_string()))?;
        Self::from_entities(file.entities)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, QueryError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            QueryError::Registry(format!("failed to read {}: {}", path.display(), e))
        })?;
        let registry = Self::from_toml_str(&content)?;
        tracing::debug!(
            "Loaded {} entities from {}",
            registry.len(),
            path.display()
        );
        Ok(registry)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn entities(&self) -> impl Iterator<Item = &EntityMeta> {
        self.entities.values()
    }

    /// `table` plus the tables of every entity whose queries may read it,
    /// through a base entity or a navigation at any depth. Sorted.
    pub fn dependent_tables(&self, table: &str) -> Vec<String> {
        let mut affected: HashSet<&str> = self
            .entities
            .values()
            .filter(|meta| meta.table == table)
            .map(|meta| meta.name.as_str())
            .collect();

        loop {
            let before = affected.len();
            for meta in self.entities.values() {
                if affected.contains(meta.name.as_str()) {
                    continue;
                }
                let reads_affected = meta
                    .base
                    .iter()
                    .map(String::as_str)
                    .chain(meta.navigations.iter().map(|nav| nav.target.as_str()))
                    .any(|name| affected.contains(name));
                if reads_affected {
                    affected.insert(meta.name.as_str());
                }
            }
            if affected.len() == before {
                break;
            }
        }

        let mut tables: Vec<String> = affected
            .into_iter()
            .filter_map(|name| self.entities.get(name))
            .map(|meta| meta.table.clone())
            .chain(std::iter::once(table.to_string()))
            .collect();
        tables.sort();
        tables.dedup();
        tables
    }

    /// Check every entity against the rest of the registry
    pub fn validate(&self) -> Result<(), QueryError> {
        for meta in self.entities.values() {
            self.validate_entity(meta)?;
        }
        Ok(())
    }

    fn validate_entity(&self, meta: &EntityMeta) -> Result<(), QueryError> {
        let registry_error = |message: String| QueryError::Registry(format!("entity '{}': {}", meta.name, message));

        require_identifier("entity name", &meta.name)?;
        require_qualified("table name", &meta.table)?;
        require_identifier("primary key", &meta.primary_key)?;

        if meta.own_column(&meta.primary_key).is_none() {
            return Err(registry_error(format!(
                "primary key '{}' is not one of its columns",
                meta.primary_key
            )));
        }

        let mut columns = HashSet::new();
        for column in &meta.columns {
            require_identifier("column name", &column.name)?;
            if !columns.insert(column.name.as_str()) {
                return Err(registry_error(format!("column '{}' is declared twice", column.name)));
            }
        }

        if let Some(base) = &meta.base {
            if !self.entities.contains_key(base) {
                return Err(registry_error(format!("unknown base entity '{}'", base)));
            }
        }

        let lineage = self.lineage(&meta.name)?;
        let mut tables = HashSet::new();
        for entity in &lineage {
            if !tables.insert(entity.table.as_str()) {
                return Err(registry_error(format!(
                    "table '{}' appears twice in its inheritance chain",
                    entity.table
                )));
            }
        }

        let mut properties = HashSet::new();
        for navigation in &meta.navigations {
            require_identifier("navigation property", &navigation.property)?;
            if !properties.insert(navigation.property.as_str()) {
                return Err(registry_error(format!(
                    "navigation property '{}' is declared twice",
                    navigation.property
                )));
            }

            let target = self.entities.get(&navigation.target).ok_or_else(|| {
                registry_error(format!(
                    "navigation '{}' targets unknown entity '{}'",
                    navigation.property, navigation.target
                ))
            })?;

            let key_found = match navigation.kind {
                NavigationKind::Reference => self.column_owner(&meta.name, &navigation.foreign_key).is_ok(),
                NavigationKind::Collection => target.own_column(&navigation.foreign_key).is_some(),
            };
            if !key_found {
                return Err(registry_error(format!(
                    "foreign key '{}' of navigation '{}' not found",
                    navigation.foreign_key, navigation.property
                )));
            }
        }

        Ok(())
    }
}

impl MetadataProvider for EntityRegistry {
    fn entity(&self, name: &str) -> Result<&EntityMeta, QueryError> {
        self.entities
            .get(name)
            .ok_or_else(|| QueryError::entity_not_found(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REGISTRY: &str = r#"
[[entity]]
name = "Order"
table = "Order"
primary_key = "Id"
columns = [
    { name = "Id", type = "integer" },
    { name = "CustomerId", type = "integer" },
]

[[entity.navigation]]
property = "Customer"
target = "Customer"
kind = "reference"
foreign_key = "CustomerId"

[[entity]]
name = "Customer"
table = "Customer"
primary_key = "Id"
columns = [
    { name = "Id", type = "integer" },
    { name = "AddressId", type = "integer" },
]

[[entity.navigation]]
property = "Address"
target = "Address"
kind = "reference"
foreign_key = "AddressId"

[[entity.navigation]]
property = "Orders"
target = "Order"
kind = "collection"
foreign_key = "CustomerId"

[[entity]]
name = "Address"
table = "Address"
primary_key = "Id"
columns = [
    { name = "Id", type = "integer" },
    { name = "City", type = "text" },
]
"#;

    #[test]
    fn test_registry_from_toml() {
        let registry = EntityRegistry::from_toml_str(REGISTRY).unwrap();
        assert_eq!(registry.len(), 3);

        let (declaring, navigation) = registry.navigation("Customer", "Orders").unwrap();
        assert_eq!(declaring.name, "Customer");
        assert_eq!(navigation.kind, NavigationKind::Collection);
        assert_eq!(registry.entity("Address").unwrap().columns[1].db_type, DbType::Text);
    }

    #[test]
    fn test_unknown_entity_and_property() {
        let registry = EntityRegistry::from_toml_str(REGISTRY).unwrap();
        assert!(matches!(
            registry.entity("Invoice"),
            Err(QueryError::ConfigurationNotFound(_))
        ));
        assert!(matches!(
            registry.navigation("Order", "Invoice"),
            Err(QueryError::ConfigurationNotFound(_))
        ));
        assert!(matches!(
            registry.column("Order", "Customer.Zip"),
            Err(QueryError::ConfigurationNotFound(_))
        ));
    }

    #[test]
    fn test_column_path() {
        let registry = EntityRegistry::from_toml_str(REGISTRY).unwrap();
        let city = registry.column("Order", "Customer.Address.City").unwrap();
        assert_eq!(city.value_type(), DbType::Text);
        assert_eq!(city.to_sql(), "[_{Customer}_{Address}_Address].[City]");

        let own = registry.column("Order", "CustomerId").unwrap();
        assert!(own.has_unresolved_paths());
    }

    #[test]
    fn test_inherited_columns_and_navigations() {
        let registry = EntityRegistry::from_entities([
            EntityMeta::new("Person", "Person", "Id")
                .column("Id", DbType::Integer)
                .column("Name", DbType::Text)
                .column("HomeId", DbType::Integer)
                .reference("Home", "Address", "HomeId"),
            EntityMeta::new("Employee", "Employee", "Id")
                .column("Id", DbType::Integer)
                .extends("Person"),
            EntityMeta::new("Address", "Address", "Id").column("Id", DbType::Integer),
        ])
        .unwrap();

        let lineage: Vec<&str> = registry
            .lineage("Employee")
            .unwrap()
            .iter()
            .map(|meta| meta.name.as_str())
            .collect();
        assert_eq!(lineage, vec!["Employee", "Person"]);

        let (owner, _) = registry.column_owner("Employee", "Name").unwrap();
        assert_eq!(owner.table, "Person");
        let (declaring, _) = registry.navigation("Employee", "Home").unwrap();
        assert_eq!(declaring.name, "Person");
    }

    #[test]
    fn test_validation_failures() {
        let duplicate = EntityRegistry::from_entities([
            EntityMeta::new("A", "A", "Id").column("Id", DbType::Integer),
            EntityMeta::new("A", "A2", "Id").column("Id", DbType::Integer),
        ]);
        assert!(matches!(duplicate, Err(QueryError::Registry(_))));

        let missing_key = EntityRegistry::from_entities([EntityMeta::new("A", "A", "Id")]);
        assert!(matches!(missing_key, Err(QueryError::Registry(_))));

        let cycle = EntityRegistry::from_entities([
            EntityMeta::new("A", "A", "Id").column("Id", DbType::Integer).extends("B"),
            EntityMeta::new("B", "B", "Id").column("Id", DbType::Integer).extends("A"),
        ]);
        assert!(matches!(cycle, Err(QueryError::Registry(_))));

        let bad_target = EntityRegistry::from_entities([EntityMeta::new("A", "A", "Id")
            .column("Id", DbType::Integer)
            .column("BId", DbType::Integer)
            .reference("B", "B", "BId")]);
        assert!(matches!(bad_target, Err(QueryError::Registry(_))));

        let bad_key = EntityRegistry::from_entities([
            EntityMeta::new("A", "A", "Id")
                .column("Id", DbType::Integer)
                .collection("Bs", "B", "AId"),
            EntityMeta::new("B", "B", "Id").column("Id", DbType::Integer),
        ]);
        assert!(matches!(bad_key, Err(QueryError::Registry(_))));
    }

    #[test]
    fn test_dependent_tables_follow_navigations_and_bases() {
        let registry = EntityRegistry::from_entities([
            EntityMeta::new("Order", "Order", "Id")
                .column("Id", DbType::Integer)
                .column("CustomerId", DbType::Integer)
                .reference("Customer", "Customer", "CustomerId"),
            EntityMeta::new("Customer", "Customer", "Id")
                .column("Id", DbType::Integer)
                .column("AddressId", DbType::Integer)
                .reference("Address", "Address", "AddressId"),
            EntityMeta::new("Address", "Address", "Id").column("Id", DbType::Integer),
            EntityMeta::new("VipCustomer", "VipCustomer", "Id")
                .column("Id", DbType::Integer)
                .extends("Customer"),
            EntityMeta::new("Product", "Product", "Id").column("Id", DbType::Integer),
        ])
        .unwrap();

        assert_eq!(
            registry.dependent_tables("Address"),
            vec!["Address", "Customer", "Order", "VipCustomer"]
        );
        assert_eq!(registry.dependent_tables("Order"), vec!["Order"]);
        assert_eq!(registry.dependent_tables("Audit"), vec!["Audit"]);
    }

    #[test]
    fn test_malformed_toml() {
        assert!(matches!(
            EntityRegistry::from_toml_str("[[entity]]\nname = 1"),
            Err(QueryError::Registry(_))
        ));
    }
}
