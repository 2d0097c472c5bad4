//! Reading catalog metadata into a [`Schema`].

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use querymind_sqlparse::schema::{SqlForeignKey, SqlTable};
use tracing::debug;

use super::{Column, ForeignKeyTarget, Schema, Table};
use crate::error::{IntrospectionError, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Table,
    View,
    /// Store-internal bookkeeping tables.
    SystemTable,
    VirtualTable,
    /// Indexes, triggers and anything else the catalog lists.
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogObject {
    pub name: String,
    pub kind: ObjectKind,
}

/// Catalog metadata exposed by a relational store.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// All catalog objects, in discovery order.
    async fn objects(&self) -> Result<Vec<CatalogObject>, StoreError>;

    /// Columns, primary keys and foreign-key edges of a single table.
    async fn describe(&self, table: &str) -> Result<SqlTable, StoreError>;
}

pub struct SchemaIntrospector<C> {
    catalog: C,
}

impl<C> SchemaIntrospector<C>
where
    C: Catalog,
{
    pub const fn new(catalog: C) -> Self {
        Self { catalog }
    }

    /// Read every base table of the catalog. Views, system tables and tables without columns are
    /// skipped; the first catalog error aborts the whole read.
    pub async fn introspect(&self) -> Result<Schema, IntrospectionError> {
        let mut definitions = Vec::new();

        for object in self.catalog.objects().await? {
            if object.kind != ObjectKind::Table {
                continue;
            }

            let definition = self.catalog.describe(&object.name).await?;

            if definition.columns.is_empty() {
                debug!("Skipping table `{}` without columns", object.name);
                continue;
            }

            definitions.push((object.name, definition));
        }

        let tables = definitions
            .iter()
            .map(|(name, definition)| merge_table(name, definition, &definitions))
            .collect::<Vec<_>>();

        debug!("Introspected {} tables", tables.len());

        Ok(Schema { tables })
    }
}

/// Where an edge points to. References without a column point to the target's primary key, which
/// only resolves if that key is a single column.
fn resolve_target(edge: &SqlForeignKey, definitions: &[(String, SqlTable)]) -> Option<ForeignKeyTarget> {
    if let Some(column) = &edge.target_column {
        return Some(ForeignKeyTarget::new(&edge.target_table, column));
    }

    let resolved = definitions
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(&edge.target_table))
        .and_then(|(name, e)| match e.primary_keys.as_slice() {
            [primary_key] => Some(ForeignKeyTarget::new(name, primary_key)),
            _ => None,
        });

    if resolved.is_none() {
        debug!(
            "Ignoring reference from `{}` to `{}` without a single-column primary key",
            edge.column, edge.target_table
        );
    }

    resolved
}

fn merge_table(name: &str, definition: &SqlTable, definitions: &[(String, SqlTable)]) -> Table {
    let primary_keys = definition
        .primary_keys
        .iter()
        .map(String::as_str)
        .collect::<HashSet<_>>();

    let mut targets: HashMap<&str, Vec<ForeignKeyTarget>> = HashMap::new();
    for edge in &definition.foreign_keys {
        if let Some(target) = resolve_target(edge, definitions) {
            targets.entry(edge.column.as_str()).or_default().push(target);
        }
    }

    Table {
        name: name.to_string(),
        columns: definition
            .columns
            .iter()
            .map(|e| Column {
                name: e.name.clone(),
                type_name: e.type_name.clone(),
                size: e.size,
                nullable: e.nullable,
                primary_key: primary_keys.contains(e.name.as_str()),
                foreign_key_targets: targets.remove(e.name.as_str()).unwrap_or_default(),
            })
            .collect(),
    }
}
