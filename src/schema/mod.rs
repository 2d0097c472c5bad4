//! The normalized schema model shared by introspection, formatting and the API envelopes.

pub mod format;
pub mod introspect;

use std::{borrow::Cow, fmt::Display};

use serde::{Serialize, Serializer, ser::SerializeMap};

/// `name` as-is if it is a plain identifier, otherwise wrapped in double quotes with inner quotes
/// doubled.
#[must_use]
pub fn quote_identifier(name: &str) -> Cow<'_, str> {
    let plain = name
        .chars()
        .next()
        .is_some_and(|e| e.is_ascii_alphabetic() || e == '_')
        && name.chars().all(|e| e.is_ascii_alphanumeric() || e == '_');

    if plain {
        Cow::Borrowed(name)
    } else {
        Cow::Owned(format!("\"{}\"", name.replace('"', "\"\"")))
    }
}

/// Where a foreign key points to, rendered as `table.column`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ForeignKeyTarget {
    pub table: String,
    pub column: String,
}

impl ForeignKeyTarget {
    pub fn new(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            column: column.into(),
        }
    }
}

impl Display for ForeignKeyTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.table, self.column)
    }
}

impl Serialize for ForeignKeyTarget {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    pub name: String,
    /// The type name as reported by the store.
    #[serde(rename = "type")]
    pub type_name: String,
    pub size: u32,
    pub nullable: bool,
    pub primary_key: bool,
    pub foreign_key_targets: Vec<ForeignKeyTarget>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub name: String,
    pub columns: Vec<Column>,
}

impl Table {
    #[must_use]
    pub fn find_column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|e| e.name.eq(name))
    }
}

/// Tables in catalog discovery order. Serializes as a `name -> [column]` map.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Schema {
    pub tables: Vec<Table>,
}

impl Schema {
    #[must_use]
    pub fn find_table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|e| e.name.eq(name))
    }

    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.iter().map(|e| e.name.as_str())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

impl Serialize for Schema {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.tables.len()))?;
        for table in &self.tables {
            map.serialize_entry(&table.name, &table.columns)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod test {
    use super::{ForeignKeyTarget, quote_identifier};

    #[test]
    fn test_quote_identifier() {
        assert_eq!(quote_identifier("users"), "users");
        assert_eq!(quote_identifier("_tmp2"), "_tmp2");
        assert_eq!(quote_identifier("order items"), "\"order items\"");
        assert_eq!(quote_identifier("2fa"), "\"2fa\"");
        assert_eq!(quote_identifier("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(quote_identifier(""), "\"\"");
    }

    #[test]
    fn test_foreign_key_target_display() {
        assert_eq!(ForeignKeyTarget::new("users", "id").to_string(), "users.id");
        assert_eq!(
            ForeignKeyTarget::new("order items", "id").to_string(),
            "order items.id"
        );
    }
}
