use serde::{Deserialize, Serialize};
use sqlparser::ast::{ColumnDef, ColumnOption, CreateTable, TableConstraint};

/// A single foreign-key edge, `column -> target_table.target_column`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SqlForeignKey {
    pub column: String,
    pub target_table: String,
    /// `None` if the reference names no column, which points it at the target's primary key.
    pub target_column: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SqlColumn {
    pub name: String,
    /// The declared type without its arguments, e.g. `VARCHAR` for `VARCHAR(255)`.
    pub type_name: String,
    /// First integer argument of the declared type, `0` if there is none.
    pub size: u32,
    pub nullable: bool,
}

impl SqlColumn {
    /// A column with the type as declared, e.g. `VARCHAR(255)`.
    pub fn new(name: impl Into<String>, declared_type: &str, nullable: bool) -> Self {
        let (type_name, size) = split_data_type(declared_type);

        Self {
            name: name.into(),
            type_name,
            size,
            nullable,
        }
    }
}

impl From<&ColumnDef> for SqlColumn {
    fn from(value: &ColumnDef) -> Self {
        Self::new(
            value.name.value.clone(),
            &value.data_type.to_string(),
            value
                .options
                .iter()
                .find_map(|e| match &e.option {
                    ColumnOption::Null => Some(true),
                    ColumnOption::NotNull => Some(false),
                    _ => None,
                })
                .unwrap_or(true),
        )
    }
}

/// Raw metadata of one table, as declared by its `CREATE TABLE` statement.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct SqlTable {
    pub name: String,
    pub columns: Vec<SqlColumn>,
    pub primary_keys: Vec<String>,
    pub foreign_keys: Vec<SqlForeignKey>,
}

impl SqlTable {
    #[must_use]
    pub fn find_column(&self, name: &str) -> Option<&SqlColumn> {
        self.columns.iter().find(|e| e.name.eq(name))
    }
}

impl From<&CreateTable> for SqlTable {
    fn from(create_table: &CreateTable) -> Self {
        let columns: Vec<SqlColumn> = create_table.columns.iter().map(SqlColumn::from).collect();

        let mut primary_keys = Vec::new();
        let mut foreign_keys = Vec::new();

        for column in &create_table.columns {
            for option in &column.options {
                match &option.option {
                    ColumnOption::Unique {
                        is_primary: true, ..
                    } => primary_keys.push(column.name.value.clone()),
                    ColumnOption::ForeignKey {
                        foreign_table,
                        referred_columns,
                        ..
                    } if referred_columns.len() <= 1 => foreign_keys.push(SqlForeignKey {
                        column: column.name.value.clone(),
                        target_table: object_name(foreign_table),
                        target_column: referred_columns.first().map(bare),
                    }),
                    _ => {}
                }
            }
        }

        for constraint in &create_table.constraints {
            match constraint {
                TableConstraint::PrimaryKey { columns, .. } => {
                    primary_keys.extend(columns.iter().map(bare));
                }
                TableConstraint::ForeignKey {
                    columns,
                    foreign_table,
                    referred_columns,
                    ..
                } if referred_columns.is_empty() => {
                    foreign_keys.extend(columns.iter().map(|column| SqlForeignKey {
                        column: bare(column),
                        target_table: object_name(foreign_table),
                        target_column: None,
                    }));
                }
                TableConstraint::ForeignKey {
                    columns,
                    foreign_table,
                    referred_columns,
                    ..
                } => foreign_keys.extend(columns.iter().zip(referred_columns).map(
                    |(column, referred)| SqlForeignKey {
                        column: bare(column),
                        target_table: object_name(foreign_table),
                        target_column: Some(bare(referred)),
                    },
                )),
                _ => {}
            }
        }

        primary_keys.dedup();

        SqlTable {
            name: object_name(&create_table.name),
            columns,
            primary_keys,
            foreign_keys,
        }
    }
}

/// The unqualified, unquoted name of a (possibly schema-qualified) object.
fn object_name(name: &impl ToString) -> String {
    let name = name.to_string();

    bare(&name.rsplit('.').next().unwrap_or_default())
}

fn bare(ident: &impl ToString) -> String {
    ident
        .to_string()
        .trim_matches(|c| matches!(c, '"' | '`' | '[' | ']'))
        .to_string()
}

fn split_data_type(declared: &str) -> (String, u32) {
    match declared.split_once('(') {
        Some((name, arguments)) => {
            let size = arguments
                .split([',', ')'])
                .next()
                .and_then(|e| e.trim().parse().ok())
                .unwrap_or(0);

            (name.trim().to_string(), size)
        }
        None => (declared.trim().to_string(), 0),
    }
}

#[cfg(test)]
mod test {
    use super::{SqlColumn, split_data_type};

    #[test]
    fn test_split_data_type() {
        assert_eq!(split_data_type("VARCHAR(255)"), ("VARCHAR".to_string(), 255));
        assert_eq!(split_data_type("DECIMAL(10,2)"), ("DECIMAL".to_string(), 10));
        assert_eq!(split_data_type("INTEGER"), ("INTEGER".to_string(), 0));
        assert_eq!(split_data_type(""), (String::new(), 0));
    }

    #[test]
    fn test_column_from_declared_type() {
        let column = SqlColumn::new("price", "NUMERIC(8, 2)", false);

        assert_eq!(column.type_name, "NUMERIC");
        assert_eq!(column.size, 8);
        assert!(!column.nullable);
    }
}
