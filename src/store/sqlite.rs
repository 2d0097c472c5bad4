use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt};
use querymind_sqlparse::{
    query::parse_create_table,
    schema::{SqlColumn, SqlForeignKey, SqlTable},
};
use serde_json::Value;
use sqlx::{
    Column, Row as _, SqlitePool, TypeInfo, ValueRef,
    sqlite::{SqlitePoolOptions, SqliteRow},
};
use tracing::debug;

use super::{Row, RowSource};
use crate::{
    error::StoreError,
    schema::introspect::{Catalog, CatalogObject, ObjectKind},
};

/// A SQLite database behind a connection pool.
#[derive(Clone, Debug)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let mut options = SqlitePoolOptions::new();

        // every connection to `:memory:` opens a fresh database
        if url.contains(":memory:") || url.contains("mode=memory") {
            options = options
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        }

        let pool = options.connect(url).await?;

        debug!("Connected to {url}");

        Ok(Self { pool })
    }

    #[must_use]
    pub const fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Table metadata as SQLite itself reports it.
    async fn describe_with_pragmas(&self, table: &str) -> Result<SqlTable, StoreError> {
        let columns = sqlx::query(
            r#"SELECT name, type, "notnull", pk FROM pragma_table_info(?) ORDER BY cid"#,
        )
        .bind(table)
        .fetch_all(&self.pool)
        .await?;

        let mut primary_keys = Vec::new();
        let mut definition = SqlTable {
            name: table.to_string(),
            ..SqlTable::default()
        };

        for row in &columns {
            let name: String = row.try_get("name")?;
            let declared_type: String = row.try_get("type")?;
            let not_null: i64 = row.try_get("notnull")?;
            let primary_key: i64 = row.try_get("pk")?;

            if primary_key > 0 {
                primary_keys.push((primary_key, name.clone()));
            }

            definition
                .columns
                .push(SqlColumn::new(name, &declared_type, not_null == 0));
        }

        primary_keys.sort();
        definition.primary_keys = primary_keys.into_iter().map(|(_, e)| e).collect();

        definition.foreign_keys = sqlx::query(
            r#"SELECT "from", "table", "to" FROM pragma_foreign_key_list(?) ORDER BY id, seq"#,
        )
        .bind(table)
        .fetch_all(&self.pool)
        .await?
        .iter()
        .map(|e| {
            Ok::<_, sqlx::Error>(SqlForeignKey {
                column: e.try_get("from")?,
                target_table: e.try_get("table")?,
                target_column: e.try_get("to")?,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

        Ok(definition)
    }
}

fn object_kind(object_type: &str, name: &str, sql: Option<&str>) -> ObjectKind {
    match object_type {
        "table" if name.starts_with("sqlite_") => ObjectKind::SystemTable,
        "table"
            if sql.is_some_and(|e| {
                e.trim_start()
                    .to_uppercase()
                    .starts_with("CREATE VIRTUAL TABLE")
            }) =>
        {
            ObjectKind::VirtualTable
        }
        "table" => ObjectKind::Table,
        "view" => ObjectKind::View,
        _ => ObjectKind::Other,
    }
}

#[async_trait]
impl Catalog for SqliteStore {
    async fn objects(&self) -> Result<Vec<CatalogObject>, StoreError> {
        let objects: Vec<CatalogObject> = sqlx::query("SELECT type, name, sql FROM sqlite_schema")
            .fetch(&self.pool)
            .map(|e| {
                let row = e?;
                let object_type: String = row.try_get("type")?;
                let name: String = row.try_get("name")?;
                let sql: Option<String> = row.try_get("sql")?;

                Ok::<_, sqlx::Error>(CatalogObject {
                    kind: object_kind(&object_type, &name, sql.as_deref()),
                    name,
                })
            })
            .try_collect()
            .await?;

        Ok(objects)
    }

    async fn describe(&self, table: &str) -> Result<SqlTable, StoreError> {
        let sql: Option<String> = sqlx::query_scalar::<_, Option<String>>(
            "SELECT sql FROM sqlite_schema WHERE type = 'table' AND name = ?",
        )
        .bind(table)
        .fetch_optional(&self.pool)
        .await?
        .flatten();

        let Some(sql) = sql else {
            return Err(StoreError::MissingTable(table.to_string()));
        };

        match parse_create_table(&sql) {
            Ok(definition) => Ok(definition),
            Err(source) => {
                debug!("Reading `{table}` through pragmas, its definition did not parse: {source}");

                let definition = self.describe_with_pragmas(table).await?;

                if definition.columns.is_empty() {
                    return Err(StoreError::Definition {
                        table: table.to_string(),
                        source,
                    });
                }

                Ok(definition)
            }
        }
    }
}

#[async_trait]
impl RowSource for SqliteStore {
    async fn fetch_rows(&self, sql: &str) -> Result<Vec<Row>, StoreError> {
        let rows = sqlx::query(sql).fetch_all(&self.pool).await?;

        rows.iter()
            .map(|e| decode_row(e).map_err(StoreError::from))
            .collect()
    }
}

/// Decode by the storage class of each value, since SQLite columns are not strictly typed.
fn decode_row(row: &SqliteRow) -> Result<Row, sqlx::Error> {
    let mut decoded = Row::new();

    for (i, column) in row.columns().iter().enumerate() {
        let raw = row.try_get_raw(i)?;

        let value = if raw.is_null() {
            Value::Null
        } else {
            match raw.type_info().name() {
                "INTEGER" => Value::from(row.try_get_unchecked::<i64, _>(i)?),
                "REAL" => Value::from(row.try_get_unchecked::<f64, _>(i)?),
                "BLOB" => Value::from(row.try_get_unchecked::<Vec<u8>, _>(i)?),
                _ => Value::from(row.try_get_unchecked::<String, _>(i)?),
            }
        };

        decoded.insert(column.name().to_string(), value);
    }

    Ok(decoded)
}
