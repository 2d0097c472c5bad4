//! Relational store access.

pub mod sqlite;

use async_trait::async_trait;
use querymind_sqlparse::db::DbType;
use serde_json::{Map, Value};

use crate::error::StoreError;
pub use sqlite::SqliteStore;

/// A single result row: column name to value, in result-set column order.
pub type Row = Map<String, Value>;

/// Runs read queries against a store.
#[async_trait]
pub trait RowSource: Send + Sync {
    /// Run `sql` and materialize every row it returns.
    async fn fetch_rows(&self, sql: &str) -> Result<Vec<Row>, StoreError>;
}

/// Open a store for `url`. Only SQLite connection strings are supported.
pub async fn connect(url: &str) -> Result<SqliteStore, StoreError> {
    match DbType::from_connection_string(url) {
        Some(DbType::Sqlite) => SqliteStore::connect(url).await,
        Some(other) => Err(StoreError::Unsupported(other.to_string())),
        None => Err(StoreError::UnknownDatabase(url.to_string())),
    }
}

#[cfg(test)]
mod test {
    use super::connect;
    use crate::error::StoreError;

    #[tokio::test]
    async fn test_connect_rejects_other_databases() {
        assert!(matches!(
            connect("postgres://localhost/shop").await,
            Err(StoreError::Unsupported(e)) if e == "PostgreSQL"
        ));
        assert!(matches!(
            connect("oracle://localhost/shop").await,
            Err(StoreError::UnknownDatabase(_))
        ));
        assert!(connect("sqlite::memory:").await.is_ok());
    }
}
