//! Read-only execution of generated statements.
//!
//! The gate is a prefix check and nothing more: comments in front of the statement, or further
//! statements after a leading `SELECT`, are not detected here.

use serde::Serialize;
use tracing::{debug, warn};

use crate::{
    error::ExecutionError,
    store::{Row, RowSource},
};

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub success: bool,
    pub rows: Option<Vec<Row>>,
    pub row_count: usize,
    pub error: Option<String>,
}

impl ExecutionResult {
    fn succeeded(rows: Vec<Row>) -> Self {
        Self {
            success: true,
            row_count: rows.len(),
            rows: Some(rows),
            error: None,
        }
    }

    fn failed(error: &ExecutionError) -> Self {
        Self {
            success: false,
            rows: None,
            row_count: 0,
            error: Some(error.to_string()),
        }
    }
}

/// Whether `sql` passes the read-only gate: its trimmed, upper-cased form starts with `SELECT`.
#[must_use]
pub fn is_read_only(sql: &str) -> bool {
    sql.trim().to_uppercase().starts_with("SELECT")
}

pub struct SafeExecutor<S> {
    source: S,
}

impl<S> SafeExecutor<S>
where
    S: RowSource,
{
    pub const fn new(source: S) -> Self {
        Self { source }
    }

    /// Run `sql` if it passes the read-only gate. Failures end up in the result, never in the
    /// caller.
    pub async fn execute(&self, sql: &str) -> ExecutionResult {
        match self.try_execute(sql).await {
            Ok(rows) => {
                debug!("Query returned {} rows", rows.len());
                ExecutionResult::succeeded(rows)
            }
            Err(e) => {
                warn!("{e}");
                ExecutionResult::failed(&e)
            }
        }
    }

    async fn try_execute(&self, sql: &str) -> Result<Vec<Row>, ExecutionError> {
        if !is_read_only(sql) {
            return Err(ExecutionError::PolicyViolation);
        }

        self.source
            .fetch_rows(sql)
            .await
            .map_err(|e| ExecutionError::Runtime(e.to_string()))
    }
}

#[cfg(test)]
mod test {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::json;

    use super::{SafeExecutor, is_read_only};
    use crate::{
        error::StoreError,
        store::{Row, RowSource},
    };

    /// Records every statement it is asked to run.
    #[derive(Default)]
    struct RecordingSource {
        executed: Mutex<Vec<String>>,
        failure: Option<String>,
    }

    #[async_trait]
    impl RowSource for RecordingSource {
        async fn fetch_rows(&self, sql: &str) -> Result<Vec<Row>, StoreError> {
            self.executed.lock().unwrap().push(sql.to_string());

            if let Some(failure) = &self.failure {
                return Err(StoreError::MissingTable(failure.clone()));
            }

            let mut row = Row::new();
            row.insert("id".to_string(), json!(1));
            row.insert("name".to_string(), json!("Ada"));
            Ok(vec![row])
        }
    }

    #[test]
    fn test_read_only_gate() {
        assert!(is_read_only("SELECT * FROM users;"));
        assert!(is_read_only("  select count(*) from users"));
        assert!(!is_read_only("DELETE FROM users;"));
        assert!(!is_read_only("WITH x AS (SELECT 1) SELECT * FROM x"));
        assert!(!is_read_only(""));

        // prefix check only
        assert!(is_read_only("SELECT 1; DROP TABLE users;"));
        assert!(!is_read_only("-- comment\nSELECT 1"));
    }

    #[tokio::test]
    async fn test_rejects_without_executing() {
        let executor = SafeExecutor::new(RecordingSource::default());

        let result = executor.execute("DELETE FROM users;").await;

        assert!(!result.success);
        assert_eq!(
            result.error.as_deref(),
            Some("Only SELECT queries are allowed for execution")
        );
        assert!(result.rows.is_none());
        assert!(executor.source.executed.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_returns_rows() {
        let executor = SafeExecutor::new(RecordingSource::default());

        let result = executor.execute(" select * from users ").await;

        assert!(result.success);
        assert_eq!(result.row_count, 1);
        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            json!({
                "success": true,
                "rows": [{ "id": 1, "name": "Ada" }],
                "rowCount": 1,
                "error": null,
            })
        );
    }

    #[tokio::test]
    async fn test_store_errors_are_reported() {
        let executor = SafeExecutor::new(RecordingSource {
            failure: Some("ghosts".to_string()),
            ..RecordingSource::default()
        });

        let result = executor.execute("SELECT * FROM ghosts;").await;

        assert!(!result.success);
        assert_eq!(
            result.error.as_deref(),
            Some("Query execution failed: table `ghosts` does not exist")
        );
        assert_eq!(executor.source.executed.lock().unwrap().len(), 1);
    }
}
