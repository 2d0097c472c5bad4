//! Request and response envelopes of the service, and the operations behind them.

use serde::{Deserialize, Serialize};

use crate::{
    config::Config,
    error::IntrospectionError,
    execute::SafeExecutor,
    generate::{QueryOrchestrator, provider::Strategy},
    schema::{
        Schema,
        format::format_schema,
        introspect::{Catalog, SchemaIntrospector},
    },
    store::{Row, RowSource},
};

pub const HEALTH_MESSAGE: &str = "QueryMind AI is running!";

const EMPTY_TEXT: &str = "Text cannot be empty";

#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    pub text: Option<String>,
    pub database_schema: Option<String>,
}

impl QueryRequest {
    /// The request text, unless it is missing or blank.
    fn text(&self) -> Option<&str> {
        self.text.as_deref().filter(|e| !e.trim().is_empty())
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct QueryResponse {
    pub sql_query: Option<String>,
    pub explanation: Option<String>,
    pub success: bool,
    pub error: Option<String>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QueryResponseWithData {
    pub sql_query: Option<String>,
    pub explanation: Option<String>,
    pub success: bool,
    pub error: Option<String>,
    pub data: Option<Vec<Row>>,
    pub row_count: usize,
    pub executed: bool,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SchemaResponse {
    pub tables: Schema,
    pub table_count: usize,
    pub schema_string: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    BadRequest,
}

/// A response body together with the status it is delivered with.
#[derive(Debug, Clone, PartialEq)]
pub struct Response<T> {
    pub status: Status,
    pub body: T,
}

impl<T> Response<T> {
    const fn ok(body: T) -> Self {
        Self {
            status: Status::Ok,
            body,
        }
    }

    const fn bad_request(body: T) -> Self {
        Self {
            status: Status::BadRequest,
            body,
        }
    }
}

/// The service's operations over a single store.
pub struct QueryService<S> {
    orchestrator: QueryOrchestrator<S>,
    executor: SafeExecutor<S>,
    introspector: SchemaIntrospector<S>,
}

impl<S> QueryService<S>
where
    S: Catalog + RowSource + Clone,
{
    #[must_use]
    pub fn new(store: S, config: &Config) -> Self {
        Self::with_strategy(store, Strategy::from_config(config))
    }

    pub fn with_strategy(store: S, strategy: Strategy) -> Self {
        Self {
            orchestrator: QueryOrchestrator::with_strategy(store.clone(), strategy),
            executor: SafeExecutor::new(store.clone()),
            introspector: SchemaIntrospector::new(store),
        }
    }

    /// Convert the request text into SQL.
    pub async fn convert(&self, request: &QueryRequest) -> Response<QueryResponse> {
        let Some(text) = request.text() else {
            return Response::bad_request(QueryResponse {
                sql_query: None,
                explanation: None,
                success: false,
                error: Some(EMPTY_TEXT.to_string()),
            });
        };

        let generated = self
            .orchestrator
            .generate(text, request.database_schema.as_deref())
            .await;

        Response::ok(QueryResponse {
            sql_query: Some(generated.sql_text),
            explanation: Some(generated.explanation),
            success: generated.success,
            error: generated.error,
        })
    }

    /// Convert the request text into SQL and run it through the read-only executor.
    pub async fn convert_and_execute(
        &self,
        request: &QueryRequest,
    ) -> Response<QueryResponseWithData> {
        let Some(text) = request.text() else {
            return Response::bad_request(QueryResponseWithData {
                sql_query: None,
                explanation: None,
                success: false,
                error: Some(EMPTY_TEXT.to_string()),
                data: None,
                row_count: 0,
                executed: false,
            });
        };

        let generated = self
            .orchestrator
            .generate(text, request.database_schema.as_deref())
            .await;

        let result = self.executor.execute(&generated.sql_text).await;

        Response::ok(QueryResponseWithData {
            sql_query: Some(generated.sql_text),
            explanation: Some(generated.explanation),
            success: result.success,
            error: result.error,
            data: result.rows,
            row_count: result.row_count,
            executed: true,
        })
    }

    /// The live schema, structured and as annotated text.
    pub async fn schema(&self) -> Result<SchemaResponse, IntrospectionError> {
        let schema = self.introspector.introspect().await?;

        Ok(SchemaResponse {
            table_count: schema.len(),
            schema_string: format_schema(&schema),
            tables: schema,
        })
    }

    #[must_use]
    #[allow(clippy::unused_self)]
    pub const fn health(&self) -> &'static str {
        HEALTH_MESSAGE
    }
}
