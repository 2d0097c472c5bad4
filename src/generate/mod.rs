//! Request text in, SQL out: resolves the schema, asks the configured provider and degrades to the
//! heuristic composer when anything on the way fails.

pub mod prompt;
pub mod provider;

use std::fmt::Display;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::{
    compose::compose,
    config::Config,
    error::{CollaboratorError, IntrospectionError, Recovery},
    schema::{
        format::format_schema,
        introspect::{Catalog, SchemaIntrospector},
    },
};
use prompt::{SYSTEM_PROMPT, normalize_sql, user_prompt};
use provider::Strategy;

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedQuery {
    pub sql_text: String,
    pub explanation: String,
    pub success: bool,
    pub error: Option<String>,
}

impl GeneratedQuery {
    fn generated(sql_text: String, explanation: String) -> Self {
        Self {
            sql_text,
            explanation,
            success: true,
            error: None,
        }
    }

}

/// Anything that keeps a request from reaching a provider answer.
#[derive(Debug, Error)]
pub enum GenerationFailure {
    #[error(transparent)]
    Introspection(#[from] IntrospectionError),
    #[error(transparent)]
    Collaborator(#[from] CollaboratorError),
}

impl GenerationFailure {
    /// Generation itself never fails the caller, so there is no [`Recovery::Surface`] here.
    #[must_use]
    pub const fn recovery(&self) -> Recovery {
        match self {
            Self::Introspection(_) => Recovery::Degrade,
            Self::Collaborator(e) => e.recovery(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SchemaSource {
    Supplied,
    Detected,
}

impl Display for SchemaSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Self::Supplied => "supplied",
                Self::Detected => "auto-detected",
            }
        )
    }
}

pub struct QueryOrchestrator<C> {
    introspector: SchemaIntrospector<C>,
    strategy: Strategy,
}

impl<C> QueryOrchestrator<C>
where
    C: Catalog,
{
    #[must_use]
    pub fn new(catalog: C, config: &Config) -> Self {
        Self::with_strategy(catalog, Strategy::from_config(config))
    }

    pub const fn with_strategy(catalog: C, strategy: Strategy) -> Self {
        Self {
            introspector: SchemaIntrospector::new(catalog),
            strategy,
        }
    }

    /// Generate a statement for `text`. A non-blank `schema_text` is used as-is, otherwise the
    /// live schema is introspected.
    pub async fn generate(&self, text: &str, schema_text: Option<&str>) -> GeneratedQuery {
        let (schema_text, source) = match schema_text.filter(|e| !e.trim().is_empty()) {
            Some(e) => (e.to_string(), SchemaSource::Supplied),
            None => match self.introspector.introspect().await {
                Ok(schema) => (format_schema(&schema), SchemaSource::Detected),
                Err(e) => return recover(text, "", e.into()),
            },
        };

        debug!("Generating SQL with {} schema", source);

        let completion = self
            .strategy
            .complete(SYSTEM_PROMPT, &user_prompt(text, &schema_text))
            .await
            .and_then(|e| normalize_sql(&e));

        match completion {
            Ok(sql) => GeneratedQuery::generated(
                sql,
                format!(
                    "Generated using {} ({}) with {source} schema",
                    self.strategy.provider(),
                    self.strategy.model().unwrap_or_default()
                ),
            ),
            Err(e) => recover(text, &schema_text, e.into()),
        }
    }
}

/// Answer with the heuristic composer, every [`GenerationFailure`] degrades.
fn recover(text: &str, schema_text: &str, failure: GenerationFailure) -> GeneratedQuery {
    let explanation = match &failure {
        GenerationFailure::Collaborator(CollaboratorError::Unconfigured(provider)) => {
            format!("Generated using heuristic pattern matching ({provider} is not configured)")
        }
        _ => {
            warn!("Generation failed, using heuristic: {failure}");
            format!("Fallback to heuristic generation due to error: {failure}")
        }
    };

    GeneratedQuery::generated(compose(text, schema_text), explanation)
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use serde_json::json;
    use wiremock::{Mock, MockServer, ResponseTemplate, matchers::method};

    use super::{GenerationFailure, QueryOrchestrator, provider::Strategy};
    use crate::{
        config::{Config, Provider},
        error::{CollaboratorError, IntrospectionError, Recovery, StoreError},
        schema::introspect::test::StaticCatalog,
    };

    const SCHEMA: &str = "users (\n  id INT [PK]\n)\norders (\n  id INT [PK],\n  user_id INT [FK->users.id]\n)\n";

    fn shop() -> StaticCatalog {
        StaticCatalog::default()
            .with_table("CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT)")
            .with_table("CREATE TABLE orders (id INTEGER PRIMARY KEY, user_id INTEGER REFERENCES users(id))")
    }

    async fn openai(response: ResponseTemplate) -> (MockServer, Config) {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(response)
            .mount(&server)
            .await;

        let mut config = Config::default();
        config.openai.api_key = Some("test-key".to_string());
        config.openai.base_url = server.uri();
        config.timeout = Duration::from_secs(5);

        (server, config)
    }

    #[tokio::test]
    async fn test_unconfigured_uses_heuristic() {
        let orchestrator = QueryOrchestrator::new(shop(), &Config::default());

        let generated = orchestrator.generate("how many users", None).await;

        assert!(generated.success);
        assert_eq!(generated.sql_text, "SELECT COUNT(*) AS cnt FROM users;");
        assert_eq!(
            generated.explanation,
            "Generated using heuristic pattern matching (OpenAI is not configured)"
        );
        assert!(generated.error.is_none());
    }

    #[tokio::test]
    async fn test_heuristic_path_is_deterministic() {
        let orchestrator = QueryOrchestrator::new(shop(), &Config::default());

        let first = orchestrator.generate("show orders for users", None).await;
        let second = orchestrator.generate("show orders for users", None).await;

        assert_eq!(first, second);
        assert_eq!(
            first.sql_text,
            "SELECT users.*, orders.* FROM users JOIN orders ON orders.user_id = users.id;"
        );
    }

    #[tokio::test]
    async fn test_supplied_schema_wins() {
        let catalog = StaticCatalog {
            broken: true,
            ..StaticCatalog::default()
        };
        let orchestrator = QueryOrchestrator::new(catalog, &Config::default());

        let generated = orchestrator.generate("list orders", Some(SCHEMA)).await;

        assert_eq!(generated.sql_text, "SELECT * FROM orders;");
    }

    #[tokio::test]
    async fn test_introspection_failure_degrades() {
        let catalog = StaticCatalog {
            broken: true,
            ..StaticCatalog::default()
        };
        let orchestrator = QueryOrchestrator::new(catalog, &Config::default());

        let generated = orchestrator.generate("list orders", Some("  ")).await;

        assert!(generated.success);
        assert_eq!(generated.sql_text, "SELECT * FROM table_name;");
        assert!(
            generated
                .explanation
                .starts_with("Fallback to heuristic generation due to error: Failed to retrieve database schema")
        );
    }

    #[tokio::test]
    async fn test_provider_output_is_normalized() {
        let (_server, config) = openai(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "message": { "content": "```sql\nSELECT u.name FROM users u\n```" } }]
        })))
        .await;
        let orchestrator = QueryOrchestrator::new(shop(), &config);

        let generated = orchestrator.generate("names of users", None).await;

        assert!(generated.success);
        assert_eq!(generated.sql_text, "SELECT u.name FROM users u;");
        assert_eq!(
            generated.explanation,
            "Generated using OpenAI (gpt-3.5-turbo) with auto-detected schema"
        );
    }

    #[tokio::test]
    async fn test_provider_failure_degrades() {
        let (_server, config) =
            openai(ResponseTemplate::new(500).set_body_string("internal error")).await;
        let orchestrator = QueryOrchestrator::new(shop(), &config);

        let generated = orchestrator.generate("list users", Some(SCHEMA)).await;

        assert!(generated.success);
        assert_eq!(generated.sql_text, "SELECT * FROM users;");
        assert_eq!(
            generated.explanation,
            "Fallback to heuristic generation due to error: OpenAI API error (500): internal error"
        );
    }

    #[tokio::test]
    async fn test_multiple_statements_degrade() {
        let (_server, config) = openai(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "message": { "content": "SELECT * FROM users; DROP TABLE users;" } }]
        })))
        .await;
        let orchestrator = QueryOrchestrator::new(shop(), &config);

        let generated = orchestrator.generate("list users", None).await;

        assert_eq!(generated.sql_text, "SELECT * FROM users;");
        assert!(generated.explanation.contains("malformed response"));
    }

    #[test]
    fn test_recovery_policy() {
        let failure = GenerationFailure::from(CollaboratorError::Timeout(Provider::Gemini));
        assert_eq!(failure.recovery(), Recovery::Degrade);

        let introspection = IntrospectionError(StoreError::MissingTable("users".to_string()));
        assert_eq!(introspection.recovery(), Recovery::Surface);
        assert_eq!(
            GenerationFailure::from(introspection).recovery(),
            Recovery::Degrade
        );

        let strategy = Strategy::Unconfigured(Provider::Gemini);
        assert_eq!(strategy.provider(), Provider::Gemini);
        assert!(strategy.model().is_none());
    }
}
