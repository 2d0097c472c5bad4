use querymind_sqlparse::query::DdlError;
use thiserror::Error;

use crate::config::Provider;

/// What the caller does with a failure of a pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recovery {
    /// Answer with the heuristic composer instead; the reason only shows up in the explanation.
    Degrade,
    /// Report the failure to the caller as-is.
    Surface,
}

/// Failures of the relational store itself.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error("failed to read definition of table `{table}`: {source}")]
    Definition {
        table: String,
        #[source]
        source: DdlError,
    },
    #[error("table `{0}` does not exist")]
    MissingTable(String),
    #[error("{0} databases are not supported, use a `sqlite:` connection string")]
    Unsupported(String),
    #[error("failed to determine database type from connection string `{0}`")]
    UnknownDatabase(String),
}

#[derive(Debug, Error)]
#[error("Failed to retrieve database schema: {0}")]
pub struct IntrospectionError(#[from] pub StoreError);

impl IntrospectionError {
    /// There is no fallback for "what is the schema".
    #[must_use]
    pub const fn recovery(&self) -> Recovery {
        Recovery::Surface
    }
}

/// Failures of a generative provider call.
#[derive(Debug, Error)]
pub enum CollaboratorError {
    #[error("{0} is not configured")]
    Unconfigured(Provider),
    #[error("{0} request timed out")]
    Timeout(Provider),
    #[error("{provider} rejected the credentials ({status})")]
    Unauthorized { provider: Provider, status: u16 },
    #[error("{provider} API error ({status}): {body}")]
    Api {
        provider: Provider,
        status: u16,
        body: String,
    },
    #[error("{provider} request failed: {message}")]
    Transport { provider: Provider, message: String },
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("empty response")]
    Empty,
}

impl CollaboratorError {
    #[must_use]
    pub const fn recovery(&self) -> Recovery {
        match self {
            Self::Unconfigured(_)
            | Self::Timeout(_)
            | Self::Unauthorized { .. }
            | Self::Api { .. }
            | Self::Transport { .. }
            | Self::Malformed(_)
            | Self::Empty => Recovery::Degrade,
        }
    }
}

#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("Only SELECT queries are allowed for execution")]
    PolicyViolation,
    #[error("Query execution failed: {0}")]
    Runtime(String),
}

impl ExecutionError {
    #[must_use]
    pub const fn recovery(&self) -> Recovery {
        match self {
            Self::PolicyViolation | Self::Runtime(_) => Recovery::Surface,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown LLM provider `{0}`, expected `openai` or `gemini`")]
    UnknownProvider(String),
    #[error("invalid timeout `{0}`, expected a number of seconds")]
    InvalidTimeout(String),
}
