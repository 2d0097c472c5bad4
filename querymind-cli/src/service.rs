use std::path::Path;

use clap::Args;
use eyre::Context;
use querymind::{
    api::QueryService, config::Config, sqlparse::db::get_database_url, store::SqliteStore,
};

/// Options shared by every command talking to a database.
#[derive(Args, Debug)]
pub struct Connection {
    /// The URL to the database to work against. If left unset, will be pulled from the
    /// `DATABASE_URL` environment variable, or a corresponding `.env` file instead.
    #[arg(short, long, value_name = "DATABASE_URL")]
    database_url: Option<String>,
}

impl Connection {
    pub async fn open(&self) -> eyre::Result<QueryService<SqliteStore>> {
        let Some(database_url) = self.database_url.clone().or_else(get_database_url) else {
            return Err(eyre::eyre!(
                "Missing database URL, either set the `DATABASE_URL` environment variable, or specify it manually via --database-url [URL]"
            ));
        };

        let config = Config::from_env().context("Failed to read configuration")?;

        let store = querymind::store::connect(&database_url)
            .await
            .context("Failed to connect to database")?;

        Ok(QueryService::new(store, &config))
    }
}

/// Read a schema description from `path`, if one was given.
pub async fn read_schema_file(path: Option<&Path>) -> eyre::Result<Option<String>> {
    let Some(path) = path else {
        return Ok(None);
    };

    let schema = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read schema file {}", path.display()))?;

    Ok(Some(schema))
}
