use std::path::PathBuf;

use clap::Parser;
use eyre::Context;
use querymind::api::{QueryRequest, Status};
use tracing::info;

use crate::service::{Connection, read_schema_file};

/// Convert a natural-language request into SQL
#[derive(Parser, Debug)]
pub struct Convert {
    /// The request, e.g. "how many orders does each user have"
    text: String,

    /// File containing an annotated schema description to use instead of the live schema.
    #[arg(short, long, value_name = "FILE")]
    schema_file: Option<PathBuf>,

    #[command(flatten)]
    connection: Connection,
}

impl Convert {
    pub async fn run(&self) -> eyre::Result<()> {
        let service = self.connection.open().await?;

        let request = QueryRequest {
            text: Some(self.text.clone()),
            database_schema: read_schema_file(self.schema_file.as_deref()).await?,
        };

        let response = service.convert(&request).await;

        println!(
            "{}",
            serde_json::to_string_pretty(&response.body).context("Failed to serialize response")?
        );

        if response.status == Status::BadRequest {
            return Err(eyre::eyre!("Request rejected"));
        }

        if let Some(explanation) = &response.body.explanation {
            info!("{explanation}");
        }

        Ok(())
    }
}

/// Convert a natural-language request into SQL and run it, read-only
#[derive(Parser, Debug)]
pub struct Execute {
    /// The request, e.g. "list all users"
    text: String,

    /// File containing an annotated schema description to use instead of the live schema.
    #[arg(short, long, value_name = "FILE")]
    schema_file: Option<PathBuf>,

    #[command(flatten)]
    connection: Connection,
}

impl Execute {
    pub async fn run(&self) -> eyre::Result<()> {
        let service = self.connection.open().await?;

        let request = QueryRequest {
            text: Some(self.text.clone()),
            database_schema: read_schema_file(self.schema_file.as_deref()).await?,
        };

        let response = service.convert_and_execute(&request).await;

        println!(
            "{}",
            serde_json::to_string_pretty(&response.body).context("Failed to serialize response")?
        );

        match (response.status, response.body.error) {
            (Status::BadRequest, _) => Err(eyre::eyre!("Request rejected")),
            (Status::Ok, Some(e)) if !response.body.success => {
                Err(eyre::eyre!("Query was not executed successfully: {e}"))
            }
            _ => {
                info!("{} rows returned", response.body.row_count);
                Ok(())
            }
        }
    }
}
