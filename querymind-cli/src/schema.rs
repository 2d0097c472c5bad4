use std::path::PathBuf;

use clap::Parser;
use eyre::Context;
use tracing::info;

use crate::service::Connection;

/// Introspect the database schema
#[derive(Parser, Debug)]
pub struct Schema {
    /// Write the schema in JSON format to this file instead of printing it.
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Print the annotated schema text instead of JSON.
    #[arg(short, long, conflicts_with = "output")]
    text: bool,

    #[command(flatten)]
    connection: Connection,
}

impl Schema {
    pub async fn run(&self) -> eyre::Result<()> {
        let service = self.connection.open().await?;

        let schema = service
            .schema()
            .await
            .context("Failed to introspect database")?;

        if self.text {
            print!("{}", schema.schema_string);
            return Ok(());
        }

        let json = serde_json::to_string_pretty(&schema).context("Failed to serialize schema")?;

        let Some(output) = &self.output else {
            println!("{json}");
            return Ok(());
        };

        if let Some(dir) = output.parent().filter(|e| !e.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir)
                .await
                .with_context(|| format!("Failed to create {}", dir.display()))?;
        }

        tokio::fs::write(output, json)
            .await
            .context("Failed to write schema")?;

        info!(
            "Schema of {} tables written to {}",
            schema.table_count,
            output.display()
        );

        Ok(())
    }
}
