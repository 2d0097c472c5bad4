#![allow(clippy::print_stdout)]

mod convert;
mod schema;
mod service;

use clap::{Parser, Subcommand};
use convert::{Convert, Execute};
use schema::Schema;
use tracing::{error, level_filters::LevelFilter};
use tracing_subscriber::{
    fmt::{format, layer},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Subcommand, Debug)]
enum Subcommands {
    Convert(Convert),
    Execute(Execute),
    Schema(Schema),
    /// Check that the tool is operational
    Health,
}

#[derive(Parser, Debug)]
#[command(version, about = "Turn natural-language requests into SQL")]
struct Args {
    #[command(subcommand)]
    command: Subcommands,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(LevelFilter::INFO)
        .with(layer().event_format(format().without_time().with_target(false).compact()))
        .init();

    let r = match args.command {
        Subcommands::Convert(cmd) => cmd.run().await,
        Subcommands::Execute(cmd) => cmd.run().await,
        Subcommands::Schema(cmd) => cmd.run().await,
        Subcommands::Health => {
            println!("{}", querymind::api::HEALTH_MESSAGE);
            Ok(())
        }
    };

    if let Err(e) = r {
        error!("Command execution failed: {e:#}");
        std::process::exit(1);
    }
}
