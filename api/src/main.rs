#![deny(
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::unwrap_used
)]
#![allow(clippy::print_stdout)]

use clap::{Parser, Subcommand};
use mackerel_agent_api::{
    api::Api,
    config::Config,
    mackerel::{ApiError, HostStatus},
};
use tracing_subscriber::EnvFilter;

/// Call single Mackerel API operations the way the agent does.
#[derive(Debug, Parser)]
#[command(name = "mkr-api", version)]
struct Cli {
    /// YAML configuration file.
    #[arg(long, default_value = "config.yaml")]
    config: String,

    /// Dump requests and responses (needs `logging.level` trace).
    #[arg(long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Show a host by ID.
    Host { id: String },
    /// Show the live host registered with a custom identifier.
    FindByCustomIdentifier { custom_identifier: String },
    /// Change the status of a host.
    Status { id: String, status: HostStatus },
    /// Retire a host.
    Retire { id: String },
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();

    let mut config = Config::load_from(&cli.config).map_err(|e| anyhow::anyhow!("{e}"))?;
    config.api.verbose |= cli.verbose;

    let filter = EnvFilter::try_new(&config.logging.level)?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let api = Api::from_config(&config.api)?;
    tracing::debug!(base_url = %api.base_url(), user_agent = api.user_agent(), "client ready");

    match run(&api, cli.command).await {
        Err(ApiError::Info { message }) => {
            tracing::info!("{message}");
            Ok(())
        }
        Err(e) => {
            tracing::error!(
                client_error = e.is_client_error(),
                server_error = e.is_server_error(),
                "{e}"
            );
            Err(e.into())
        }
        Ok(()) => Ok(()),
    }
}

async fn run(api: &Api, command: Command) -> Result<(), ApiError> {
    match command {
        Command::Host { id } => print_json(&api.find_host(&id).await?),
        Command::FindByCustomIdentifier { custom_identifier } => {
            print_json(&api.find_host_by_custom_identifier(&custom_identifier).await?)
        }
        Command::Status { id, status } => {
            api.update_host_status(&id, status).await?;
            tracing::info!(host_id = %id, %status, "host status updated");
            Ok(())
        }
        Command::Retire { id } => {
            api.retire_host(&id).await?;
            tracing::info!(host_id = %id, "host retired");
            Ok(())
        }
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), ApiError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
