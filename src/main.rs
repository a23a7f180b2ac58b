//! fqe - client and smoke tests for the DuckDB federated query engine.

mod cli;

use cli::{parse_params, Cli, Command};
use fqe_client::client::FqeClient;
use fqe_client::config::Config;
use fqe_client::error::{FqeError, Result};
use fqe_client::logging;
use fqe_client::smoke::SmokeSuite;
use std::time::Duration;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let cli = Cli::parse_args();
    logging::init_stderr_logging(cli.verbose);

    match run(cli).await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            error!("{}: {}", e.category(), e);
            std::process::exit(1);
        }
    }
}

async fn run(cli: Cli) -> Result<i32> {
    let config_path = cli.config_path();
    let file = if config_path.exists() {
        info!("Loading config from: {}", config_path.display());
        Some(Config::load_from_file(&config_path)?.client)
    } else {
        None
    };

    let client = FqeClient::new(cli.client_config(file))?;

    let code = match &cli.command {
        Command::Smoke { wait } => {
            let outcome = SmokeSuite::new(&client, Duration::from_secs(*wait)).run().await;
            println!("{outcome}");
            outcome.exit_code()
        }
        Command::Query { sql, params, json } => {
            let params = parse_params(params.as_deref())?;
            let table = client.execute_table(sql, params).await?;
            if *json {
                let out = serde_json::to_string_pretty(&table)
                    .map_err(|e| FqeError::internal(format!("Failed to encode result: {e}")))?;
                println!("{out}");
            } else {
                println!("{table}");
            }
            0
        }
        Command::Info => {
            let info = client.connection_info().await;
            let out = serde_json::to_string_pretty(&info)
                .map_err(|e| FqeError::internal(format!("Failed to encode info: {e}")))?;
            println!("{out}");
            if info.healthy {
                0
            } else {
                1
            }
        }
        Command::Health { wait } => {
            let healthy = if *wait == 0 {
                client.is_healthy().await
            } else {
                client.wait_for_ready(Duration::from_secs(*wait)).await
            };
            println!("{}", if healthy { "healthy" } else { "unavailable" });
            if healthy {
                0
            } else {
                1
            }
        }
        Command::Tables { database } => {
            println!("{}", client.tables(database.as_deref()).await?);
            0
        }
        Command::Describe { table } => {
            println!("{}", client.describe_table(table).await?);
            0
        }
        Command::Count { table } => {
            println!("{}", client.count_rows(table).await?);
            0
        }
        Command::Join { .. } => {
            let join = cli
                .command
                .federated_join()
                .ok_or_else(|| FqeError::internal("join command without join arguments"))?;
            println!("{}", client.federated_join(&join).await?.into_table());
            0
        }
    };

    client.close();
    Ok(code)
}
