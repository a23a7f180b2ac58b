//! Command-line argument parsing for the `fqe` binary.

use clap::{Parser, Subcommand};
use serde_json::Value;
use std::path::PathBuf;

use fqe_client::client::Params;
use fqe_client::config::{ClientConfig, Endpoint, DEFAULT_BASE_URL, DEFAULT_RAW_BASE_URL};
use fqe_client::error::{FqeError, Result};
use fqe_client::sql::FederatedJoin;

/// Client and smoke tests for the DuckDB federated query engine.
#[derive(Parser, Debug)]
#[command(name = "fqe")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Base URL of the query service
    #[arg(long, global = true, env = "FQE_URL", value_name = "URL")]
    pub url: Option<String>,

    /// Request timeout in seconds
    #[arg(long, global = true, env = "FQE_TIMEOUT", value_name = "SECS")]
    pub timeout: Option<u64>,

    /// HTTP surface: "json" (POST /query) or "raw" (POST / with plain SQL)
    #[arg(long, global = true, env = "FQE_ENDPOINT", value_parser = parse_endpoint)]
    pub endpoint: Option<Endpoint>,

    /// Config file path
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Run the connectivity smoke tests
    Smoke {
        /// Seconds to wait for the service to become ready
        #[arg(long, default_value_t = 60)]
        wait: u64,
    },

    /// Execute a SQL statement and print the result
    Query {
        /// SQL to execute
        sql: String,

        /// Named parameters as a JSON object
        #[arg(long, value_name = "JSON")]
        params: Option<String>,

        /// Print the normalized table as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show health, version and attached databases
    Info,

    /// Check service health
    Health {
        /// Seconds to wait for the service to become ready (0 = probe once)
        #[arg(long, default_value_t = 0)]
        wait: u64,
    },

    /// List tables, optionally in one attached database
    Tables {
        #[arg(short = 'd', long, value_name = "DATABASE")]
        database: Option<String>,
    },

    /// Describe a table (database.schema.table)
    Describe { table: String },

    /// Count the rows of a table (database.schema.table)
    Count { table: String },

    /// Join tables across attached databases
    Join {
        /// Table to join, in order (repeatable)
        #[arg(short = 't', long = "table", required = true)]
        tables: Vec<String>,

        /// ON condition for the next table (repeatable)
        #[arg(long = "on")]
        on: Vec<String>,

        /// Column to select (repeatable, default *)
        #[arg(long = "select")]
        select: Vec<String>,

        /// WHERE condition, combined with AND (repeatable)
        #[arg(long = "where")]
        filters: Vec<String>,

        #[arg(long)]
        limit: Option<u64>,
    },
}

fn parse_endpoint(s: &str) -> std::result::Result<Endpoint, String> {
    Endpoint::parse(s).ok_or_else(|| format!("Invalid endpoint: {s}. Expected: json or raw"))
}

impl Command {
    /// Built-in settings when no config file exists. The smoke tests target
    /// the DuckDB HTTP server directly.
    pub fn default_client_config(&self) -> ClientConfig {
        match self {
            Self::Smoke { .. } => {
                ClientConfig::new(DEFAULT_RAW_BASE_URL).with_endpoint(Endpoint::Raw)
            }
            _ => ClientConfig::new(DEFAULT_BASE_URL),
        }
    }

    /// Builds the federated join described by a `join` command.
    pub fn federated_join(&self) -> Option<FederatedJoin> {
        match self {
            Self::Join {
                tables,
                on,
                select,
                filters,
                limit,
            } => {
                let mut join = FederatedJoin::new(tables.clone(), on.clone())
                    .select(select.clone())
                    .filter(filters.clone());
                join.limit = *limit;
                Some(join)
            }
            _ => None,
        }
    }
}

impl Cli {
    /// Parses command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Returns the config file path to use.
    pub fn config_path(&self) -> PathBuf {
        self.config
            .clone()
            .unwrap_or_else(fqe_client::config::Config::default_path)
    }

    /// Resolves the client settings: flags override the config file, which
    /// overrides the command's built-in defaults.
    pub fn client_config(&self, file: Option<ClientConfig>) -> ClientConfig {
        let mut config = file.unwrap_or_else(|| self.command.default_client_config());
        if let Some(url) = &self.url {
            config.base_url = url.clone();
        }
        if let Some(timeout) = self.timeout {
            config.timeout_secs = timeout;
        }
        if let Some(endpoint) = self.endpoint {
            config.endpoint = endpoint;
        }
        config
    }
}

/// Parses `--params` into a JSON object.
pub fn parse_params(raw: Option<&str>) -> Result<Option<Params>> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(Some(map)),
        Ok(_) => Err(FqeError::invalid_request("--params must be a JSON object")),
        Err(e) => Err(FqeError::invalid_request(format!("Invalid --params JSON: {e}"))),
    }
}
