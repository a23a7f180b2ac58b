//! HTTP client for the DuckDB federated query engine.
//!
//! [`FqeClient`] owns one [`Session`] for its lifetime and exposes health
//! probing, query execution and a handful of catalog helpers built on the
//! [`sql`](crate::sql) builders.

mod transport;

pub use transport::{RawResponse, Session};

use serde::Serialize;
use serde_json::{Map, Value};
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

use crate::config::{ClientConfig, Endpoint};
use crate::error::{FqeError, Result};
use crate::result::{display_value, value_as_i64, QueryResponse, Table};
use crate::sql::{self, FederatedJoin};

/// Timeout for a single liveness probe.
pub const HEALTH_TIMEOUT: Duration = Duration::from_secs(5);

/// Delay between liveness probes in [`FqeClient::wait_for_ready`].
pub const POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Named query parameters.
pub type Params = Map<String, Value>;

/// A SQL statement plus optional named parameters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryRequest {
    query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    params: Option<Params>,
}

impl QueryRequest {
    /// Creates a request. The SQL must not be blank.
    pub fn new(sql: impl Into<String>) -> Result<Self> {
        let query = sql.into();
        if query.trim().is_empty() {
            return Err(FqeError::invalid_request("SQL must not be empty"));
        }
        Ok(Self {
            query,
            params: None,
        })
    }

    /// Attaches named parameters. An empty map is the same as none.
    pub fn with_params(mut self, params: Params) -> Self {
        self.params = (!params.is_empty()).then_some(params);
        self
    }

    /// The SQL text.
    pub fn sql(&self) -> &str {
        &self.query
    }

    /// The named parameters, if any.
    pub fn params(&self) -> Option<&Params> {
        self.params.as_ref()
    }
}

/// Snapshot of the service state, as reported by [`FqeClient::connection_info`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConnectionInfo {
    pub base_url: String,
    pub healthy: bool,
    pub version: Option<String>,
    pub databases: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Client for one query service instance.
#[derive(Debug)]
pub struct FqeClient {
    session: Session,
    endpoint: Endpoint,
    max_result_rows: u64,
    poll_interval: Duration,
}

impl FqeClient {
    /// Creates a new client with the given configuration.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let session = Session::new(&config)?;
        Ok(Self {
            session,
            endpoint: config.endpoint,
            max_result_rows: config.max_result_rows,
            poll_interval: POLL_INTERVAL,
        })
    }

    /// Overrides the delay between readiness probes.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        self.session.base_url()
    }

    /// The HTTP surface variant in use.
    pub fn endpoint(&self) -> Endpoint {
        self.endpoint
    }

    /// Releases the underlying connection pool.
    pub fn close(self) {
        debug!(base_url = self.base_url(), "closing client");
    }

    /// Checks whether the service answers its liveness probe with 200.
    ///
    /// Never fails: transport errors and other statuses read as unhealthy.
    pub async fn is_healthy(&self) -> bool {
        match self
            .session
            .get(self.endpoint.health_path(), Some(HEALTH_TIMEOUT))
            .await
        {
            Ok(response) => {
                if !response.is_ok() {
                    debug!(status = %response.status, "health probe returned non-200");
                }
                response.is_ok()
            }
            Err(e) => {
                debug!("health probe failed: {}", e);
                false
            }
        }
    }

    /// Polls [`is_healthy`](Self::is_healthy) until it succeeds or `max_wait`
    /// elapses. A zero `max_wait` returns `false` without probing.
    pub async fn wait_for_ready(&self, max_wait: Duration) -> bool {
        let deadline = Instant::now() + max_wait;

        loop {
            if Instant::now() >= deadline {
                return false;
            }
            if self.is_healthy().await {
                return true;
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return false;
            }
            sleep(self.poll_interval.min(remaining)).await;
        }
    }

    /// Executes SQL with optional named parameters.
    pub async fn execute(&self, sql: &str, params: Option<Params>) -> Result<QueryResponse> {
        let mut request = QueryRequest::new(sql)?;
        if let Some(params) = params {
            request = request.with_params(params);
        }
        self.execute_request(&request).await
    }

    /// Sends a prepared request and classifies the 200 body.
    ///
    /// Non-200 statuses become [`FqeError::Query`] with the body verbatim;
    /// nothing is retried.
    pub async fn execute_request(&self, request: &QueryRequest) -> Result<QueryResponse> {
        debug!(sql = request.sql(), endpoint = self.endpoint.as_str(), "executing query");
        let start = Instant::now();

        let response = match self.endpoint {
            Endpoint::Json => self.session.post_json("/query", request, None).await?,
            Endpoint::Raw => {
                if request.params().is_some() {
                    return Err(FqeError::invalid_request(
                        "named parameters are not supported by the raw endpoint",
                    ));
                }
                let path = format!(
                    "/?add_http_cors_header=1&default_format=JSONCompact&max_result_rows={}",
                    self.max_result_rows
                );
                self.session.post_text(&path, request.sql(), None).await?
            }
        };

        if !response.is_ok() {
            let err = FqeError::query(response.status.as_u16(), response.text_lossy());
            warn!("{}", err);
            return Err(err);
        }

        let body = String::from_utf8(response.body)
            .map_err(|e| FqeError::malformed(format!("response body is not valid UTF-8: {e}")))?;
        let result = QueryResponse::from_body(body);

        debug!(
            elapsed_ms = start.elapsed().as_millis() as u64,
            shape = result.kind(),
            "query completed"
        );
        Ok(result)
    }

    /// Executes SQL and normalizes the response into a table.
    pub async fn execute_table(&self, sql: &str, params: Option<Params>) -> Result<Table> {
        Ok(self.execute(sql, params).await?.into_table())
    }

    /// Lists attached databases.
    pub async fn databases(&self) -> Result<Table> {
        self.execute_table(&sql::show_databases(), None).await
    }

    /// Lists tables in `database`, or all federated tables.
    pub async fn tables(&self, database: Option<&str>) -> Result<Table> {
        self.execute_table(&sql::table_list(database), None).await
    }

    /// Describes the columns of a fully qualified table.
    pub async fn describe_table(&self, table: &str) -> Result<Table> {
        self.execute_table(&sql::describe(table), None).await
    }

    /// Counts the rows of a fully qualified table.
    pub async fn count_rows(&self, table: &str) -> Result<i64> {
        let result = self.execute_table(&sql::row_count(table), None).await?;
        count_from_table(&result)
    }

    /// Executes a federated join.
    pub async fn federated_join(&self, join: &FederatedJoin) -> Result<QueryResponse> {
        self.execute(&join.to_sql()?, None).await
    }

    /// Reports health, engine version and attached databases.
    ///
    /// Never fails; a query error is recorded in the `error` field.
    pub async fn connection_info(&self) -> ConnectionInfo {
        let mut info = ConnectionInfo {
            base_url: self.base_url().to_string(),
            healthy: self.is_healthy().await,
            version: None,
            databases: None,
            error: None,
        };

        let details = async {
            let version = self.execute_table(&sql::version(), None).await?;
            let databases = self.databases().await?;
            Ok::<_, FqeError>((version, databases))
        };

        match details.await {
            Ok((version, databases)) => {
                info.version = version.first_cell().map(display_value);
                info.databases = Some(databases.first_column_strings());
            }
            Err(e) => info.error = Some(e.to_string()),
        }

        info
    }
}

/// Reduces a `COUNT(*)` result to an integer; empty results count as zero.
pub fn count_from_table(table: &Table) -> Result<i64> {
    match table.first_cell() {
        None | Some(Value::Null) => Ok(0),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(0),
        Some(cell) => value_as_i64(cell)
            .ok_or_else(|| FqeError::malformed(format!("expected an integer count, got {cell}"))),
    }
}
