//! HTTP session shared by every request a client makes.
//!
//! Wraps a pooled `reqwest::Client` with the base URL, default timeout,
//! default headers and optional auth. The pool is released when the session
//! is dropped.

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Serialize;
use std::time::Duration;

use crate::config::{Auth, ClientConfig};
use crate::error::{FqeError, Result};

/// User agent sent with every request.
const USER_AGENT: &str = concat!("fqe-client/", env!("CARGO_PKG_VERSION"));

/// Status and fully-read body of an HTTP response.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    pub body: Vec<u8>,
}

impl RawResponse {
    /// Returns true for HTTP 200.
    pub fn is_ok(&self) -> bool {
        self.status == StatusCode::OK
    }

    /// Body decoded as UTF-8, replacing invalid sequences.
    pub fn text_lossy(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// A reusable HTTP client context bound to one base URL.
#[derive(Debug)]
pub struct Session {
    base_url: String,
    timeout: Duration,
    auth: Option<Auth>,
    client: Client,
}

impl Session {
    /// Creates a session from the given configuration.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let base_url = config.normalized_base_url()?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .default_headers(headers)
            .user_agent(USER_AGENT)
            .timeout(config.timeout())
            .build()
            .map_err(|e| FqeError::internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            base_url,
            timeout: config.timeout(),
            auth: config.auth.clone(),
            client,
        })
    }

    /// Base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Default per-request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Joins `path` (which must start with `/`) onto the base URL.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Sends a GET request.
    pub async fn get(&self, path: &str, timeout: Option<Duration>) -> Result<RawResponse> {
        let request = self.client.get(self.url(path));
        self.send(request, timeout).await
    }

    /// Sends a POST request with a JSON body.
    pub async fn post_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
        timeout: Option<Duration>,
    ) -> Result<RawResponse> {
        let request = self.client.post(self.url(path)).json(body);
        self.send(request, timeout).await
    }

    /// Sends a POST request with a plain-text body.
    pub async fn post_text(
        &self,
        path: &str,
        body: impl Into<String>,
        timeout: Option<Duration>,
    ) -> Result<RawResponse> {
        let request = self
            .client
            .post(self.url(path))
            .header(CONTENT_TYPE, "text/plain")
            .body(body.into());
        self.send(request, timeout).await
    }

    async fn send(
        &self,
        request: RequestBuilder,
        timeout: Option<Duration>,
    ) -> Result<RawResponse> {
        let request = match &self.auth {
            Some(Auth::Bearer { token }) => request.bearer_auth(token),
            Some(Auth::Basic { username, password }) => {
                request.basic_auth(username, password.as_ref())
            }
            None => request,
        };

        let response = request.timeout(timeout.unwrap_or(self.timeout)).send().await?;
        let status = response.status();
        let body = response.bytes().await?.to_vec();

        Ok(RawResponse { status, body })
    }
}
