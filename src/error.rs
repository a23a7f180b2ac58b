//! Error types for the FQE client.
//!
//! Separates "service unreachable" (transport) from "service rejected the
//! query" (non-200 status) so callers can decide on their own retry policy.

use std::fmt;
use thiserror::Error;

/// Classification of network-level failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// Connection refused, DNS failure, unreachable host.
    Connect,
    /// The request did not complete within its timeout.
    Timeout,
    /// Any other transport failure (TLS, broken body stream, redirects).
    Other,
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Connect => "connect",
            Self::Timeout => "timeout",
            Self::Other => "other",
        };
        f.write_str(s)
    }
}

/// Main error type for FQE client operations.
#[derive(Error, Debug)]
pub enum FqeError {
    /// The service could not be reached or did not answer in time.
    #[error("Transport error ({kind}): {message}")]
    Transport {
        kind: TransportErrorKind,
        message: String,
    },

    /// The service answered with a non-200 status.
    #[error("Query failed with status {status}: {body}")]
    Query { status: u16, body: String },

    /// The service answered 200 but the body could not be interpreted.
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// The request was rejected before being sent.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Configuration errors (invalid config file, bad base URL, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal errors (HTTP client construction, unexpected states).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl FqeError {
    /// Creates a transport error of the given kind.
    pub fn transport(kind: TransportErrorKind, msg: impl Into<String>) -> Self {
        Self::Transport {
            kind,
            message: msg.into(),
        }
    }

    /// Creates a query error carrying the status code and body verbatim.
    pub fn query(status: u16, body: impl Into<String>) -> Self {
        Self::Query {
            status,
            body: body.into(),
        }
    }

    /// Creates a malformed response error with the given message.
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedResponse(msg.into())
    }

    /// Creates an invalid request error with the given message.
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates an internal error with the given message.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns true if the service could not be reached at all.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }

    /// Returns the HTTP status for query errors.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Query { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Transport { .. } => "Transport Error",
            Self::Query { .. } => "Query Error",
            Self::MalformedResponse(_) => "Malformed Response",
            Self::InvalidRequest(_) => "Invalid Request",
            Self::Config(_) => "Configuration Error",
            Self::Internal(_) => "Internal Error",
        }
    }
}

impl From<reqwest::Error> for FqeError {
    fn from(e: reqwest::Error) -> Self {
        let kind = if e.is_timeout() {
            TransportErrorKind::Timeout
        } else if e.is_connect() {
            TransportErrorKind::Connect
        } else {
            TransportErrorKind::Other
        };
        Self::transport(kind, e.to_string())
    }
}

/// Result type alias using FqeError.
pub type Result<T> = std::result::Result<T, FqeError>;
