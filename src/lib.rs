//! fqe-client - HTTP client for the DuckDB federated query engine.
//!
//! This library exposes the client, result normalization and SQL builders,
//! plus the smoke-test suite used by the `fqe` binary.

pub mod client;
pub mod config;
pub mod error;
pub mod logging;
pub mod result;
pub mod smoke;
pub mod sql;
