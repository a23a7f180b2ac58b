//! Query execution tests against the mock service.

use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use pretty_assertions::assert_eq;
use serde_json::{json, Map, Value};
use std::time::Duration;

use fqe_client::client::FqeClient;
use fqe_client::config::{Auth, ClientConfig, Endpoint};
use fqe_client::error::{FqeError, TransportErrorKind};
use fqe_client::result::QueryResponse;
use fqe_client::sql::FederatedJoin;

use super::common::{closed_port_url, compact, MockService, Reply};

#[tokio::test]
async fn test_execute_json_endpoint() {
    let service = MockService::start(|_| {
        Reply::json(json!({"columns": ["message"], "data": [["hello"]]}))
    })
    .await;
    let client = service.client(Endpoint::Json);

    let mut params = Map::new();
    params.insert("name".to_string(), json!("hello"));
    let response = client.execute("SELECT $name AS message", Some(params)).await.unwrap();

    assert_eq!(
        response,
        QueryResponse::Tabular {
            columns: vec!["message".to_string()],
            rows: vec![vec![json!("hello")]],
        }
    );

    let request = &service.queries()[0];
    assert_eq!(request.path, "/query");
    assert_eq!(
        request.headers.get(CONTENT_TYPE).unwrap(),
        "application/json"
    );
    let body: Value = serde_json::from_str(&request.body).unwrap();
    assert_eq!(
        body,
        json!({"query": "SELECT $name AS message", "params": {"name": "hello"}})
    );
}

#[tokio::test]
async fn test_execute_raw_endpoint() {
    let service =
        MockService::start(|_| Reply::json(compact(&["answer"], json!([["42"]])))).await;
    let client = service.client(Endpoint::Raw);

    let table = client.execute_table("SELECT 42 AS answer", None).await.unwrap();
    assert_eq!(table.columns, vec!["answer".to_string()]);
    assert_eq!(table.first_cell(), Some(&json!("42")));

    let request = &service.queries()[0];
    assert_eq!(request.path, "/");
    assert_eq!(
        request.query.as_deref(),
        Some("add_http_cors_header=1&default_format=JSONCompact&max_result_rows=1000")
    );
    assert_eq!(request.headers.get(CONTENT_TYPE).unwrap(), "text/plain");
    assert_eq!(request.body, "SELECT 42 AS answer");
}

#[tokio::test]
async fn test_raw_endpoint_rejects_params() {
    let service = MockService::start(|_| Reply::ok("[]")).await;
    let client = service.client(Endpoint::Raw);

    let mut params = Map::new();
    params.insert("id".to_string(), json!(1));
    let err = client.execute("SELECT $id", Some(params)).await.unwrap_err();

    assert!(matches!(err, FqeError::InvalidRequest(_)));
    assert!(service.requests().is_empty());
}

#[tokio::test]
async fn test_empty_sql_is_not_sent() {
    let service = MockService::start(|_| Reply::ok("[]")).await;
    let client = service.client(Endpoint::Json);

    let err = client.execute("   ", None).await.unwrap_err();
    assert!(matches!(err, FqeError::InvalidRequest(_)));
    assert!(service.requests().is_empty());
}

#[tokio::test]
async fn test_non_200_is_query_error_with_verbatim_body() {
    let body = "Catalog Error: Table with name nope does not exist!\nDid you mean \"note\"?";
    let service = MockService::start(move |_| Reply::new(400, body)).await;
    let client = service.client(Endpoint::Json);

    match client.execute("SELECT * FROM nope", None).await {
        Err(FqeError::Query { status, body: b }) => {
            assert_eq!(status, 400);
            assert_eq!(b, body);
        }
        other => panic!("expected query error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_non_json_body_is_raw_text() {
    let service = MockService::start(|_| Reply::ok("Ok.")).await;
    let client = service.client(Endpoint::Raw);

    let response = client
        .execute("ATTACH 'host=pg' AS postgres (TYPE postgres)", None)
        .await
        .unwrap();
    assert_eq!(response, QueryResponse::RawText("Ok.".to_string()));
}

#[tokio::test]
async fn test_invalid_utf8_is_malformed() {
    let service = MockService::start(|_| Reply::ok(vec![0xff, 0xfe, 0x00])).await;
    let client = service.client(Endpoint::Json);

    let err = client.execute("SELECT 1", None).await.unwrap_err();
    assert!(matches!(err, FqeError::MalformedResponse(_)));
}

#[tokio::test]
async fn test_unreachable_is_transport_error() {
    let client = FqeClient::new(ClientConfig::new(closed_port_url().await)).unwrap();

    match client.execute("SELECT 1", None).await {
        Err(FqeError::Transport { kind, .. }) => assert_eq!(kind, TransportErrorKind::Connect),
        other => panic!("expected transport error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_slow_response_is_timeout() {
    let service =
        MockService::start(|_| Reply::ok("[]").delayed(Duration::from_secs(3))).await;
    let client = FqeClient::new(service.config(Endpoint::Json).with_timeout(1)).unwrap();

    match client.execute("SELECT 1", None).await {
        Err(FqeError::Transport { kind, .. }) => assert_eq!(kind, TransportErrorKind::Timeout),
        other => panic!("expected timeout, got {other:?}"),
    }
}

#[tokio::test]
async fn test_bearer_auth_header() {
    let service = MockService::start(|_| Reply::ok("[]")).await;
    let config = service.config(Endpoint::Json).with_auth(Auth::Bearer {
        token: "s3cret".to_string(),
    });
    let client = FqeClient::new(config).unwrap();

    client.execute("SELECT 1", None).await.unwrap();
    assert_eq!(
        service.queries()[0].headers.get(AUTHORIZATION).unwrap(),
        "Bearer s3cret"
    );
}

#[tokio::test]
async fn test_count_rows() {
    let service = MockService::start(|request| {
        if request.sql().contains("empty") {
            Reply::json(json!([]))
        } else {
            Reply::json(json!([{"count": 1500}]))
        }
    })
    .await;
    let client = service.client(Endpoint::Json);

    assert_eq!(client.count_rows("postgres.public.customer").await.unwrap(), 1500);
    assert_eq!(client.count_rows("postgres.public.empty").await.unwrap(), 0);
    assert_eq!(
        service.queries()[0].sql(),
        "SELECT COUNT(*) AS count FROM postgres.public.customer"
    );
}

#[tokio::test]
async fn test_count_rows_propagates_query_error() {
    let service = MockService::start(|_| Reply::new(404, "no such table")).await;
    let client = service.client(Endpoint::Json);

    let err = client.count_rows("mysql.db1.missing").await.unwrap_err();
    assert_eq!(err.status(), Some(404));
}

#[tokio::test]
async fn test_catalog_helpers_send_expected_sql() {
    let service = MockService::start(|_| Reply::json(json!([{"name": "customer"}]))).await;
    let client = service.client(Endpoint::Json);

    client.databases().await.unwrap();
    client.tables(Some("postgres")).await.unwrap();
    client.tables(None).await.unwrap();
    let described = client.describe_table("mysql.db1.customer").await.unwrap();
    assert_eq!(described.columns, vec!["name".to_string()]);

    let sent: Vec<String> = service.queries().iter().map(|r| r.sql()).collect();
    assert_eq!(
        sent,
        vec![
            "SHOW DATABASES",
            "SHOW TABLES FROM postgres",
            "SELECT * FROM federated_tables",
            "DESCRIBE mysql.db1.customer",
        ]
    );
}

#[tokio::test]
async fn test_federated_join_sends_built_sql() {
    let service = MockService::start(|_| Reply::json(json!([{"x": 2}]))).await;
    let client = service.client(Endpoint::Json);

    let join = FederatedJoin::new(["a", "b"], ["a.id=b.id"])
        .select(["a.x"])
        .filter(["a.x>1"])
        .limit(10);
    let table = client.federated_join(&join).await.unwrap().into_table();

    assert_eq!(table.first_cell(), Some(&json!(2)));
    assert_eq!(
        service.queries()[0].sql(),
        "SELECT a.x FROM a JOIN b ON a.id=b.id WHERE a.x>1 LIMIT 10"
    );
}

#[tokio::test]
async fn test_connection_info() {
    let service = MockService::start(|request| match request.sql().as_str() {
        "SELECT version()" => Reply::json(json!([{"version()": "v1.1.3"}])),
        "SHOW DATABASES" => Reply::json(json!([
            {"database_name": "memory"},
            {"database_name": "postgres"}
        ])),
        _ => Reply::ok("Ok."),
    })
    .await;
    let client = service.client(Endpoint::Json);

    let info = client.connection_info().await;
    assert_eq!(info.base_url, service.base_url);
    assert!(info.healthy);
    assert_eq!(info.version.as_deref(), Some("v1.1.3"));
    assert_eq!(
        info.databases,
        Some(vec!["memory".to_string(), "postgres".to_string()])
    );
    assert_eq!(info.error, None);
}

#[tokio::test]
async fn test_connection_info_captures_errors() {
    let service = MockService::start(|request| {
        if request.path == "/health" {
            Reply::ok("ok")
        } else {
            Reply::new(500, "engine exploded")
        }
    })
    .await;
    let client = service.client(Endpoint::Json);

    let info = client.connection_info().await;
    assert!(info.healthy);
    assert_eq!(info.version, None);
    assert_eq!(info.databases, None);
    assert_eq!(
        info.error.as_deref(),
        Some("Query failed with status 500: engine exploded")
    );
}
