//! Smoke suite tests against a fake federated engine.

use std::time::Duration;

use fqe_client::client::FqeClient;
use fqe_client::config::{ClientConfig, Endpoint};
use fqe_client::smoke::{SmokeOutcome, SmokeSuite};

use super::common::{closed_port_url, FakeEngine, MockService, Reply};

async fn run_against(engine: FakeEngine) -> SmokeOutcome {
    let service = MockService::start(move |request| engine.reply(request)).await;
    let client = service.client(Endpoint::Raw);
    SmokeSuite::new(&client, Duration::from_secs(5)).run().await
}

#[tokio::test]
async fn test_all_checks_pass() {
    let outcome = run_against(FakeEngine::default()).await;

    let SmokeOutcome::Completed(report) = &outcome else {
        panic!("expected completed run, got {outcome:?}");
    };
    assert_eq!(report.total(), 5);
    assert_eq!(report.passed(), 5);
    assert_eq!(outcome.exit_code(), 0);

    let rendered = outcome.to_string();
    assert!(rendered.contains("Message: DuckDB FQE is working!"));
    assert!(rendered.contains("postgres: 100,000 customers"));
    assert!(rendered.contains("Customer 1: PG='Javier Lewis' | MySQL='Javier Lewis'"));
    assert!(rendered.contains("MariaDB: 100,000 customers, avg birth year: 1958"));
    assert!(rendered.contains("Passed: 5/5"));
}

#[tokio::test]
async fn test_three_of_five_still_succeeds() {
    let engine = FakeEngine::default()
        .failing(" JOIN ")
        .failing("UNION ALL");
    let outcome = run_against(engine).await;

    let SmokeOutcome::Completed(report) = &outcome else {
        panic!("expected completed run, got {outcome:?}");
    };
    assert_eq!(report.passed(), 3);
    assert_eq!(outcome.exit_code(), 0);
}

#[tokio::test]
async fn test_two_of_five_fails() {
    let engine = FakeEngine::default()
        .failing(" JOIN ")
        .failing("UNION ALL")
        .failing("COUNT(*) AS count");
    let outcome = run_against(engine).await;

    let SmokeOutcome::Completed(report) = &outcome else {
        panic!("expected completed run, got {outcome:?}");
    };
    assert_eq!(report.passed(), 2);
    assert!(!report.checks[2].passed);
    assert_eq!(outcome.exit_code(), 1);
}

#[tokio::test]
async fn test_error_object_with_200_fails_checks() {
    let body = r#"{"error":"Binder Error: table customer does not exist"}"#;
    let engine = FakeEngine::default().answering(body);
    let outcome = run_against(engine).await;

    let SmokeOutcome::Completed(report) = &outcome else {
        panic!("expected completed run, got {outcome:?}");
    };
    let failed: Vec<&str> = report
        .checks
        .iter()
        .filter(|c| !c.passed)
        .map(|c| c.name)
        .collect();
    assert_eq!(
        failed,
        vec![
            "Basic Connectivity",
            "Database Table Counts",
            "Cross-Database Join",
            "Multi-Database Aggregation",
        ]
    );
    assert_eq!(report.passed(), 1);
    assert_ne!(outcome.exit_code(), 0);
    assert!(outcome
        .to_string()
        .contains("Unexpected response: Binder Error: table customer does not exist"));
}

#[tokio::test]
async fn test_acknowledgement_text_fails_checks() {
    let outcome = run_against(FakeEngine::default().answering("Ok.")).await;

    let SmokeOutcome::Completed(report) = &outcome else {
        panic!("expected completed run, got {outcome:?}");
    };
    assert_eq!(report.passed(), 1);
    assert!(report.checks[1].passed);
    assert_eq!(outcome.exit_code(), 1);
    assert!(outcome.to_string().contains("Unexpected text response: Ok."));
}

#[tokio::test]
async fn test_non_tabular_database_list_is_missing_databases() {
    let service = MockService::start(|request| {
        if request.sql() == "SHOW DATABASES" {
            Reply::json(serde_json::json!({"error": "not ready"}))
        } else {
            FakeEngine::default().reply(request)
        }
    })
    .await;
    let client = service.client(Endpoint::Raw);
    let outcome = SmokeSuite::new(&client, Duration::from_secs(5)).run().await;

    let SmokeOutcome::MissingDatabases { missing, found } = &outcome else {
        panic!("expected missing databases, got {outcome:?}");
    };
    assert_eq!(missing.len(), 3);
    assert!(found.is_empty());
    assert_eq!(outcome.exit_code(), 1);
}

#[tokio::test]
async fn test_missing_database_stops_run() {
    let engine = FakeEngine {
        databases: vec!["memory", "postgres", "mysql"],
        ..FakeEngine::default()
    };
    let outcome = run_against(engine).await;

    assert_eq!(
        outcome,
        SmokeOutcome::MissingDatabases {
            missing: vec!["mariadb".to_string()],
            found: vec![
                "memory".to_string(),
                "postgres".to_string(),
                "mysql".to_string()
            ],
        }
    );
    assert_eq!(outcome.exit_code(), 1);
}

#[tokio::test]
async fn test_unavailable_service() {
    let base_url = closed_port_url().await;
    let client =
        FqeClient::new(ClientConfig::new(base_url.clone()).with_endpoint(Endpoint::Raw)).unwrap();

    let outcome = SmokeSuite::new(&client, Duration::ZERO).run().await;
    assert_eq!(outcome, SmokeOutcome::Unavailable { base_url });
    assert_eq!(outcome.exit_code(), 1);
}
