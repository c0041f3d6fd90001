//! One-shot ask flow against a mocked HTTP service
//!
//! Wires `HttpService` into the controller and drives it the way
//! `askdb ask` does, with wiremock standing in for the remote service.

use std::sync::Arc;
use std::time::Duration;

use askdb::cli::{parse_args, render_transcript, run_ask, Mode};
use askdb::controller::{Controller, Timings};
use askdb_api::HttpService;
use askdb_core::{ConnectionState, MessageKind};
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fast_timings() -> Timings {
    Timings {
        settle_delay: Duration::from_millis(10),
        refresh_delay: Duration::from_millis(10),
    }
}

fn controller_for(server: &MockServer) -> Controller {
    let service = HttpService::new(&server.uri(), Duration::from_secs(5)).unwrap();
    Controller::new(Arc::new(service), fast_timings())
}

async fn mount_session(server: &MockServer, tables: serde_json::Value) {
    Mock::given(method("POST"))
        .and(path("/set-api-key/"))
        .and(body_json(json!({"api_key": "sk-abc"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "API key set"})))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/connect-db/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"message": "Database connected successfully!"})),
        )
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/get-tables/"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"data": {"tables": tables}})),
        )
        .mount(server)
        .await;
}

fn ask_args(argv: &[&str]) -> askdb::cli::AskArgs {
    let mut full = vec!["askdb", "ask"];
    full.extend_from_slice(argv);
    match parse_args(full).unwrap().mode() {
        Mode::Ask(args) => args,
        Mode::Tui => panic!("expected ask mode"),
    }
}

// =============================================================================
// Full flow
// =============================================================================

/// Test: ask then execute, ending with the natural-language answer
#[tokio::test]
async fn test_ask_and_execute_flow() {
    let server = MockServer::start().await;
    mount_session(&server, json!(["users", "orders"])).await;
    Mock::given(method("POST"))
        .and(path("/ask-db/"))
        .and(body_json(json!({"question": "how many users"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"query": "SELECT COUNT(*) FROM users"},
            "explanation": "Counts the rows of users"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/execute-db/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"rows": [{"count": 2}], "nl_answer": "There are 2 users."}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut controller = controller_for(&server);
    let args = ask_args(&["--database", "shop", "--execute", "how", "many", "users"]);
    let code = run_ask(&mut controller, Some("sk-abc"), &args).await.unwrap();

    assert_eq!(code, 0);
    let session = controller.session();
    assert_eq!(session.auth_state(), ConnectionState::Connected);
    assert_eq!(session.db_state(), ConnectionState::Connected);
    assert_eq!(session.schema(), ["users", "orders"]);
    assert_eq!(session.pending_query(), "SELECT COUNT(*) FROM users");

    let last = session.log().last().unwrap();
    assert_eq!(last.kind, MessageKind::Result);
    assert_eq!(last.text, "There are 2 users.");
    assert!(session
        .log()
        .iter()
        .any(|m| m.text == "Successfully connected to shop"));
}

/// Test: without --execute the generated SQL is left pending
#[tokio::test]
async fn test_ask_without_execute() {
    let server = MockServer::start().await;
    mount_session(&server, json!(["users"])).await;
    Mock::given(method("POST"))
        .and(path("/ask-db/"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"query": "SELECT * FROM users"})),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/execute-db/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(0)
        .mount(&server)
        .await;

    let mut controller = controller_for(&server);
    let args = ask_args(&["list", "users"]);
    let code = run_ask(&mut controller, Some("sk-abc"), &args).await.unwrap();

    assert_eq!(code, 0);
    let last = controller.session().log().last().unwrap();
    assert_eq!(last.kind, MessageKind::Sql);
    assert!(last.is_executable());
}

/// Test: a rejected key stops the flow and fails the run
#[tokio::test]
async fn test_rejected_key_fails_run() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/set-api-key/"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({"message": "Invalid API key"})),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/connect-db/"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let mut controller = controller_for(&server);
    let args = ask_args(&["anything"]);
    let code = run_ask(&mut controller, Some("sk-abc"), &args).await.unwrap();

    assert_eq!(code, 1);
    assert_eq!(controller.session().auth_state(), ConnectionState::Error);
}

/// Test: a structural statement refreshes the table list afterwards
#[tokio::test]
async fn test_structural_statement_refreshes_tables() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/set-api-key/"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/connect-db/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/get-tables/"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"data": {"tables": ["users"]}})),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/get-tables/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"data": {"tables": ["users", "audit"]}})),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/ask-db/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"query": "CREATE TABLE audit (id int)"}
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/execute-db/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {"rows": []}})))
        .mount(&server)
        .await;

    let mut controller = controller_for(&server);
    let args = ask_args(&["--execute", "create", "an", "audit", "table"]);
    let code = run_ask(&mut controller, Some("sk-abc"), &args).await.unwrap();

    assert_eq!(code, 0);
    let session = controller.session();
    assert_eq!(session.schema(), ["users", "audit"]);
    assert!(session
        .log()
        .last()
        .unwrap()
        .text
        .starts_with("Tables refreshed! Found 2 tables"));
}

/// Test: the run needs an API key before anything is sent
#[tokio::test]
async fn test_missing_api_key() {
    let server = MockServer::start().await;
    let mut controller = controller_for(&server);
    let args = ask_args(&["anything"]);

    let result = run_ask(&mut controller, None, &args).await;

    assert!(matches!(result, Err(askdb::cli::Error::MissingArgument(_))));
    assert!(server.received_requests().await.unwrap_or_default().is_empty());
}

/// Test: the JSON transcript is an array of messages with their kinds
#[tokio::test]
async fn test_json_transcript_after_flow() {
    let server = MockServer::start().await;
    mount_session(&server, json!([])).await;
    Mock::given(method("POST"))
        .and(path("/ask-db/"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"message": "Hello! Ask me about your data."})),
        )
        .mount(&server)
        .await;

    let mut controller = controller_for(&server);
    let args = ask_args(&["--json", "hello"]);
    run_ask(&mut controller, Some("sk-abc"), &args).await.unwrap();

    let mut out = Vec::new();
    render_transcript(controller.session().log(), true, &mut out).unwrap();
    let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
    let messages = value.as_array().unwrap();
    assert_eq!(messages.len(), controller.session().log().len());
    assert_eq!(
        messages.last().unwrap()["text"],
        json!("Hello! Ask me about your data.")
    );
}

/// Test: a 2xx execute reply carrying an API key error invalidates the key
/// and skips the structural refresh
#[tokio::test]
async fn test_execute_error_envelope_invalidates_key() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/set-api-key/"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/connect-db/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/get-tables/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"data": {"tables": ["users", "orders"]}})),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/ask-db/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"query": "DROP TABLE orders"}
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/execute-db/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"error": "No API key set"})))
        .expect(1)
        .mount(&server)
        .await;

    let mut controller = controller_for(&server);
    let args = ask_args(&["--execute", "drop", "the", "orders", "table"]);
    let code = run_ask(&mut controller, Some("sk-abc"), &args).await.unwrap();

    // Outlast the refresh delay in case one was scheduled anyway
    tokio::time::sleep(Duration::from_millis(50)).await;
    controller.try_process();

    assert_eq!(code, 1);
    let session = controller.session();
    assert_eq!(session.auth_state(), ConnectionState::Error);
    assert_eq!(session.schema(), ["users", "orders"]);
    assert_eq!(controller.outstanding(), 0);

    let tail: Vec<_> = session.log().iter().rev().take(2).collect();
    assert_eq!(tail[1].kind, MessageKind::Error);
    assert_eq!(tail[1].text, "API Key Error: No API key set");
    assert_eq!(tail[0].kind, MessageKind::Warning);

    let refreshes = server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|r| r.url.path() == "/get-tables/")
        .count();
    assert_eq!(refreshes, 1);
}
