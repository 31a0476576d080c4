//! Integration tests for the downstream agent forwarder
//!
//! Tests behavioral contracts against a mock agent service:
//! - payload shape and the year stamped at call time
//! - the four result classes (JSON, status error, bad JSON, transport error)
//! - JSON re-serialization

use agent_relay::forwarder::AgentForwarder;
use agent_relay::testing::{FixedClock, SteppingClock};
use chrono::Datelike;
use serde_json::{json, Value};
use std::net::TcpListener;
use std::sync::Arc;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn run_url(server: &MockServer) -> String {
    format!("{}/run", server.uri())
}

/// URL on a port that was just released, so nothing is listening there
fn unreachable_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{port}/run")
}

async fn sent_payloads(server: &MockServer) -> Vec<Value> {
    server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .map(|request| serde_json::from_slice(&request.body).unwrap())
        .collect()
}

#[tokio::test]
async fn test_forwarder_posts_topic_and_current_year() {
    let mock_server = MockServer::start().await;
    let year = chrono::Local::now().year().to_string();

    Mock::given(method("POST"))
        .and(path("/run"))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({"topic": "AI agents", "current_year": year})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"a": 1})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let forwarder = AgentForwarder::new(run_url(&mock_server));
    let result = forwarder.forward("AI agents").await;

    let parsed: Value = serde_json::from_str(&result).unwrap();
    assert_eq!(parsed, json!({"a": 1}));
}

#[tokio::test]
async fn test_forwarder_returns_compact_json_in_downstream_key_order() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/run"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            "{ \"zeta\": 1,\n  \"alpha\": {\"nested\": [1, 2]} }",
            "application/json",
        ))
        .mount(&mock_server)
        .await;

    let forwarder = AgentForwarder::new(run_url(&mock_server));
    let result = forwarder.forward("orden").await;

    assert_eq!(result, r#"{"zeta":1,"alpha":{"nested":[1,2]}}"#);
}

#[tokio::test]
async fn test_forwarder_reports_not_found_as_agent_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/run"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let forwarder = AgentForwarder::new(run_url(&mock_server));
    let result = forwarder.forward("hola").await;

    assert!(
        result.starts_with("Error al llamar al agente:"),
        "unexpected result: {result}"
    );
    assert!(result.contains("404"));
}

#[tokio::test]
async fn test_forwarder_reports_server_error_even_with_json_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/run"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"error": "crew crashed"})))
        .mount(&mock_server)
        .await;

    let forwarder = AgentForwarder::new(run_url(&mock_server));
    let result = forwarder.forward("hola").await;

    assert!(result.starts_with("Error al llamar al agente:"));
    assert!(result.contains("500"));
}

#[tokio::test]
async fn test_forwarder_reports_malformed_json_with_raw_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/run"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not-json"))
        .mount(&mock_server)
        .await;

    let forwarder = AgentForwarder::new(run_url(&mock_server));
    let result = forwarder.forward("hola").await;

    assert!(
        result.starts_with("Error al decodificar JSON:"),
        "unexpected result: {result}"
    );
    assert!(result.contains("not-json"));
    assert!(result.contains(". Contenido: "));
}

#[tokio::test]
async fn test_forwarder_reports_unreachable_agent_as_transport_error() {
    let forwarder = AgentForwarder::new(unreachable_url());
    let result = forwarder.forward("hola").await;

    assert!(
        result.starts_with("Error en la solicitud HTTP:"),
        "unexpected result: {result}"
    );
}

#[tokio::test]
async fn test_forwarder_stamps_year_at_each_call_across_new_year() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/run"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(2)
        .mount(&mock_server)
        .await;

    let clock = Arc::new(SteppingClock::across_new_year(2024));
    let forwarder = AgentForwarder::with_clock(run_url(&mock_server), clock.clone());

    forwarder.forward("before midnight").await;
    forwarder.forward("after midnight").await;

    let payloads = sent_payloads(&mock_server).await;
    assert_eq!(
        payloads,
        vec![
            json!({"topic": "before midnight", "current_year": "2024"}),
            json!({"topic": "after midnight", "current_year": "2025"}),
        ]
    );
    assert_eq!(clock.reads(), 2);
}

#[tokio::test]
async fn test_forwarder_pads_year_to_four_digits() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&mock_server)
        .await;

    let forwarder =
        AgentForwarder::with_clock(run_url(&mock_server), Arc::new(FixedClock::at_year_end(987)));
    forwarder.forward("history").await;

    let payloads = sent_payloads(&mock_server).await;
    assert_eq!(payloads[0]["current_year"], "0987");
}

#[tokio::test]
async fn test_forwarder_does_not_retry_failures() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/run"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&mock_server)
        .await;

    let forwarder = AgentForwarder::new(run_url(&mock_server));
    let result = forwarder.forward("hola").await;

    assert!(result.starts_with("Error al llamar al agente:"));
    // expect(1) is verified when the mock server drops
}

#[tokio::test]
async fn test_forwarder_does_not_follow_redirects() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/run"))
        .respond_with(
            ResponseTemplate::new(307).insert_header("location", "/other"),
        )
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/other"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"redirected": true})))
        .expect(0)
        .mount(&mock_server)
        .await;

    let forwarder = AgentForwarder::new(run_url(&mock_server));
    let result = forwarder.forward("hola").await;

    assert!(
        result.starts_with("Error al llamar al agente:"),
        "unexpected result: {result}"
    );
    assert!(result.contains("307"));
}

#[tokio::test]
async fn test_forwarder_reports_3xx_with_json_body_as_agent_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/run"))
        .respond_with(ResponseTemplate::new(300).set_body_json(json!({"choices": 2})))
        .mount(&mock_server)
        .await;

    let forwarder = AgentForwarder::new(run_url(&mock_server));
    let result = forwarder.forward("hola").await;

    assert!(
        result.starts_with("Error al llamar al agente:"),
        "unexpected result: {result}"
    );
    assert!(result.contains("300"));
}

#[tokio::test]
async fn test_forwarder_reports_schemeless_url_as_transport_error() {
    let forwarder = AgentForwarder::new("localhost:8000/run");
    let result = forwarder.forward("hola").await;

    assert!(
        result.starts_with("Error en la solicitud HTTP:"),
        "unexpected result: {result}"
    );
}
