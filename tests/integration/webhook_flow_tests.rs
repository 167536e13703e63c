//! End-to-end webhook scenarios against stubbed vendor endpoints.
//!
//! Spawns the real axum router on an ephemeral port and drives it with
//! form POSTs the way the messaging provider would.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use task_funnel::models::inbound::WHATSAPP_SOURCE_LINK;
use task_funnel::models::task::title_from_raw;
use task_funnel::pipeline::AppState;
use task_funnel::webhook::{self, twiml_reply, EMPTY_MESSAGE_REPLY, SINK_FAILURE_REPLY};

use super::test_helpers::{completion_body, test_state};

async fn spawn_webhook(state: Arc<AppState>) -> (String, CancellationToken) {
    let app = webhook::router(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral");
    let addr = listener.local_addr().expect("local addr");
    let ct = CancellationToken::new();

    let shutdown = ct.clone();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app)
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await;
    });

    (format!("http://{addr}"), ct)
}

async fn post_message(base_url: &str, body: &str) -> String {
    let response = reqwest::Client::new()
        .post(format!("{base_url}/whatsapp"))
        .form(&[("Body", body), ("From", "whatsapp:+15551234567")])
        .send()
        .await
        .expect("POST /whatsapp");
    assert!(response.status().is_success(), "webhook must never 5xx");
    response.text().await.expect("response body")
}

fn agent_mock(content: &str) -> Mock {
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body(content)))
}

#[tokio::test]
async fn empty_body_replies_without_any_vendor_call() {
    let agent_server = MockServer::start().await;
    let notion_server = MockServer::start().await;
    let state = test_state(&agent_server.uri(), &notion_server.uri());
    let (base_url, ct) = spawn_webhook(state).await;

    let reply = post_message(&base_url, "").await;

    assert_eq!(reply, twiml_reply(EMPTY_MESSAGE_REPLY));
    assert!(agent_server
        .received_requests()
        .await
        .expect("recording enabled")
        .is_empty());
    assert!(notion_server
        .received_requests()
        .await
        .expect("recording enabled")
        .is_empty());

    ct.cancel();
}

#[tokio::test]
async fn whitespace_body_counts_as_empty() {
    let agent_server = MockServer::start().await;
    let notion_server = MockServer::start().await;
    let state = test_state(&agent_server.uri(), &notion_server.uri());
    let (base_url, ct) = spawn_webhook(state).await;

    let reply = post_message(&base_url, "   ").await;

    assert_eq!(reply, twiml_reply(EMPTY_MESSAGE_REPLY));
    ct.cancel();
}

#[tokio::test]
async fn captured_message_reply_carries_the_page_url() {
    let agent_server = MockServer::start().await;
    let notion_server = MockServer::start().await;
    agent_mock(r#"{"name":"Fix login bug","description":"steps","priority":"High"}"#)
        .expect(1)
        .mount(&agent_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/pages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "url": "https://db.example/page1",
        })))
        .expect(1)
        .mount(&notion_server)
        .await;

    let state = test_state(&agent_server.uri(), &notion_server.uri());
    let (base_url, ct) = spawn_webhook(state).await;

    let reply = post_message(&base_url, "Fix login bug").await;

    assert!(
        reply.contains("https://db.example/page1"),
        "reply should carry the created page url, got: {reply}"
    );

    // The fixed channel link rides along as the task's source.
    let requests = notion_server
        .received_requests()
        .await
        .expect("recording enabled");
    let body: serde_json::Value =
        serde_json::from_slice(&requests[0].body).expect("request body is JSON");
    assert_eq!(
        body["properties"]["Source URL"]["url"],
        WHATSAPP_SOURCE_LINK
    );

    ct.cancel();
}

#[tokio::test]
async fn sink_failure_becomes_a_user_visible_reply() {
    let agent_server = MockServer::start().await;
    let notion_server = MockServer::start().await;
    agent_mock(r#"{"name":"x"}"#).mount(&agent_server).await;
    Mock::given(method("POST"))
        .and(path("/v1/pages"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&notion_server)
        .await;

    let state = test_state(&agent_server.uri(), &notion_server.uri());
    let (base_url, ct) = spawn_webhook(state).await;

    let reply = post_message(&base_url, "buy milk").await;

    assert!(reply.contains(SINK_FAILURE_REPLY), "got: {reply}");
    ct.cancel();
}

#[tokio::test]
async fn agent_failure_still_saves_a_degraded_task() {
    let agent_server = MockServer::start().await;
    let notion_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&agent_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/pages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "url": "https://db.example/page2",
        })))
        .expect(1)
        .mount(&notion_server)
        .await;

    let state = test_state(&agent_server.uri(), &notion_server.uri());
    let (base_url, ct) = spawn_webhook(state).await;

    let raw = "escalate the expired certificates to the on-call";
    let reply = post_message(&base_url, raw).await;

    assert!(reply.contains("https://db.example/page2"), "got: {reply}");

    let requests = notion_server
        .received_requests()
        .await
        .expect("recording enabled");
    let body: serde_json::Value =
        serde_json::from_slice(&requests[0].body).expect("request body is JSON");
    assert_eq!(
        body["properties"]["Task"]["title"][0]["text"]["content"],
        serde_json::Value::from(title_from_raw(raw))
    );

    ct.cancel();
}

#[tokio::test]
async fn health_endpoint_returns_ok() {
    let agent_server = MockServer::start().await;
    let notion_server = MockServer::start().await;
    let state = test_state(&agent_server.uri(), &notion_server.uri());
    let (base_url, ct) = spawn_webhook(state).await;

    let response = reqwest::get(format!("{base_url}/health"))
        .await
        .expect("GET /health");

    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.expect("body"), "ok");
    ct.cancel();
}
