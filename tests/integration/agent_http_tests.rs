//! Agent adapter against a stubbed chat-completion endpoint.

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use task_funnel::agent::TaskAgent;
use task_funnel::models::task::{DEFAULT_PRIORITY, DEGRADED_DESCRIPTION};

use super::test_helpers::{completion_body, test_config};

fn agent_against(server: &MockServer) -> TaskAgent {
    let config = test_config(&server.uri(), "http://127.0.0.1:1");
    TaskAgent::new(&config.agent)
}

#[tokio::test]
async fn parses_successful_completion() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body(
            r#"{"name":"Fix login bug","description":"- reproduce\n- patch","priority":"High"}"#,
        )))
        .expect(1)
        .mount(&server)
        .await;

    let agent = agent_against(&server);
    let record = agent.expand("Fix login bug, users locked out").await;

    assert_eq!(record.name, "Fix login bug");
    assert_eq!(record.priority, "High");
    assert!(record.description.contains("reproduce"));
}

#[tokio::test]
async fn request_constrains_reply_to_a_json_object() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(completion_body(r#"{"name":"x"}"#)),
        )
        .mount(&server)
        .await;

    let agent = agent_against(&server);
    let _ = agent.expand("anything").await;

    let requests = server.received_requests().await.expect("recording enabled");
    assert_eq!(requests.len(), 1);
    let body: serde_json::Value =
        serde_json::from_slice(&requests[0].body).expect("request body is JSON");
    assert_eq!(body["response_format"]["type"], "json_object");
    assert_eq!(body["messages"][0]["role"], "system");
    assert_eq!(body["messages"][1]["content"], "Input: anything");
}

#[tokio::test]
async fn provider_error_degrades_to_raw_prefix() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .mount(&server)
        .await;

    let agent = agent_against(&server);
    let record = agent
        .expand("migrate the billing service to the new cluster")
        .await;

    assert_eq!(record.name, "migrate the billing");
    assert_eq!(record.description, DEGRADED_DESCRIPTION);
    assert_eq!(record.priority, DEFAULT_PRIORITY);
}

#[tokio::test]
async fn unreachable_provider_degrades() {
    // Nothing listens on this port; the request itself fails.
    let config = test_config("http://127.0.0.1:1", "http://127.0.0.1:1");
    let agent = TaskAgent::new(&config.agent);

    let record = agent.expand("water the plants").await;

    assert_eq!(record.name, "water the plants");
    assert_eq!(record.description, DEGRADED_DESCRIPTION);
}

#[tokio::test]
async fn name_is_never_empty_even_on_failure_with_empty_input() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let agent = agent_against(&server);
    let record = agent.expand("").await;

    assert!(!record.name.is_empty());
}

#[tokio::test]
async fn gibberish_reply_content_degrades() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(completion_body("Sure! Here is your task, nicely formatted:")),
        )
        .mount(&server)
        .await;

    let agent = agent_against(&server);
    let record = agent.expand("renew the certificates").await;

    assert_eq!(record.name, "renew the certificat");
    assert_eq!(record.priority, DEFAULT_PRIORITY);
}
