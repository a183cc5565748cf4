//! HTTP-level tests for `GeminiClient` against a mock server.

use std::time::Duration;

use serde_json::{Value, json};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use goalbreaker_core::generation::{
    GeminiClient, GeminiConfig, GenerationError, GoalDecomposer, build_prompt, response_schema,
};

const MODEL: &str = "gemini-test";
const ENDPOINT: &str = "/v1beta/models/gemini-test:generateContent";

fn config(server: &MockServer) -> GeminiConfig {
    let mut cfg = GeminiConfig::new("test-key");
    cfg.model = MODEL.to_string();
    cfg.base_url = format!("{}/v1beta", server.uri());
    cfg.timeout = Duration::from_secs(5);
    cfg.retry_backoff = Duration::from_millis(10);
    cfg
}

/// Wrap model text the way the API does.
fn candidate(text: &str) -> Value {
    json!({
        "candidates": [{
            "content": { "role": "model", "parts": [{ "text": text }] },
            "finishReason": "STOP",
        }],
        "usageMetadata": { "promptTokenCount": 120, "candidatesTokenCount": 80 },
    })
}

fn guitar_output() -> String {
    json!({
        "complexity": 4,
        "tasks": [
            {"title": "Buy or borrow a guitar"},
            {"title": "Learn five open chords"},
            {"title": "Practice chord changes for 15 minutes daily"},
            {"title": "Learn a simple song"},
            {"title": "Play the song start to finish"},
        ],
    })
    .to_string()
}

#[tokio::test]
async fn decompose_sends_structured_request_and_parses_reply() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .and(header("x-goog-api-key", "test-key"))
        .and(body_partial_json(json!({
            "contents": [{ "parts": [{ "text": build_prompt("Learn to play guitar") }] }],
            "generationConfig": {
                "temperature": 0,
                "responseMimeType": "application/json",
                "responseSchema": response_schema(),
            },
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(candidate(&guitar_output())))
        .expect(1)
        .mount(&server)
        .await;

    let client = GeminiClient::new(config(&server)).unwrap();
    assert_eq!(client.name(), MODEL);

    let d = client.decompose("Learn to play guitar").await.unwrap();
    assert_eq!(d.complexity, 4);
    assert_eq!(d.tasks.len(), 5);
    assert_eq!(d.tasks[0].title, "Buy or borrow a guitar");
}

#[tokio::test]
async fn decompose_joins_split_text_parts() {
    let server = MockServer::start().await;
    let output = guitar_output();
    let (head, tail) = output.split_at(20);
    let reply = json!({
        "candidates": [{
            "content": { "parts": [{ "text": head }, { "text": tail }] },
        }],
    });
    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(200).set_body_json(reply))
        .mount(&server)
        .await;

    let client = GeminiClient::new(config(&server)).unwrap();
    let d = client.decompose("Learn to play guitar").await.unwrap();
    assert_eq!(d.complexity, 4);
}

#[tokio::test]
async fn api_error_is_reported_without_retry_by_default() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .expect(1)
        .mount(&server)
        .await;

    let client = GeminiClient::new(config(&server)).unwrap();
    let err = client.decompose("Launch a startup").await.unwrap_err();
    match err {
        GenerationError::Api { status, message } => {
            assert_eq!(status, 503);
            assert_eq!(message, "overloaded");
        }
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn transient_errors_are_retried_when_configured() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(200).set_body_json(candidate(&guitar_output())))
        .expect(1)
        .mount(&server)
        .await;

    let mut cfg = config(&server);
    cfg.max_retries = 2;
    let client = GeminiClient::new(cfg).unwrap();

    let d = client.decompose("Learn to play guitar").await.unwrap();
    assert_eq!(d.tasks.len(), 5);
}

#[tokio::test]
async fn client_errors_are_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(400).set_body_string("API key not valid"))
        .expect(1)
        .mount(&server)
        .await;

    let mut cfg = config(&server);
    cfg.max_retries = 3;
    let client = GeminiClient::new(cfg).unwrap();

    let err = client.decompose("Learn to play guitar").await.unwrap_err();
    assert!(matches!(err, GenerationError::Api { status: 400, .. }), "{err:?}");
}

#[tokio::test]
async fn slow_reply_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(candidate(&guitar_output()))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let mut cfg = config(&server);
    cfg.timeout = Duration::from_millis(200);
    let client = GeminiClient::new(cfg).unwrap();

    let err = client.decompose("Learn to play guitar").await.unwrap_err();
    assert!(matches!(err, GenerationError::Timeout(_)), "{err:?}");
}

#[tokio::test]
async fn non_json_text_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(candidate("Here are five steps: ...")),
        )
        .mount(&server)
        .await;

    let client = GeminiClient::new(config(&server)).unwrap();
    let err = client.decompose("Learn to play guitar").await.unwrap_err();
    assert!(matches!(err, GenerationError::MalformedJson(_)), "{err:?}");
}

#[tokio::test]
async fn wrong_step_count_violates_schema() {
    let server = MockServer::start().await;
    let three = json!({
        "complexity": 2,
        "tasks": [{"title": "a"}, {"title": "b"}, {"title": "c"}],
    })
    .to_string();
    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(200).set_body_json(candidate(&three)))
        .mount(&server)
        .await;

    let client = GeminiClient::new(config(&server)).unwrap();
    let err = client.decompose("Learn to play guitar").await.unwrap_err();
    assert!(matches!(err, GenerationError::Schema(_)), "{err:?}");
}

#[tokio::test]
async fn missing_candidates_is_empty_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "promptFeedback": { "blockReason": "SAFETY" } })),
        )
        .mount(&server)
        .await;

    let client = GeminiClient::new(config(&server)).unwrap();
    let err = client.decompose("Learn to play guitar").await.unwrap_err();
    assert!(matches!(err, GenerationError::EmptyResponse), "{err:?}");
}

#[tokio::test]
async fn unreachable_server_is_transport_error() {
    // Reserve a free port, then release it so nothing is listening there.
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let mut cfg = GeminiConfig::new("test-key");
    cfg.model = MODEL.to_string();
    cfg.base_url = format!("http://127.0.0.1:{port}/v1beta");
    cfg.timeout = Duration::from_secs(5);

    let client = GeminiClient::new(cfg).unwrap();
    let err = client.decompose("Learn to play guitar").await.unwrap_err();
    assert!(
        matches!(err, GenerationError::Transport(_) | GenerationError::Timeout(_)),
        "{err:?}"
    );
}
