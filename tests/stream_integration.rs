//! Lazy SSE streams against a local mock server.

use ai_relay_sdk::{ChatCompletionRequest, Client, Error, FinishReason, Message};
use futures::StreamExt;
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> Client {
    Client::builder()
        .api_key("test-key")
        .base_url(server.uri())
        .max_retries(2)
        .build()
        .unwrap()
}

fn sse(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.as_bytes().to_vec(), "text/event-stream")
}

fn request() -> ChatCompletionRequest {
    ChatCompletionRequest::new("relay-small", vec![Message::user("Write a haiku")]).max_tokens(32)
}

#[tokio::test]
async fn test_chat_stream_end_to_end() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("accept", "text/event-stream"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_partial_json(json!({"model": "relay-small", "stream": true})))
        .respond_with(sse(concat!(
            "data: {\"model\":\"relay-small\",\"choices\":[{\"delta\":{\"content\":\"Quiet\"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\" borrow\"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{},\"finish_reason\":\"stop\"}],",
            "\"usage\":{\"prompt_tokens\":4,\"completion_tokens\":2,\"total_tokens\":6}}\n\n",
            "data: [DONE]\n\n",
        )))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server);
    let mut stream = client.chat().completions().create_stream(&request()).unwrap();

    let mut content = String::new();
    while let Some(chunk) = stream.next().await {
        if let Some(text) = chunk.unwrap().text() {
            content.push_str(text);
        }
    }
    assert_eq!(content, "Quiet borrow");

    let result = stream.finalize().unwrap();
    assert_eq!(result.content, "Quiet borrow");
    assert_eq!(result.finish_reason, FinishReason::Stop);
    assert_eq!(result.usage.total_tokens, 6);
}

#[tokio::test]
async fn test_stream_stops_at_done_sentinel() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(sse("data: {\"a\":1}\n\ndata: [DONE]\n\ndata: {\"a\":2}\n\n"))
        .mount(&server)
        .await;

    let events: Vec<_> = client(&server)
        .stream_events("/chat/completions", json!({"model": "relay-small"}))
        .into_stream()
        .collect()
        .await;

    assert_eq!(events.len(), 1);
    assert_eq!(events[0].as_ref().unwrap(), &json!({"a": 1}));
}

#[tokio::test]
async fn test_malformed_event_is_skipped() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(sse(
            "data: {\"n\":1}\n\ndata: {\"n\":\n\ndata: {\"n\":2}\n\ndata: [DONE]\n\n",
        ))
        .mount(&server)
        .await;

    let mut events = client(&server).stream_events("/chat/completions", json!({}));
    let mut seen = Vec::new();
    while let Some(event) = events.next().await {
        seen.push(event.unwrap()["n"].as_i64().unwrap());
    }

    assert_eq!(seen, vec![1, 2]);
    assert!(events.is_closed());
}

#[tokio::test]
async fn test_nothing_sent_until_first_pull() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(sse("data: [DONE]\n\n"))
        .expect(0)
        .mount(&server)
        .await;

    let client = client(&server);
    let stream = client.chat().completions().create_stream(&request()).unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    drop(stream);

    let mut events = client.stream_events("/chat/completions", json!({}));
    events.release();
    assert!(events.next().await.is_none());
}

#[tokio::test]
async fn test_error_status_uses_generic_client_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("retry-after", "0")
                .set_body_json(json!({"error": {"message": "slow down"}})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server);
    let mut stream = client.chat().completions().create_stream(&request()).unwrap();

    match stream.next().await {
        Some(Err(Error::Client { status, message })) => {
            assert_eq!(status, Some(429));
            assert!(message.contains("slow down"));
        }
        other => panic!("expected client error, got {other:?}"),
    }
    assert!(stream.next().await.is_none());
}

#[tokio::test]
async fn test_unauthorized_stream_is_not_authentication_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
        .mount(&server)
        .await;

    let mut events = client(&server).stream_events("/chat/completions", json!({}));
    let err = events.next().await.unwrap().unwrap_err();

    assert!(matches!(err, Error::Client { status: Some(401), .. }));
    assert!(events.is_closed());
}

#[tokio::test]
async fn test_stream_connect_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(sse("data: [DONE]\n\n").set_delay(Duration::from_millis(500)))
        .expect(1)
        .mount(&server)
        .await;

    let client = Client::builder()
        .api_key("test-key")
        .base_url(server.uri())
        .timeout(Duration::from_millis(50))
        .build()
        .unwrap();

    let mut events = client.stream_events("/chat/completions", json!({}));
    let err = events.next().await.unwrap().unwrap_err();
    assert!(matches!(err, Error::Api { status: 408, .. }));
}

#[tokio::test]
async fn test_stream_connection_refused() {
    let client = Client::builder()
        .api_key("test-key")
        .base_url("http://127.0.0.1:1")
        .build()
        .unwrap();

    let mut events = client.stream_events("/chat/completions", json!({}));
    let err = events.next().await.unwrap().unwrap_err();
    assert!(matches!(err, Error::Api { status: 0, .. }));
}
