//! Chat backends against wiremock servers.

use std::time::Duration;

use futures::StreamExt;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use forge_core::{AiProvider, ChatMessage, ChatRequest, ChatRole, Error};
use forge_inference::ProviderRegistry;

const ANTHROPIC_STREAM: &str = "event: message_start\n\
data: {\"type\":\"message_start\",\"message\":{\"id\":\"msg_1\"}}\n\n\
event: content_block_start\n\
data: {\"type\":\"content_block_start\",\"index\":0,\"content_block\":{\"type\":\"text\",\"text\":\"\"}}\n\n\
event: ping\n\
data: {\"type\":\"ping\"}\n\n\
event: content_block_delta\n\
data: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\"Hello\"}}\n\n\
event: content_block_delta\n\
data: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\" there\"}}\n\n\
event: content_block_stop\n\
data: {\"type\":\"content_block_stop\",\"index\":0}\n\n\
event: message_stop\n\
data: {\"type\":\"message_stop\"}\n\n";

const OPENAI_STREAM: &str = "data: {\"id\":\"c1\",\"choices\":[{\"index\":0,\"delta\":{\"role\":\"assistant\"},\"finish_reason\":null}]}\n\n\
data: {\"id\":\"c1\",\"choices\":[{\"index\":0,\"delta\":{\"content\":\"Plan\"},\"finish_reason\":null}]}\n\n\
data: {\"id\":\"c1\",\"choices\":[{\"index\":0,\"delta\":{\"content\":\" ahead\"},\"finish_reason\":\"stop\"}]}\n\n\
data: [DONE]\n\n";

fn registry(provider: AiProvider, server: &MockServer) -> ProviderRegistry {
    ProviderRegistry::new(Duration::from_secs(5))
        .unwrap()
        .with_base_url(provider, server.uri())
}

fn request() -> ChatRequest {
    ChatRequest {
        model: String::new(),
        system: Some("You are a planner.".to_string()),
        messages: vec![ChatMessage::text(ChatRole::User, "Hi")],
        max_tokens: 128,
    }
}

async fn collect_text(stream: forge_inference::TokenStream) -> String {
    stream
        .map(|r| r.expect("stream item"))
        .collect::<Vec<_>>()
        .await
        .concat()
}

#[tokio::test]
async fn test_anthropic_stream_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(header("x-api-key", "sk-ant-user"))
        .and(header("anthropic-version", "2023-06-01"))
        .and(body_partial_json(serde_json::json!({
            "model": "claude-sonnet-4-5-20250929",
            "system": "You are a planner.",
            "stream": true,
            "max_tokens": 128,
            "messages": [{"role": "user", "content": "Hi"}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_raw(ANTHROPIC_STREAM, "text/event-stream"))
        .expect(1)
        .mount(&server)
        .await;

    let backend = registry(AiProvider::Anthropic, &server).backend(AiProvider::Anthropic, "sk-ant-user");
    let text = collect_text(backend.stream_text(&request()).await.unwrap()).await;
    assert_eq!(text, "Hello there");
}

#[tokio::test]
async fn test_anthropic_stream_raw_passthrough() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(ANTHROPIC_STREAM, "text/event-stream"))
        .mount(&server)
        .await;

    let backend = registry(AiProvider::Anthropic, &server).backend(AiProvider::Anthropic, "k");
    let chunks: Vec<bytes::Bytes> = backend
        .stream_raw(&request())
        .await
        .unwrap()
        .map(|r| r.unwrap())
        .collect()
        .await;
    let body: Vec<u8> = chunks.concat();
    assert_eq!(String::from_utf8(body).unwrap(), ANTHROPIC_STREAM);
}

#[tokio::test]
async fn test_openai_compatible_stream_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer sk-mistral"))
        .and(body_partial_json(serde_json::json!({
            "model": "mistral-small-latest",
            "stream": true,
            "messages": [
                {"role": "system", "content": "You are a planner."},
                {"role": "user", "content": "Hi"}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_raw(OPENAI_STREAM, "text/event-stream"))
        .expect(1)
        .mount(&server)
        .await;

    let backend = registry(AiProvider::Mistral, &server).backend(AiProvider::Mistral, "sk-mistral");
    let text = collect_text(backend.stream_text(&request()).await.unwrap()).await;
    assert_eq!(text, "Plan ahead");
}

#[tokio::test]
async fn test_request_model_overrides_default() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(serde_json::json!({"model": "gpt-4o"})))
        .respond_with(ResponseTemplate::new(200).set_body_raw(OPENAI_STREAM, "text/event-stream"))
        .expect(1)
        .mount(&server)
        .await;

    let mut req = request();
    req.model = "gpt-4o".to_string();
    let backend = registry(AiProvider::Openai, &server).backend(AiProvider::Openai, "k");
    assert!(backend.stream_text(&req).await.is_ok());
}

#[tokio::test]
async fn test_upstream_401_is_inference_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "type": "error",
            "error": {"type": "authentication_error", "message": "invalid x-api-key"}
        })))
        .mount(&server)
        .await;

    let backend = registry(AiProvider::Anthropic, &server).backend(AiProvider::Anthropic, "bad");
    match backend.stream_raw(&request()).await {
        Err(Error::Inference(message)) => assert!(message.contains("invalid x-api-key")),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("expected an error"),
    }
}

#[tokio::test]
async fn test_upstream_429_is_rate_limited() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(429).set_body_json(serde_json::json!({
            "error": {"message": "Rate limit reached", "type": "requests", "code": "rate_limit_exceeded"}
        })))
        .mount(&server)
        .await;

    let backend = registry(AiProvider::Openai, &server).backend(AiProvider::Openai, "k");
    assert!(matches!(
        backend.stream_raw(&request()).await,
        Err(Error::RateLimited(_))
    ));
}

#[tokio::test]
async fn test_upstream_500_is_inference_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream unavailable"))
        .mount(&server)
        .await;

    let backend = registry(AiProvider::Google, &server).backend(AiProvider::Google, "k");
    match backend.stream_raw(&request()).await {
        Err(Error::Inference(message)) => assert!(message.contains("upstream unavailable")),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("expected an error"),
    }
}

#[tokio::test]
async fn test_mid_stream_error_event() {
    let server = MockServer::start().await;
    let body = "event: content_block_delta\n\
data: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\"Par\"}}\n\n\
event: error\n\
data: {\"type\":\"error\",\"error\":{\"type\":\"overloaded_error\",\"message\":\"Overloaded\"}}\n\n";
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(&server)
        .await;

    let backend = registry(AiProvider::Anthropic, &server).backend(AiProvider::Anthropic, "k");
    let items: Vec<_> = backend
        .stream_text(&request())
        .await
        .unwrap()
        .collect()
        .await;
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].as_ref().unwrap(), "Par");
    assert!(items[1].is_err());
}
