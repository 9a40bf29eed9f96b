//! Anthropic Messages API streaming backend.
//!
//! Streams arrive as named events:
//!
//! ```text
//! event: content_block_delta
//! data: {"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"Hi"}}
//!
//! event: message_stop
//! data: {"type":"message_stop"}
//! ```

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use forge_core::{AiProvider, ChatRequest, ChatRole, Error, Result};

use crate::backend::ChatBackend;
use crate::error::error_from_response;
use crate::sse::{text_deltas, ByteStream, SseEvent, SseSignal, TokenStream};

/// Default Anthropic API endpoint.
pub const DEFAULT_ANTHROPIC_URL: &str = "https://api.anthropic.com";

/// Default Anthropic model.
pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-sonnet-4-5-20250929";

/// Value sent in the `anthropic-version` header.
pub const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Connection settings for the Messages API.
#[derive(Clone)]
pub struct AnthropicConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
}

impl std::fmt::Debug for AnthropicConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"[redacted]")
            .field("model", &self.model)
            .finish()
    }
}

/// Request body for `POST /v1/messages`.
#[derive(Debug, Serialize)]
pub struct MessagesRequest {
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    pub messages: Vec<AnthropicMessage>,
    pub max_tokens: u32,
    pub stream: bool,
}

/// A user or assistant turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnthropicMessage {
    pub role: &'static str,
    pub content: String,
}

#[derive(Debug, Deserialize)]
struct StreamEvent {
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default)]
    delta: Option<StreamDelta>,
    #[serde(default)]
    error: Option<StreamError>,
}

#[derive(Debug, Deserialize)]
struct StreamDelta {
    #[serde(rename = "type", default)]
    delta_type: Option<String>,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamError {
    #[serde(rename = "type", default)]
    error_type: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Map one Messages API stream event to a text delta.
pub fn extract_delta(event: &SseEvent) -> Result<SseSignal> {
    if event.data.trim().is_empty() {
        return Ok(SseSignal::Skip);
    }
    let parsed: StreamEvent = serde_json::from_str(&event.data)
        .map_err(|e| Error::Inference(format!("Failed to parse SSE event: {e}")))?;

    match parsed.event_type.as_str() {
        "content_block_delta" => match parsed.delta {
            Some(StreamDelta {
                delta_type: Some(t),
                text: Some(text),
            }) if t == "text_delta" => Ok(SseSignal::Text(text)),
            _ => Ok(SseSignal::Skip),
        },
        "message_stop" => Ok(SseSignal::Done),
        "error" => {
            let (kind, message) = parsed
                .error
                .map(|e| (e.error_type.unwrap_or_default(), e.message.unwrap_or_default()))
                .unwrap_or_default();
            if kind == "rate_limit_error" {
                Err(Error::RateLimited(format!("ANTHROPIC: {message}")))
            } else {
                Err(Error::Inference(format!("ANTHROPIC stream error ({kind}): {message}")))
            }
        }
        _ => Ok(SseSignal::Skip),
    }
}

/// Chat backend for the Anthropic Messages API.
pub struct AnthropicBackend {
    client: Client,
    config: AnthropicConfig,
}

impl AnthropicBackend {
    /// Build on a shared HTTP client.
    pub fn new(client: Client, config: AnthropicConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &AnthropicConfig {
        &self.config
    }

    /// Translate a provider-neutral request into a Messages API body.
    ///
    /// System turns move into the top-level `system` field; empty turns are
    /// dropped.
    pub fn build_body(&self, request: &ChatRequest) -> MessagesRequest {
        let mut system_parts: Vec<String> = request
            .system
            .iter()
            .filter(|s| !s.trim().is_empty())
            .cloned()
            .collect();
        let mut messages = Vec::with_capacity(request.messages.len());

        for message in &request.messages {
            let content = message.text_content();
            if content.is_empty() {
                continue;
            }
            match message.role {
                ChatRole::System => system_parts.push(content),
                ChatRole::User => messages.push(AnthropicMessage {
                    role: "user",
                    content,
                }),
                ChatRole::Assistant => messages.push(AnthropicMessage {
                    role: "assistant",
                    content,
                }),
            }
        }

        let model = if request.model.is_empty() {
            self.config.model.clone()
        } else {
            request.model.clone()
        };

        MessagesRequest {
            model,
            system: (!system_parts.is_empty()).then(|| system_parts.join("\n\n")),
            messages,
            max_tokens: request.max_tokens,
            stream: true,
        }
    }
}

#[async_trait]
impl ChatBackend for AnthropicBackend {
    fn provider(&self) -> AiProvider {
        AiProvider::Anthropic
    }

    fn default_model(&self) -> &str {
        &self.config.model
    }

    async fn stream_raw(&self, request: &ChatRequest) -> Result<ByteStream> {
        let body = self.build_body(request);
        debug!(
            subsystem = "inference",
            component = "anthropic",
            model = %body.model,
            message_count = body.messages.len(),
            "Starting streaming message"
        );

        let url = format!("{}/v1/messages", self.config.base_url.trim_end_matches('/'));
        let response = self
            .client
            .post(url)
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("Content-Type", "application/json")
            .header("Accept", "text/event-stream")
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Inference(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(error_from_response(AiProvider::Anthropic, response).await);
        }

        let stream = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| Error::Inference(format!("Stream error: {}", e))));
        Ok(Box::pin(stream))
    }

    fn text_deltas(&self, raw: ByteStream) -> TokenStream {
        text_deltas(raw, extract_delta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use forge_core::ChatMessage;

    fn event(data: &str) -> SseEvent {
        SseEvent {
            event: None,
            data: data.to_string(),
        }
    }

    fn backend() -> AnthropicBackend {
        AnthropicBackend::new(
            Client::new(),
            AnthropicConfig {
                base_url: DEFAULT_ANTHROPIC_URL.to_string(),
                api_key: "sk-ant-test".to_string(),
                model: DEFAULT_ANTHROPIC_MODEL.to_string(),
            },
        )
    }

    #[test]
    fn test_extract_text_delta() {
        let e = event(
            r#"{"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"Hi"}}"#,
        );
        assert_eq!(extract_delta(&e).unwrap(), SseSignal::Text("Hi".to_string()));
    }

    #[test]
    fn test_extract_ignores_other_events() {
        for data in [
            r#"{"type":"message_start","message":{"id":"msg_1"}}"#,
            r#"{"type":"content_block_start","index":0,"content_block":{"type":"text","text":""}}"#,
            r#"{"type":"content_block_delta","index":0,"delta":{"type":"input_json_delta","partial_json":"{"}}"#,
            r#"{"type":"ping"}"#,
            r#"{"type":"message_delta","delta":{"stop_reason":"end_turn"}}"#,
        ] {
            assert_eq!(extract_delta(&event(data)).unwrap(), SseSignal::Skip, "{data}");
        }
    }

    #[test]
    fn test_extract_message_stop() {
        assert_eq!(
            extract_delta(&event(r#"{"type":"message_stop"}"#)).unwrap(),
            SseSignal::Done
        );
    }

    #[test]
    fn test_extract_error_event() {
        let err = extract_delta(&event(
            r#"{"type":"error","error":{"type":"overloaded_error","message":"Overloaded"}}"#,
        ))
        .unwrap_err();
        assert!(matches!(err, Error::Inference(ref m) if m.contains("Overloaded")));

        let err = extract_delta(&event(
            r#"{"type":"error","error":{"type":"rate_limit_error","message":"slow"}}"#,
        ))
        .unwrap_err();
        assert!(matches!(err, Error::RateLimited(_)));
    }

    #[test]
    fn test_body_moves_system_turns() {
        let req = ChatRequest {
            model: String::new(),
            system: Some("You plan goals.".to_string()),
            messages: vec![
                ChatMessage::text(ChatRole::System, "Be brief."),
                ChatMessage::text(ChatRole::User, "Hello"),
                ChatMessage::text(ChatRole::Assistant, "Hi!"),
                ChatMessage::text(ChatRole::User, ""),
            ],
            max_tokens: 1024,
        };
        let body = backend().build_body(&req);

        assert_eq!(body.model, DEFAULT_ANTHROPIC_MODEL);
        assert_eq!(body.system.as_deref(), Some("You plan goals.\n\nBe brief."));
        assert_eq!(body.messages.len(), 2);
        assert_eq!(body.messages[0].role, "user");
        assert_eq!(body.messages[1].role, "assistant");
        assert!(body.stream);
    }

    #[test]
    fn test_body_without_system() {
        let req = ChatRequest {
            model: "claude-3-5-haiku-latest".to_string(),
            system: None,
            messages: vec![ChatMessage::text(ChatRole::User, "Hello")],
            max_tokens: 64,
        };
        let body = backend().build_body(&req);
        assert!(body.system.is_none());
        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("system").is_none());
        assert_eq!(json["model"], "claude-3-5-haiku-latest");
    }
}
