//! OpenAI-compatible streaming chat backend.

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use tracing::debug;

use forge_core::{AiProvider, ChatRequest, ChatRole, Error, Result};

use super::streaming::extract_delta;
use super::types::{ChatCompletionMessage, ChatCompletionRequest};
use crate::backend::ChatBackend;
use crate::error::error_from_response;
use crate::sse::{text_deltas, ByteStream, TokenStream};

/// Default OpenAI API endpoint.
pub const DEFAULT_OPENAI_URL: &str = "https://api.openai.com/v1";

/// Default OpenAI chat model.
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";

/// Connection settings for one OpenAI-compatible endpoint.
#[derive(Clone)]
pub struct OpenAIConfig {
    /// Which provider this endpoint belongs to; used in logs and errors.
    pub provider: AiProvider,
    /// Base URL, without the `/chat/completions` suffix.
    pub base_url: String,
    /// Bearer token.
    pub api_key: String,
    /// Model used when the request leaves it empty.
    pub model: String,
}

impl std::fmt::Debug for OpenAIConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAIConfig")
            .field("provider", &self.provider)
            .field("base_url", &self.base_url)
            .field("api_key", &"[redacted]")
            .field("model", &self.model)
            .finish()
    }
}

/// Chat backend for OpenAI, Google, Mistral and Cohere compatibility endpoints.
pub struct OpenAIBackend {
    client: Client,
    config: OpenAIConfig,
}

impl OpenAIBackend {
    /// Build on a shared HTTP client.
    pub fn new(client: Client, config: OpenAIConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &OpenAIConfig {
        &self.config
    }

    fn build_request(&self, endpoint: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.config.base_url.trim_end_matches('/'), endpoint);
        self.client
            .post(url)
            .bearer_auth(&self.config.api_key)
            .header("Content-Type", "application/json")
            .header("Accept", "text/event-stream")
    }

    /// Translate a provider-neutral request into a chat completions body.
    pub fn build_body(&self, request: &ChatRequest) -> ChatCompletionRequest {
        let mut messages = Vec::with_capacity(request.messages.len() + 1);

        if let Some(system) = request.system.as_deref().filter(|s| !s.trim().is_empty()) {
            messages.push(ChatCompletionMessage {
                role: "system".to_string(),
                content: system.to_string(),
            });
        }

        for message in &request.messages {
            let content = message.text_content();
            if content.is_empty() {
                continue;
            }
            let role = match message.role {
                ChatRole::System => "system",
                ChatRole::User => "user",
                ChatRole::Assistant => "assistant",
            };
            messages.push(ChatCompletionMessage {
                role: role.to_string(),
                content,
            });
        }

        let model = if request.model.is_empty() {
            self.config.model.clone()
        } else {
            request.model.clone()
        };

        ChatCompletionRequest {
            model,
            messages,
            max_tokens: Some(request.max_tokens),
            stream: true,
        }
    }
}

#[async_trait]
impl ChatBackend for OpenAIBackend {
    fn provider(&self) -> AiProvider {
        self.config.provider
    }

    fn default_model(&self) -> &str {
        &self.config.model
    }

    async fn stream_raw(&self, request: &ChatRequest) -> Result<ByteStream> {
        let body = self.build_body(request);
        debug!(
            subsystem = "inference",
            component = "openai",
            provider = %self.config.provider,
            model = %body.model,
            message_count = body.messages.len(),
            "Starting streaming chat completion"
        );

        let response = self
            .build_request("/chat/completions")
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Inference(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(error_from_response(self.config.provider, response).await);
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
    use forge_core::{ChatMessage, ChatPart};

    fn backend() -> OpenAIBackend {
        OpenAIBackend::new(
            Client::new(),
            OpenAIConfig {
                provider: AiProvider::Openai,
                base_url: DEFAULT_OPENAI_URL.to_string(),
                api_key: "sk-test".to_string(),
                model: DEFAULT_OPENAI_MODEL.to_string(),
            },
        )
    }

    fn request(messages: Vec<ChatMessage>) -> ChatRequest {
        ChatRequest {
            model: String::new(),
            system: None,
            messages,
            max_tokens: 256,
        }
    }

    #[test]
    fn test_body_defaults_model_and_streams() {
        let body = backend().build_body(&request(vec![ChatMessage::text(ChatRole::User, "Hi")]));
        assert_eq!(body.model, DEFAULT_OPENAI_MODEL);
        assert!(body.stream);
        assert_eq!(body.max_tokens, Some(256));
        assert_eq!(
            body.messages,
            vec![ChatCompletionMessage {
                role: "user".to_string(),
                content: "Hi".to_string()
            }]
        );
    }

    #[test]
    fn test_body_prepends_system_and_flattens_parts() {
        let mut req = request(vec![
            ChatMessage {
                role: ChatRole::User,
                content: None,
                parts: Some(vec![
                    ChatPart {
                        part_type: "text".to_string(),
                        text: Some("Plan ".to_string()),
                    },
                    ChatPart {
                        part_type: "file".to_string(),
                        text: None,
                    },
                    ChatPart {
                        part_type: "text".to_string(),
                        text: Some("my week".to_string()),
                    },
                ]),
            },
            ChatMessage::text(ChatRole::Assistant, ""),
        ]);
        req.system = Some("Be brief".to_string());
        req.model = "gpt-4o".to_string();

        let body = backend().build_body(&req);
        assert_eq!(body.model, "gpt-4o");
        assert_eq!(body.messages.len(), 2);
        assert_eq!(body.messages[0].role, "system");
        assert_eq!(body.messages[1].content, "Plan my week");
    }

    #[test]
    fn test_config_debug_redacts_key() {
        let debug = format!("{:?}", backend().config());
        assert!(!debug.contains("sk-test"));
        assert!(debug.contains("[redacted]"));
    }
}
