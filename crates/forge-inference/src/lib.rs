//! # forge-inference
//!
//! Streaming LLM chat backends for the forge planner.
//!
//! This crate provides:
//! - The [`ChatBackend`] trait: one provider, one API key, one streaming call
//! - An Anthropic Messages API backend
//! - An OpenAI-compatible backend used for OpenAI, Google, Mistral and Cohere
//! - A [`ProviderRegistry`] mapping each provider to its endpoint and model
//! - Incremental SSE decoding and upstream error classification
//!
//! # Example
//!
//! ```rust,no_run
//! use futures::StreamExt;
//! use forge_core::{AiProvider, ChatMessage, ChatRequest, ChatRole};
//! use forge_inference::ProviderRegistry;
//!
//! #[tokio::main]
//! async fn main() {
//!     let registry = ProviderRegistry::from_env().unwrap();
//!     let backend = registry.backend(AiProvider::Anthropic, "sk-ant-...");
//!     let request = ChatRequest {
//!         model: String::new(),
//!         system: None,
//!         messages: vec![ChatMessage::text(ChatRole::User, "Plan my week")],
//!         max_tokens: registry.max_tokens(),
//!     };
//!     let mut tokens = backend.stream_text(&request).await.unwrap();
//!     while let Some(token) = tokens.next().await {
//!         print!("{}", token.unwrap());
//!     }
//! }
//! ```

pub mod anthropic;
pub mod backend;
pub mod error;
pub mod openai;
pub mod provider;
pub mod sse;

pub use anthropic::{AnthropicBackend, AnthropicConfig};
pub use backend::ChatBackend;
pub use error::{error_from_response, parse_error_body, to_forge_error, ProviderErrorCode};
pub use openai::{OpenAIBackend, OpenAIConfig};
pub use provider::{
    ProviderApi, ProviderRegistry, ProviderSettings, DEFAULT_CHAT_TIMEOUT_SECS, DEFAULT_MAX_TOKENS,
};
pub use sse::{text_deltas, ByteStream, SseDecoder, SseEvent, SseSignal, TokenStream};
