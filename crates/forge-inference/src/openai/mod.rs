//! OpenAI-compatible chat backend.
//!
//! OpenAI itself and the compatibility endpoints of Google, Mistral and
//! Cohere all accept the same `/chat/completions` request with bearer auth
//! and stream `data: {chunk}` lines terminated by `data: [DONE]`.

mod backend;
mod streaming;
mod types;

pub use backend::{OpenAIBackend, OpenAIConfig, DEFAULT_OPENAI_MODEL, DEFAULT_OPENAI_URL};
pub use streaming::extract_delta;
pub use types::*;
