//! The chat backend abstraction.

use async_trait::async_trait;

use forge_core::{AiProvider, ChatRequest, Result};

use crate::sse::{ByteStream, TokenStream};

/// A streaming chat endpoint bound to one provider and one API key.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Provider this backend talks to.
    fn provider(&self) -> AiProvider;

    /// Model used when the request does not name one.
    fn default_model(&self) -> &str;

    /// Start a streaming request and return the upstream SSE body untouched.
    ///
    /// Non-success upstream statuses are reported here, before any byte is
    /// streamed.
    async fn stream_raw(&self, request: &ChatRequest) -> Result<ByteStream>;

    /// Reduce this provider's SSE body to text deltas.
    fn text_deltas(&self, raw: ByteStream) -> TokenStream;

    /// Start a streaming request and yield only text.
    async fn stream_text(&self, request: &ChatRequest) -> Result<TokenStream> {
        let raw = self.stream_raw(request).await?;
        Ok(self.text_deltas(raw))
    }
}
