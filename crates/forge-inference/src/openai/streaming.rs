//! Text extraction from OpenAI-compatible streaming chunks.

use forge_core::{Error, Result};

use super::types::ChatCompletionChunk;
use crate::sse::{SseEvent, SseSignal};

/// Map one SSE event of a chat completions stream to a text delta.
pub fn extract_delta(event: &SseEvent) -> Result<SseSignal> {
    let data = event.data.trim();
    if data.is_empty() {
        return Ok(SseSignal::Skip);
    }
    if data == "[DONE]" {
        return Ok(SseSignal::Done);
    }

    // Some compatible endpoints report mid-stream failures as an error object.
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(data) {
        if let Some(message) = value
            .get("error")
            .and_then(|e| e.get("message"))
            .and_then(|m| m.as_str())
        {
            return Err(Error::Inference(format!("Stream error: {message}")));
        }
    }

    let chunk: ChatCompletionChunk = serde_json::from_str(data)
        .map_err(|e| Error::Inference(format!("Failed to parse SSE chunk: {e}")))?;

    let text: String = chunk
        .choices
        .into_iter()
        .filter_map(|c| c.delta.content)
        .collect();
    Ok(SseSignal::Text(text))
}
