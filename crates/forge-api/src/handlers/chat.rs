//! LLM chat proxy.
//!
//! The caller picks a provider with `?provider=`; the request is sent with
//! the key the caller stored for that provider. By default the provider's
//! SSE stream is forwarded byte for byte. Clients sending
//! `Accept: text/plain` get only the text deltas.

use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap},
    response::{IntoResponse, Response},
};
use futures::TryStreamExt;
use serde::Deserialize;
use tracing::{info, warn};
use utoipa::{IntoParams, ToSchema};

use forge_core::{AiKeyRepository, AiProvider, ChatMessage, ChatRequest};

use crate::error::ApiResultExt;
use crate::extract::{ApiJson, ApiQuery};
use crate::handlers::ErrorResponse;
use crate::session::CurrentUser;
use crate::{ApiError, AppState};

const FAILED: &str = "Failed to process chat request";

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ChatQuery {
    /// One of ANTHROPIC, OPENAI, GOOGLE, MISTRAL, COHERE.
    pub provider: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ChatBody {
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub system: Option<String>,
    /// Overrides the provider's default model.
    #[serde(default)]
    pub model: Option<String>,
}

/// Whether the client asked for plain text instead of the raw event stream.
fn wants_plain_text(headers: &HeaderMap) -> bool {
    headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|accept| {
            accept.contains("text/plain") && !accept.contains("text/event-stream")
        })
}

/// Drop messages with no text, such as image-only parts; providers reject
/// empty content.
fn usable_messages(messages: Vec<ChatMessage>) -> Vec<ChatMessage> {
    messages
        .into_iter()
        .filter(|m| !m.text_content().trim().is_empty())
        .collect()
}

fn parse_provider(query: ChatQuery) -> Result<AiProvider, ApiError> {
    let raw = query
        .provider
        .filter(|p| !p.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("Provider parameter is required".to_string()))?;
    raw.parse()
        .map_err(|_| ApiError::BadRequest(AiProvider::invalid_provider_message()))
}

/// Stream a chat completion from the chosen provider.
#[utoipa::path(
    post,
    path = "/api/chat",
    tag = "Chat",
    params(ChatQuery),
    request_body = ChatBody,
    responses(
        (status = 200, description = "Provider event stream, or text deltas with Accept: text/plain"),
        (status = 400, body = ErrorResponse),
        (status = 404, body = ErrorResponse),
        (status = 429, body = ErrorResponse),
        (status = 502, body = ErrorResponse)
    )
)]
pub async fn chat(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiQuery(query): ApiQuery<ChatQuery>,
    headers: HeaderMap,
    ApiJson(body): ApiJson<ChatBody>,
) -> Result<Response, ApiError> {
    let provider = parse_provider(query)?;

    let sealed = state
        .db
        .ai_keys
        .sealed_key_for_provider(&user.user_id, provider)
        .await
        .or_fail(FAILED)?
        .ok_or_else(|| {
            ApiError::NotFound(format!(
                "No API key found for provider '{}'. Please add one in settings.",
                provider
            ))
        })?;
    let api_key = state.sealer.open(&user.user_id, &sealed)?;

    let messages = usable_messages(body.messages);
    if messages.is_empty() {
        return Err(ApiError::BadRequest("Messages are required".to_string()));
    }

    let request = ChatRequest {
        model: body.model.unwrap_or_default(),
        system: body.system.filter(|s| !s.trim().is_empty()),
        messages,
        max_tokens: state.providers.max_tokens(),
    };
    let backend = state.providers.backend(provider, api_key.as_str());
    let started = Instant::now();
    let plain_text = wants_plain_text(&headers);

    let response = if plain_text {
        let tokens = backend.stream_text(&request).await?.inspect_err(move |e| {
            warn!(subsystem = "api", component = "chat", provider = %provider, error = %e, "Chat stream aborted");
        });
        (
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            Body::from_stream(tokens),
        )
            .into_response()
    } else {
        let raw = backend.stream_raw(&request).await?.inspect_err(move |e| {
            warn!(subsystem = "api", component = "chat", provider = %provider, error = %e, "Chat stream aborted");
        });
        (
            [
                (header::CONTENT_TYPE, "text/event-stream"),
                (header::CACHE_CONTROL, "no-cache"),
            ],
            Body::from_stream(raw),
        )
            .into_response()
    };

    info!(
        subsystem = "api",
        component = "chat",
        user_id = %user.user_id,
        provider = %provider,
        model = if request.model.is_empty() { backend.default_model() } else { request.model.as_str() },
        message_count = request.messages.len(),
        plain_text,
        duration_ms = started.elapsed().as_millis() as u64,
        "Chat stream opened"
    );
    Ok(response)
}
