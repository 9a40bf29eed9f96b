//! Per-user AI provider API keys.
//!
//! Secrets are sealed with the server key before they reach the database and
//! are never returned; responses carry only `keyPreview`.

use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;

use forge_core::{AiAgentApiKey, AiKeyChanges, AiKeyRepository, AiProvider, NewAiKey};
use forge_crypto::key_preview;

use crate::error::ApiResultExt;
use crate::extract::{ApiJson, ApiPath};
use crate::handlers::{ErrorResponse, MessageResponse};
use crate::session::CurrentUser;
use crate::{ApiError, AppState};

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateAiKeyRequest {
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// Partial update; absent fields are left alone.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAiKeyRequest {
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

fn key_not_found() -> ApiError {
    ApiError::NotFound("API key not found".to_string())
}

fn provider_taken(provider: AiProvider) -> ApiError {
    ApiError::Conflict(format!("API key for provider '{}' already exists", provider))
}

fn parse_provider(raw: &str) -> Result<AiProvider, ApiError> {
    raw.parse::<AiProvider>()
        .map_err(|_| ApiError::BadRequest(AiProvider::invalid_provider_message()))
}

/// Seal a secret for its owner and compute the preview shown in listings.
fn seal(state: &AppState, user_id: &str, secret: &str) -> Result<(Vec<u8>, String), ApiError> {
    let secret = secret.trim();
    Ok((state.sealer.seal(user_id, secret)?, key_preview(secret)))
}

/// The caller's keys, newest first.
#[utoipa::path(
    get,
    path = "/api/ai-agent-api-keys",
    tag = "AI keys",
    responses((status = 200, body = [AiAgentApiKey]), (status = 401, body = ErrorResponse))
)]
pub async fn list_ai_keys(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<AiAgentApiKey>>, ApiError> {
    let keys = state
        .db
        .ai_keys
        .list_for_user(&user.user_id)
        .await
        .or_fail("Failed to fetch AI Agent API keys")?;
    Ok(Json(keys))
}

/// Store a key for a provider. One key per provider.
#[utoipa::path(
    post,
    path = "/api/ai-agent-api-keys",
    tag = "AI keys",
    request_body = CreateAiKeyRequest,
    responses(
        (status = 201, body = AiAgentApiKey),
        (status = 400, body = ErrorResponse),
        (status = 409, body = ErrorResponse)
    )
)]
pub async fn create_ai_key(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiJson(req): ApiJson<CreateAiKeyRequest>,
) -> Result<(StatusCode, Json<AiAgentApiKey>), ApiError> {
    let (provider, api_key) = match (req.provider.as_deref(), req.api_key.as_deref()) {
        (Some(p), Some(k)) if !p.trim().is_empty() && !k.trim().is_empty() => (p, k),
        _ => {
            return Err(ApiError::BadRequest(
                "Provider and apiKey are required".to_string(),
            ))
        }
    };
    let provider = parse_provider(provider)?;

    if state
        .db
        .ai_keys
        .find_by_provider(&user.user_id, provider)
        .await
        .or_fail("Failed to create AI Agent API key")?
        .is_some()
    {
        return Err(provider_taken(provider));
    }

    let (sealed_key, preview) = seal(&state, &user.user_id, api_key)?;
    let new_key = NewAiKey {
        provider,
        name: req.name.filter(|n| !n.trim().is_empty()),
        sealed_key,
        key_preview: preview,
    };

    let key = match state.db.ai_keys.create(&user.user_id, new_key).await {
        Ok(key) => key,
        Err(e) if e.is_unique_violation() => return Err(provider_taken(provider)),
        Err(e) => return Err(e).or_fail("Failed to create AI Agent API key"),
    };

    info!(
        subsystem = "api",
        component = "ai_keys",
        op = "create",
        user_id = %user.user_id,
        provider = %provider,
        "Provider key stored"
    );
    Ok((StatusCode::CREATED, Json(key)))
}

#[utoipa::path(
    get,
    path = "/api/ai-agent-api-keys/{id}",
    tag = "AI keys",
    params(("id" = Uuid, Path, description = "Key id")),
    responses((status = 200, body = AiAgentApiKey), (status = 404, body = ErrorResponse))
)]
pub async fn get_ai_key(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<AiAgentApiKey>, ApiError> {
    let key = state
        .db
        .ai_keys
        .get(&user.user_id, id)
        .await
        .or_fail("Failed to fetch AI Agent API key")?
        .ok_or_else(key_not_found)?;
    Ok(Json(key))
}

/// Change provider, secret or name.
#[utoipa::path(
    put,
    path = "/api/ai-agent-api-keys/{id}",
    tag = "AI keys",
    params(("id" = Uuid, Path, description = "Key id")),
    request_body = UpdateAiKeyRequest,
    responses(
        (status = 200, body = AiAgentApiKey),
        (status = 400, body = ErrorResponse),
        (status = 404, body = ErrorResponse),
        (status = 409, body = ErrorResponse)
    )
)]
pub async fn update_ai_key(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<UpdateAiKeyRequest>,
) -> Result<Json<AiAgentApiKey>, ApiError> {
    const FAILED: &str = "Failed to update AI Agent API key";

    let existing = state
        .db
        .ai_keys
        .get(&user.user_id, id)
        .await
        .or_fail(FAILED)?
        .ok_or_else(key_not_found)?;

    let provider = match req.provider.as_deref().filter(|p| !p.trim().is_empty()) {
        Some(raw) => Some(parse_provider(raw)?),
        None => None,
    };

    if let Some(provider) = provider.filter(|p| *p != existing.provider) {
        let conflict = state
            .db
            .ai_keys
            .find_by_provider(&user.user_id, provider)
            .await
            .or_fail(FAILED)?;
        if conflict.is_some_and(|k| k.id != id) {
            return Err(provider_taken(provider));
        }
    }

    let sealed_key = match req.api_key.as_deref().filter(|k| !k.trim().is_empty()) {
        Some(secret) => Some(seal(&state, &user.user_id, secret)?),
        None => None,
    };

    let changes = AiKeyChanges {
        provider,
        name: req.name,
        sealed_key,
    };

    match state.db.ai_keys.update(&user.user_id, id, changes).await {
        Ok(Some(key)) => Ok(Json(key)),
        Ok(None) => Err(key_not_found()),
        Err(e) if e.is_unique_violation() => {
            Err(provider_taken(provider.unwrap_or(existing.provider)))
        }
        Err(e) => Err(e).or_fail(FAILED),
    }
}

#[utoipa::path(
    delete,
    path = "/api/ai-agent-api-keys/{id}",
    tag = "AI keys",
    params(("id" = Uuid, Path, description = "Key id")),
    responses((status = 200, body = MessageResponse), (status = 404, body = ErrorResponse))
)]
pub async fn delete_ai_key(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<MessageResponse>, ApiError> {
    let deleted = state
        .db
        .ai_keys
        .delete(&user.user_id, id)
        .await
        .or_fail("Failed to delete AI Agent API key")?;
    if !deleted {
        return Err(key_not_found());
    }
    Ok(Json(MessageResponse::new("API key deleted successfully")))
}
