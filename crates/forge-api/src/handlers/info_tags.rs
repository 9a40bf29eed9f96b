use axum::{extract::State, http::StatusCode, Json};
use uuid::Uuid;

use forge_core::validation::validate_title;
use forge_core::{CreateInfoTagRequest, InfoTag, InfoTagRepository, UpdateInfoTagRequest};

use crate::error::ApiResultExt;
use crate::extract::{ApiJson, ApiPath};
use crate::handlers::{ErrorResponse, MessageResponse};
use crate::session::CurrentUser;
use crate::{ApiError, AppState};

fn tag_not_found() -> ApiError {
    ApiError::NotFound("Info tag not found".to_string())
}

/// User-level tags of the caller.
#[utoipa::path(
    get,
    path = "/api/info-tags",
    tag = "Info tags",
    responses((status = 200, body = [InfoTag]), (status = 401, body = ErrorResponse))
)]
pub async fn list_info_tags(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<InfoTag>>, ApiError> {
    let tags = state
        .db
        .info_tags
        .list_for_user(&user.user_id)
        .await
        .or_fail("Failed to fetch info tags")?;
    Ok(Json(tags))
}

/// Create a user-level tag, or a goal tag when `goalId` names an owned goal.
#[utoipa::path(
    post,
    path = "/api/info-tags",
    tag = "Info tags",
    request_body = CreateInfoTagRequest,
    responses(
        (status = 201, body = InfoTag),
        (status = 400, body = ErrorResponse),
        (status = 404, body = ErrorResponse)
    )
)]
pub async fn create_info_tag(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiJson(mut req): ApiJson<CreateInfoTagRequest>,
) -> Result<(StatusCode, Json<InfoTag>), ApiError> {
    req.title = validate_title(&req.title, "Info tag")?;

    let tag = state
        .db
        .info_tags
        .create(&user.user_id, req)
        .await
        .or_fail("Failed to create info tag")?
        .ok_or_else(|| ApiError::NotFound("Goal not found".to_string()))?;
    Ok((StatusCode::CREATED, Json(tag)))
}

#[utoipa::path(
    get,
    path = "/api/info-tags/{id}",
    tag = "Info tags",
    params(("id" = Uuid, Path, description = "Info tag id")),
    responses((status = 200, body = InfoTag), (status = 404, body = ErrorResponse))
)]
pub async fn get_info_tag(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<InfoTag>, ApiError> {
    let tag = state
        .db
        .info_tags
        .get(&user.user_id, id)
        .await
        .or_fail("Failed to fetch info tag")?
        .ok_or_else(tag_not_found)?;
    Ok(Json(tag))
}

#[utoipa::path(
    patch,
    path = "/api/info-tags/{id}",
    tag = "Info tags",
    params(("id" = Uuid, Path, description = "Info tag id")),
    request_body = UpdateInfoTagRequest,
    responses(
        (status = 200, body = InfoTag),
        (status = 400, body = ErrorResponse),
        (status = 404, body = ErrorResponse)
    )
)]
pub async fn update_info_tag(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(mut req): ApiJson<UpdateInfoTagRequest>,
) -> Result<Json<InfoTag>, ApiError> {
    if let Some(title) = &req.title {
        req.title = Some(validate_title(title, "Info tag")?);
    }

    let tag = state
        .db
        .info_tags
        .update(&user.user_id, id, req)
        .await
        .or_fail("Failed to update info tag")?
        .ok_or_else(tag_not_found)?;
    Ok(Json(tag))
}

#[utoipa::path(
    delete,
    path = "/api/info-tags/{id}",
    tag = "Info tags",
    params(("id" = Uuid, Path, description = "Info tag id")),
    responses((status = 200, body = MessageResponse), (status = 404, body = ErrorResponse))
)]
pub async fn delete_info_tag(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<MessageResponse>, ApiError> {
    let deleted = state
        .db
        .info_tags
        .delete(&user.user_id, id)
        .await
        .or_fail("Failed to delete info tag")?;
    if !deleted {
        return Err(tag_not_found());
    }
    Ok(Json(MessageResponse::new("Info tag deleted successfully")))
}
