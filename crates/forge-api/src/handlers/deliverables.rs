//! Deliverable and goal event handlers.
//!
//! A goal event is a deliverable with both `start` and `end` set, so both
//! route groups operate on the same rows and differ only in what they accept
//! and how they present results.

use axum::{extract::State, Json};
use tracing::info;
use uuid::Uuid;

use forge_core::validation::{validate_minutes_estimate, validate_time_range, validate_title};
use forge_core::{CalendarEntry, Deliverable, DeliverableRepository, UpdateDeliverableRequest};

use crate::error::ApiResultExt;
use crate::extract::{ApiJson, ApiPath};
use crate::handlers::{ErrorResponse, MessageResponse};
use crate::session::CurrentUser;
use crate::{ApiError, AppState};

/// Failure messages for one route group.
struct Messages {
    not_found: &'static str,
    update_failed: &'static str,
    delete_failed: &'static str,
    deleted: &'static str,
}

const DELIVERABLE: Messages = Messages {
    not_found: "Deliverable not found",
    update_failed: "Failed to update deliverable",
    delete_failed: "Failed to delete deliverable",
    deleted: "Deliverable deleted successfully",
};

const GOAL_EVENT: Messages = Messages {
    not_found: "Event not found",
    update_failed: "Failed to update event",
    delete_failed: "Failed to delete event",
    deleted: "Event deleted successfully",
};

async fn apply_update(
    state: &AppState,
    user_id: &str,
    id: Uuid,
    mut req: UpdateDeliverableRequest,
    messages: &Messages,
) -> Result<Deliverable, ApiError> {
    if let Some(title) = &req.title {
        req.title = Some(validate_title(title, "Deliverable")?);
    }
    validate_minutes_estimate(req.minutes_estimate.flatten())?;

    let current = state
        .db
        .deliverables
        .get(user_id, id)
        .await
        .or_fail(messages.update_failed)?
        .ok_or_else(|| ApiError::NotFound(messages.not_found.to_string()))?;

    let start = req.start.unwrap_or(current.start);
    let end = req.end.unwrap_or(current.end);
    if let (Some(start), Some(end)) = (start, end) {
        validate_time_range(start, end)?;
    }

    state
        .db
        .deliverables
        .update(user_id, id, req)
        .await
        .or_fail(messages.update_failed)?
        .ok_or_else(|| ApiError::NotFound(messages.not_found.to_string()))
}

async fn apply_delete(
    state: &AppState,
    user_id: &str,
    id: Uuid,
    messages: &Messages,
) -> Result<Json<MessageResponse>, ApiError> {
    let deleted = state
        .db
        .deliverables
        .delete(user_id, id)
        .await
        .or_fail(messages.delete_failed)?;
    if !deleted {
        return Err(ApiError::NotFound(messages.not_found.to_string()));
    }
    Ok(Json(MessageResponse::new(messages.deleted)))
}

/// Partial update of title, completion and estimate. `minutesEstimate: null`
/// clears the estimate.
#[utoipa::path(
    patch,
    path = "/api/deliverables/{id}",
    tag = "Deliverables",
    params(("id" = Uuid, Path, description = "Deliverable id")),
    request_body = UpdateDeliverableRequest,
    responses((status = 200, body = Deliverable), (status = 404, body = ErrorResponse))
)]
pub async fn update_deliverable(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(mut req): ApiJson<UpdateDeliverableRequest>,
) -> Result<Json<Deliverable>, ApiError> {
    req.start = None;
    req.end = None;
    let deliverable = apply_update(&state, &user.user_id, id, req, &DELIVERABLE).await?;
    Ok(Json(deliverable))
}

#[utoipa::path(
    delete,
    path = "/api/deliverables/{id}",
    tag = "Deliverables",
    params(("id" = Uuid, Path, description = "Deliverable id")),
    responses((status = 200, body = MessageResponse), (status = 404, body = ErrorResponse))
)]
pub async fn delete_deliverable(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<MessageResponse>, ApiError> {
    apply_delete(&state, &user.user_id, id, &DELIVERABLE).await
}

/// Scheduled deliverables across all of the caller's goals, in calendar shape.
#[utoipa::path(
    get,
    path = "/api/goal-events",
    tag = "Goal events",
    responses((status = 200, body = [CalendarEntry]), (status = 401, body = ErrorResponse))
)]
pub async fn list_goal_events(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<CalendarEntry>>, ApiError> {
    let events = state
        .db
        .deliverables
        .list_goal_events(&user.user_id)
        .await
        .or_fail("Failed to fetch goal events")?;
    Ok(Json(events.into_iter().map(CalendarEntry::from).collect()))
}

/// Partial update, including moving the event on the calendar. Sending
/// `start` and `end` as `null` takes it off the calendar.
#[utoipa::path(
    patch,
    path = "/api/goal-events/{id}",
    tag = "Goal events",
    params(("id" = Uuid, Path, description = "Deliverable id")),
    request_body = UpdateDeliverableRequest,
    responses(
        (status = 200, body = Deliverable),
        (status = 400, body = ErrorResponse),
        (status = 404, body = ErrorResponse)
    )
)]
pub async fn update_goal_event(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<UpdateDeliverableRequest>,
) -> Result<Json<Deliverable>, ApiError> {
    let deliverable = apply_update(&state, &user.user_id, id, req, &GOAL_EVENT).await?;
    info!(
        subsystem = "api",
        component = "goal_events",
        op = "update",
        event_id = %id,
        scheduled = deliverable.is_scheduled(),
        "Goal event updated"
    );
    Ok(Json(deliverable))
}

#[utoipa::path(
    delete,
    path = "/api/goal-events/{id}",
    tag = "Goal events",
    params(("id" = Uuid, Path, description = "Deliverable id")),
    responses((status = 200, body = MessageResponse), (status = 404, body = ErrorResponse))
)]
pub async fn delete_goal_event(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<MessageResponse>, ApiError> {
    apply_delete(&state, &user.user_id, id, &GOAL_EVENT).await
}
