//! Calendar event handlers. Responses use the calendar widget shape.

use axum::{extract::State, http::StatusCode, Json};
use uuid::Uuid;

use forge_core::validation::{validate_metadata, validate_time_range, validate_title};
use forge_core::{
    CalendarEntry, CalendarEventRepository, CreateCalendarEventRequest, UpdateCalendarEventRequest,
};

use crate::error::ApiResultExt;
use crate::extract::{ApiJson, ApiPath};
use crate::handlers::{ErrorResponse, MessageResponse};
use crate::session::CurrentUser;
use crate::{ApiError, AppState};

fn event_not_found() -> ApiError {
    ApiError::NotFound("Event not found".to_string())
}

/// The caller's events ordered by start.
#[utoipa::path(
    get,
    path = "/api/events",
    tag = "Events",
    responses((status = 200, body = [CalendarEntry]), (status = 401, body = ErrorResponse))
)]
pub async fn list_events(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<CalendarEntry>>, ApiError> {
    let events = state
        .db
        .calendar_events
        .list_for_user(&user.user_id)
        .await
        .or_fail("Failed to fetch events")?;
    Ok(Json(events.into_iter().map(CalendarEntry::from).collect()))
}

#[utoipa::path(
    post,
    path = "/api/events",
    tag = "Events",
    request_body = CreateCalendarEventRequest,
    responses((status = 201, body = CalendarEntry), (status = 400, body = ErrorResponse))
)]
pub async fn create_event(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiJson(mut req): ApiJson<CreateCalendarEventRequest>,
) -> Result<(StatusCode, Json<CalendarEntry>), ApiError> {
    req.title = validate_title(&req.title, "Event")?;
    validate_time_range(req.start, req.end)?;
    validate_metadata(req.metadata.as_ref())?;

    let event = state
        .db
        .calendar_events
        .create(&user.user_id, req)
        .await
        .or_fail("Failed to create event")?;
    Ok((StatusCode::CREATED, Json(CalendarEntry::from(event))))
}

#[utoipa::path(
    get,
    path = "/api/events/{id}",
    tag = "Events",
    params(("id" = Uuid, Path, description = "Event id")),
    responses((status = 200, body = CalendarEntry), (status = 404, body = ErrorResponse))
)]
pub async fn get_event(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<CalendarEntry>, ApiError> {
    let event = state
        .db
        .calendar_events
        .get(&user.user_id, id)
        .await
        .or_fail("Failed to fetch event")?
        .ok_or_else(event_not_found)?;
    Ok(Json(CalendarEntry::from(event)))
}

/// Partial update. `metadata: null` clears the metadata.
#[utoipa::path(
    patch,
    path = "/api/events/{id}",
    tag = "Events",
    params(("id" = Uuid, Path, description = "Event id")),
    request_body = UpdateCalendarEventRequest,
    responses(
        (status = 200, body = CalendarEntry),
        (status = 400, body = ErrorResponse),
        (status = 404, body = ErrorResponse)
    )
)]
pub async fn update_event(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(mut req): ApiJson<UpdateCalendarEventRequest>,
) -> Result<Json<CalendarEntry>, ApiError> {
    if let Some(title) = &req.title {
        req.title = Some(validate_title(title, "Event")?);
    }
    if let Some(metadata) = &req.metadata {
        validate_metadata(metadata.as_ref())?;
    }

    // The stored range must stay valid after merging in the partial update.
    let current = state
        .db
        .calendar_events
        .get(&user.user_id, id)
        .await
        .or_fail("Failed to update event")?
        .ok_or_else(event_not_found)?;
    validate_time_range(
        req.start.unwrap_or(current.start),
        req.end.unwrap_or(current.end),
    )?;

    let event = state
        .db
        .calendar_events
        .update(&user.user_id, id, req)
        .await
        .or_fail("Failed to update event")?
        .ok_or_else(event_not_found)?;
    Ok(Json(CalendarEntry::from(event)))
}

#[utoipa::path(
    delete,
    path = "/api/events/{id}",
    tag = "Events",
    params(("id" = Uuid, Path, description = "Event id")),
    responses((status = 200, body = MessageResponse), (status = 404, body = ErrorResponse))
)]
pub async fn delete_event(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<MessageResponse>, ApiError> {
    let deleted = state
        .db
        .calendar_events
        .delete(&user.user_id, id)
        .await
        .or_fail("Failed to delete event")?;
    if !deleted {
        return Err(event_not_found());
    }
    Ok(Json(MessageResponse::new("Event deleted successfully")))
}
