//! Goal handlers, including placeholder scheduling of deliverables.

use axum::{extract::State, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, info};
use utoipa::ToSchema;
use uuid::Uuid;

use forge_core::validation::validate_goal_input;
use forge_core::{
    plan_placeholder_slots, DeliverableRepository, Goal, GoalInput, GoalRepository, SlotRequest,
};

use crate::error::ApiResultExt;
use crate::extract::{ApiJson, ApiPath, OptionalJson};
use crate::handlers::{ErrorResponse, MessageResponse};
use crate::session::CurrentUser;
use crate::{ApiError, AppState};

fn goal_not_found() -> ApiError {
    ApiError::NotFound("Goal not found".to_string())
}

/// All goals of the caller, newest first.
#[utoipa::path(
    get,
    path = "/api/goals",
    tag = "Goals",
    responses((status = 200, body = [Goal]), (status = 401, body = ErrorResponse))
)]
pub async fn list_goals(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<Goal>>, ApiError> {
    let goals = state
        .db
        .goals
        .list_for_user(&user.user_id)
        .await
        .or_fail("Failed to fetch goals")?;
    Ok(Json(goals))
}

/// Create a goal with its deliverables and info tags.
#[utoipa::path(
    post,
    path = "/api/goals",
    tag = "Goals",
    request_body = GoalInput,
    responses((status = 201, body = Goal), (status = 400, body = ErrorResponse))
)]
pub async fn create_goal(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiJson(input): ApiJson<GoalInput>,
) -> Result<(StatusCode, Json<Goal>), ApiError> {
    validate_goal_input(&input)?;

    let goal = state
        .db
        .goals
        .create(&user.user_id, input)
        .await
        .or_fail("Failed to create goal")?;

    info!(
        subsystem = "api",
        component = "goals",
        op = "create",
        user_id = %user.user_id,
        goal_id = %goal.id,
        "Goal created"
    );
    Ok((StatusCode::CREATED, Json(goal)))
}

#[utoipa::path(
    get,
    path = "/api/goals/{id}",
    tag = "Goals",
    params(("id" = Uuid, Path, description = "Goal id")),
    responses((status = 200, body = Goal), (status = 404, body = ErrorResponse))
)]
pub async fn get_goal(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Goal>, ApiError> {
    let goal = state
        .db
        .goals
        .get(&user.user_id, id)
        .await
        .or_fail("Failed to fetch goal")?
        .ok_or_else(goal_not_found)?;
    Ok(Json(goal))
}

/// Replace a goal's fields and all of its deliverables and goal tags.
#[utoipa::path(
    put,
    path = "/api/goals/{id}",
    tag = "Goals",
    params(("id" = Uuid, Path, description = "Goal id")),
    request_body = GoalInput,
    responses(
        (status = 200, body = Goal),
        (status = 400, body = ErrorResponse),
        (status = 404, body = ErrorResponse)
    )
)]
pub async fn update_goal(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(input): ApiJson<GoalInput>,
) -> Result<Json<Goal>, ApiError> {
    validate_goal_input(&input)?;

    let goal = state
        .db
        .goals
        .replace(&user.user_id, id, input)
        .await
        .or_fail("Failed to update goal")?
        .ok_or_else(goal_not_found)?;
    Ok(Json(goal))
}

#[utoipa::path(
    delete,
    path = "/api/goals/{id}",
    tag = "Goals",
    params(("id" = Uuid, Path, description = "Goal id")),
    responses((status = 200, body = MessageResponse), (status = 404, body = ErrorResponse))
)]
pub async fn delete_goal(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<MessageResponse>, ApiError> {
    let deleted = state
        .db
        .goals
        .delete(&user.user_id, id)
        .await
        .or_fail("Failed to delete goal")?;
    if !deleted {
        return Err(goal_not_found());
    }
    Ok(Json(MessageResponse::new("Goal deleted successfully")))
}

/// Window for placeholder scheduling. Missing `start` means now; missing
/// `end` means the goal's due date.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ScheduleRequest {
    #[serde(default, deserialize_with = "forge_core::datetime::deserialize_option")]
    pub start: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "forge_core::datetime::deserialize_option")]
    pub end: Option<DateTime<Utc>>,
}

/// Spread the goal's open, unscheduled deliverables across a window.
#[utoipa::path(
    post,
    path = "/api/goals/{id}/schedule",
    tag = "Goals",
    params(("id" = Uuid, Path, description = "Goal id")),
    request_body = ScheduleRequest,
    responses(
        (status = 200, body = Goal),
        (status = 400, body = ErrorResponse),
        (status = 404, body = ErrorResponse)
    )
)]
pub async fn schedule_goal(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
    OptionalJson(body): OptionalJson<ScheduleRequest>,
) -> Result<Json<Goal>, ApiError> {
    let ScheduleRequest { start, end } = body.unwrap_or_default();

    let goal = state
        .db
        .goals
        .get(&user.user_id, id)
        .await
        .or_fail("Failed to schedule goal")?
        .ok_or_else(goal_not_found)?;

    let window_start = start.unwrap_or_else(Utc::now);
    let window_end = end.or(goal.due_date).ok_or_else(|| {
        ApiError::BadRequest("A schedule end or a goal due date is required".to_string())
    })?;

    let requests = pending_slot_requests(&goal);
    let plan = plan_placeholder_slots(window_start, window_end, &requests)?;

    if plan.is_empty() {
        debug!(subsystem = "api", component = "goals", goal_id = %id, "Nothing to schedule");
        return Ok(Json(goal));
    }

    state
        .db
        .deliverables
        .assign_slots(&user.user_id, id, &plan)
        .await
        .or_fail("Failed to schedule goal")?;

    info!(
        subsystem = "api",
        component = "goals",
        op = "schedule",
        goal_id = %id,
        result_count = plan.len(),
        "Placeholder events generated"
    );

    let goal = state
        .db
        .goals
        .get(&user.user_id, id)
        .await
        .or_fail("Failed to schedule goal")?
        .ok_or_else(goal_not_found)?;
    Ok(Json(goal))
}

/// Deliverables that still need a slot, in goal order.
fn pending_slot_requests(goal: &Goal) -> Vec<SlotRequest> {
    goal.deliverables
        .iter()
        .filter(|d| !d.completed && !d.is_scheduled())
        .map(|d| SlotRequest {
            deliverable_id: d.id,
            minutes_estimate: d.minutes_estimate,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use forge_core::Deliverable;

    fn deliverable(order: i32, completed: bool, scheduled: bool) -> Deliverable {
        let at = Utc.with_ymd_and_hms(2026, 5, 1, 9, 0, 0).unwrap();
        Deliverable {
            id: Uuid::now_v7(),
            goal_id: Uuid::nil(),
            title: format!("d{order}"),
            completed,
            minutes_estimate: Some(15 * (order + 1)),
            order,
            start: scheduled.then_some(at),
            end: scheduled.then_some(at),
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn test_pending_requests_skip_done_and_scheduled() {
        let at = Utc.with_ymd_and_hms(2026, 5, 1, 9, 0, 0).unwrap();
        let goal = Goal {
            id: Uuid::nil(),
            user_id: "a@b.co".to_string(),
            title: "Goal".to_string(),
            description: String::new(),
            due_date: None,
            created_at: at,
            updated_at: at,
            deliverables: vec![
                deliverable(0, false, false),
                deliverable(1, true, false),
                deliverable(2, false, true),
                deliverable(3, false, false),
            ],
            info_tags: Vec::new(),
        };

        let requests = pending_slot_requests(&goal);
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].deliverable_id, goal.deliverables[0].id);
        assert_eq!(requests[1].deliverable_id, goal.deliverables[3].id);
        assert_eq!(requests[1].minutes_estimate, Some(60));
    }

    #[test]
    fn test_schedule_request_accepts_dates() {
        let req: ScheduleRequest =
            serde_json::from_str(r#"{"start":"2026-05-01","end":"2026-05-02T17:00:00"}"#).unwrap();
        assert!(req.start.unwrap() < req.end.unwrap());
    }

    #[test]
    fn test_schedule_request_rejects_unparsable_dates() {
        let result =
            serde_json::from_str::<ScheduleRequest>(r#"{"start":"not-a-date","end":"also garbage"}"#);
        assert!(result.is_err());
    }
}
