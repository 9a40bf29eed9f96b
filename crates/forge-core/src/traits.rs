//! Core traits for forge abstractions.
//!
//! Every repository method that touches user-owned data takes the caller's
//! user id and scopes its query to it. A row owned by someone else looks
//! exactly like a missing row (`None` / `false`).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value as JsonValue;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::Result;
use crate::models::*;
use crate::schedule::SlotAssignment;

// =============================================================================
// USER REPOSITORY
// =============================================================================

/// Repository for accounts.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a new user. Fails with a unique violation if the email exists.
    async fn create(&self, email: &str, password_hash: &str) -> Result<User>;

    /// Fetch a user by email.
    async fn get(&self, email: &str) -> Result<Option<User>>;

    /// Whether a user with this email exists.
    async fn exists(&self, email: &str) -> Result<bool>;

    /// Delete a user and everything they own.
    async fn delete(&self, email: &str) -> Result<bool>;
}

// =============================================================================
// GOAL REPOSITORY
// =============================================================================

/// Deliverable as supplied when creating or replacing a goal.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeliverableInput {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub minutes_estimate: Option<i32>,
    #[serde(default, deserialize_with = "crate::datetime::deserialize_option")]
    pub start: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "crate::datetime::deserialize_option")]
    pub end: Option<DateTime<Utc>>,
}

/// Info tag as supplied when creating or replacing a goal.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InfoTagInput {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub info: String,
}

/// Body for creating a goal, and for replacing one wholesale.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GoalInput {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, deserialize_with = "crate::datetime::deserialize_option")]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub deliverables: Vec<DeliverableInput>,
    #[serde(default)]
    pub info_tags: Vec<InfoTagInput>,
}

/// Repository for goals and their owned children.
#[async_trait]
pub trait GoalRepository: Send + Sync {
    /// All goals of a user, newest first, with children attached.
    async fn list_for_user(&self, user_id: &str) -> Result<Vec<Goal>>;

    /// A single goal with children.
    async fn get(&self, user_id: &str, id: Uuid) -> Result<Option<Goal>>;

    /// Create a goal and its children in one transaction.
    async fn create(&self, user_id: &str, input: GoalInput) -> Result<Goal>;

    /// Overwrite scalar fields and replace all deliverables and goal tags.
    async fn replace(&self, user_id: &str, id: Uuid, input: GoalInput) -> Result<Option<Goal>>;

    /// Delete a goal; children cascade.
    async fn delete(&self, user_id: &str, id: Uuid) -> Result<bool>;
}

// =============================================================================
// DELIVERABLE REPOSITORY
// =============================================================================

/// Partial update of a deliverable or goal event. `None` leaves a field
/// alone; `Some(None)` (an explicit `null`) clears the estimate or the slot.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDeliverableRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub completed: Option<bool>,
    #[serde(default, deserialize_with = "crate::datetime::deserialize_nullable")]
    #[schema(value_type = Option<i32>)]
    pub minutes_estimate: Option<Option<i32>>,
    #[serde(default, deserialize_with = "crate::datetime::deserialize_nullable_datetime")]
    #[schema(value_type = Option<String>, format = DateTime)]
    pub start: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "crate::datetime::deserialize_nullable_datetime")]
    #[schema(value_type = Option<String>, format = DateTime)]
    pub end: Option<Option<DateTime<Utc>>>,
}

/// Repository for deliverables, which double as goal events once scheduled.
#[async_trait]
pub trait DeliverableRepository: Send + Sync {
    /// Fetch one deliverable whose goal belongs to the user.
    async fn get(&self, user_id: &str, id: Uuid) -> Result<Option<Deliverable>>;

    /// Apply a partial update.
    async fn update(
        &self,
        user_id: &str,
        id: Uuid,
        req: UpdateDeliverableRequest,
    ) -> Result<Option<Deliverable>>;

    /// Delete one deliverable.
    async fn delete(&self, user_id: &str, id: Uuid) -> Result<bool>;

    /// Every scheduled deliverable of the user, ordered by start.
    async fn list_goal_events(&self, user_id: &str) -> Result<Vec<GoalEvent>>;

    /// Write planned slots for deliverables of one goal in a single transaction.
    async fn assign_slots(
        &self,
        user_id: &str,
        goal_id: Uuid,
        slots: &[SlotAssignment],
    ) -> Result<usize>;
}

// =============================================================================
// CALENDAR EVENT REPOSITORY
// =============================================================================

/// Body for creating a calendar event.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateCalendarEventRequest {
    #[serde(default)]
    pub title: String,
    #[serde(deserialize_with = "crate::datetime::deserialize")]
    pub start: DateTime<Utc>,
    #[serde(deserialize_with = "crate::datetime::deserialize")]
    pub end: DateTime<Utc>,
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    #[schema(value_type = Option<Object>)]
    pub metadata: Option<JsonValue>,
}

/// Partial update of a calendar event. `metadata: null` clears it.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCalendarEventRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "crate::datetime::deserialize_option")]
    pub start: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "crate::datetime::deserialize_option")]
    pub end: Option<DateTime<Utc>>,
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default, deserialize_with = "crate::datetime::deserialize_nullable")]
    #[schema(value_type = Option<Object>)]
    pub metadata: Option<Option<JsonValue>>,
}

/// Repository for stand-alone calendar events.
#[async_trait]
pub trait CalendarEventRepository: Send + Sync {
    /// All events of a user ordered by start.
    async fn list_for_user(&self, user_id: &str) -> Result<Vec<CalendarEvent>>;

    async fn get(&self, user_id: &str, id: Uuid) -> Result<Option<CalendarEvent>>;

    async fn create(&self, user_id: &str, req: CreateCalendarEventRequest)
        -> Result<CalendarEvent>;

    async fn update(
        &self,
        user_id: &str,
        id: Uuid,
        req: UpdateCalendarEventRequest,
    ) -> Result<Option<CalendarEvent>>;

    async fn delete(&self, user_id: &str, id: Uuid) -> Result<bool>;
}

// =============================================================================
// INFO TAG REPOSITORY
// =============================================================================

/// Body for creating an info tag.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateInfoTagRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub info: String,
    /// Attach to a goal instead of the user.
    #[serde(default)]
    pub goal_id: Option<Uuid>,
}

/// Partial update of an info tag.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateInfoTagRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub info: Option<String>,
}

/// Repository for info tags.
#[async_trait]
pub trait InfoTagRepository: Send + Sync {
    /// User-level tags (not attached to any goal).
    async fn list_for_user(&self, user_id: &str) -> Result<Vec<InfoTag>>;

    async fn get(&self, user_id: &str, id: Uuid) -> Result<Option<InfoTag>>;

    /// Create a tag. Returns `None` when `goal_id` names a goal the user
    /// does not own.
    async fn create(&self, user_id: &str, req: CreateInfoTagRequest) -> Result<Option<InfoTag>>;

    async fn update(
        &self,
        user_id: &str,
        id: Uuid,
        req: UpdateInfoTagRequest,
    ) -> Result<Option<InfoTag>>;

    async fn delete(&self, user_id: &str, id: Uuid) -> Result<bool>;
}

// =============================================================================
// AI KEY REPOSITORY
// =============================================================================

/// A key ready for storage: already sealed and masked.
#[derive(Debug, Clone)]
pub struct NewAiKey {
    pub provider: AiProvider,
    pub name: Option<String>,
    pub sealed_key: Vec<u8>,
    pub key_preview: String,
}

/// Partial update of a stored key. A new secret arrives sealed and masked.
#[derive(Debug, Clone, Default)]
pub struct AiKeyChanges {
    pub provider: Option<AiProvider>,
    pub name: Option<String>,
    pub sealed_key: Option<(Vec<u8>, String)>,
}

/// Repository for per-user provider credentials.
#[async_trait]
pub trait AiKeyRepository: Send + Sync {
    /// Keys of a user, newest first.
    async fn list_for_user(&self, user_id: &str) -> Result<Vec<AiAgentApiKey>>;

    async fn get(&self, user_id: &str, id: Uuid) -> Result<Option<AiAgentApiKey>>;

    /// The key a user stored for a provider, if any.
    async fn find_by_provider(
        &self,
        user_id: &str,
        provider: AiProvider,
    ) -> Result<Option<AiAgentApiKey>>;

    /// Insert. Fails with a unique violation on a duplicate provider.
    async fn create(&self, user_id: &str, key: NewAiKey) -> Result<AiAgentApiKey>;

    async fn update(
        &self,
        user_id: &str,
        id: Uuid,
        changes: AiKeyChanges,
    ) -> Result<Option<AiAgentApiKey>>;

    async fn delete(&self, user_id: &str, id: Uuid) -> Result<bool>;

    /// Sealed secret for a provider, for the chat proxy only.
    async fn sealed_key_for_provider(
        &self,
        user_id: &str,
        provider: AiProvider,
    ) -> Result<Option<Vec<u8>>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    #[test]
    fn test_goal_input_defaults() {
        let input: GoalInput = serde_json::from_str(r#"{"title":"Learn Rust"}"#).unwrap();
        assert_eq!(input.title, "Learn Rust");
        assert_eq!(input.description, "");
        assert!(input.due_date.is_none());
        assert!(input.deliverables.is_empty());
        assert!(input.info_tags.is_empty());
    }

    #[test]
    fn test_goal_input_nested() {
        let input: GoalInput = serde_json::from_str(
            r#"{
                "title": "Launch",
                "description": "Ship it",
                "dueDate": "2026-12-31",
                "deliverables": [
                    {"title": "Docs", "minutesEstimate": 90},
                    {"title": "Release", "completed": true, "start": "2026-12-01T09:00:00Z", "end": "2026-12-01T10:00:00Z"}
                ],
                "infoTags": [{"title": "Why", "info": "Customers asked"}]
            }"#,
        )
        .unwrap();
        assert_eq!(input.due_date.unwrap().month(), 12);
        assert_eq!(input.deliverables.len(), 2);
        assert_eq!(input.deliverables[0].minutes_estimate, Some(90));
        assert!(!input.deliverables[0].completed);
        assert!(input.deliverables[1].completed);
        assert!(input.deliverables[1].start.is_some());
        assert_eq!(input.info_tags[0].info, "Customers asked");
    }

    #[test]
    fn test_goal_input_missing_title_is_empty() {
        let input: GoalInput = serde_json::from_str("{}").unwrap();
        assert!(input.title.is_empty());
    }

    #[test]
    fn test_update_deliverable_partial() {
        let req: UpdateDeliverableRequest =
            serde_json::from_str(r#"{"completed":true}"#).unwrap();
        assert_eq!(req.completed, Some(true));
        assert!(req.title.is_none());
        assert!(req.minutes_estimate.is_none());
        assert!(req.start.is_none());
    }

    #[test]
    fn test_update_deliverable_null_clears() {
        let req: UpdateDeliverableRequest =
            serde_json::from_str(r#"{"minutesEstimate":null,"start":null,"end":null}"#).unwrap();
        assert_eq!(req.minutes_estimate, Some(None));
        assert_eq!(req.start, Some(None));
        assert_eq!(req.end, Some(None));

        let req: UpdateDeliverableRequest =
            serde_json::from_str(r#"{"minutesEstimate":45,"end":"2026-05-01T10:00:00Z"}"#)
                .unwrap();
        assert_eq!(req.minutes_estimate, Some(Some(45)));
        assert!(req.start.is_none());
        assert!(matches!(req.end, Some(Some(_))));
    }

    #[test]
    fn test_create_calendar_event_requires_times() {
        let result = serde_json::from_str::<CreateCalendarEventRequest>(r#"{"title":"x"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_update_calendar_event_metadata_tristate() {
        let absent: UpdateCalendarEventRequest = serde_json::from_str("{}").unwrap();
        assert!(absent.metadata.is_none());

        let cleared: UpdateCalendarEventRequest =
            serde_json::from_str(r#"{"metadata":null}"#).unwrap();
        assert_eq!(cleared.metadata, Some(None));

        let set: UpdateCalendarEventRequest =
            serde_json::from_str(r#"{"metadata":{"color":"red"}}"#).unwrap();
        assert!(matches!(set.metadata, Some(Some(_))));
    }

    #[test]
    fn test_create_info_tag_goal_id() {
        let req: CreateInfoTagRequest = serde_json::from_str(
            r#"{"title":"t","info":"i","goalId":"0190f0c8-0000-7000-8000-000000000000"}"#,
        )
        .unwrap();
        assert!(req.goal_id.is_some());
    }
}
