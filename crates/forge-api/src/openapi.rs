use utoipa::OpenApi;

use crate::handlers::{
    ai_keys, auth, chat, deliverables, events, goals, health, info_tags, ErrorResponse,
    MessageResponse,
};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Forge API",
        description = "Goals, deliverables, calendar events and an LLM chat proxy."
    ),
    paths(
        health::health_check,
        auth::register,
        auth::login,
        auth::logout,
        auth::me,
        goals::list_goals,
        goals::create_goal,
        goals::get_goal,
        goals::update_goal,
        goals::delete_goal,
        goals::schedule_goal,
        deliverables::update_deliverable,
        deliverables::delete_deliverable,
        deliverables::list_goal_events,
        deliverables::update_goal_event,
        deliverables::delete_goal_event,
        events::list_events,
        events::create_event,
        events::get_event,
        events::update_event,
        events::delete_event,
        info_tags::list_info_tags,
        info_tags::create_info_tag,
        info_tags::get_info_tag,
        info_tags::update_info_tag,
        info_tags::delete_info_tag,
        ai_keys::list_ai_keys,
        ai_keys::create_ai_key,
        ai_keys::get_ai_key,
        ai_keys::update_ai_key,
        ai_keys::delete_ai_key,
        chat::chat,
    ),
    components(schemas(
        ErrorResponse,
        MessageResponse,
        auth::Credentials,
        auth::UserSummary,
        auth::AuthResponse,
        auth::MeResponse,
        goals::ScheduleRequest,
        ai_keys::CreateAiKeyRequest,
        ai_keys::UpdateAiKeyRequest,
        chat::ChatBody,
        forge_core::Goal,
        forge_core::Deliverable,
        forge_core::InfoTag,
        forge_core::CalendarEvent,
        forge_core::CalendarEntry,
        forge_core::AiProvider,
        forge_core::AiAgentApiKey,
        forge_core::ChatRole,
        forge_core::ChatPart,
        forge_core::ChatMessage,
        forge_core::GoalInput,
        forge_core::DeliverableInput,
        forge_core::InfoTagInput,
        forge_core::UpdateDeliverableRequest,
        forge_core::CreateCalendarEventRequest,
        forge_core::UpdateCalendarEventRequest,
        forge_core::CreateInfoTagRequest,
        forge_core::UpdateInfoTagRequest,
    )),
    tags(
        (name = "System"),
        (name = "Auth", description = "Cookie sessions"),
        (name = "Goals"),
        (name = "Deliverables"),
        (name = "Goal events", description = "Scheduled deliverables"),
        (name = "Events", description = "Standalone calendar events"),
        (name = "Info tags"),
        (name = "AI keys", description = "Per-user provider API keys"),
        (name = "Chat", description = "Streaming LLM proxy"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_lists_routes() {
        let doc = ApiDoc::openapi();
        let paths = &doc.paths.paths;
        for path in [
            "/health",
            "/api/auth/register",
            "/api/goals/{id}/schedule",
            "/api/goal-events/{id}",
            "/api/ai-agent-api-keys/{id}",
            "/api/chat",
        ] {
            assert!(paths.contains_key(path), "missing {path}");
        }
    }
}
