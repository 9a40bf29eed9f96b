//! Core data models for forge.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{Error, Result};

// =============================================================================
// USER TYPES
// =============================================================================

/// A registered account. The email address is the primary key.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Email address, stored lower-cased.
    pub id: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// GOAL TYPES
// =============================================================================

/// A goal with its deliverables and info tags.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Goal {
    pub id: Uuid,
    pub user_id: String,
    pub title: String,
    pub description: String,
    pub due_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Ordered by `order` ascending.
    pub deliverables: Vec<Deliverable>,
    pub info_tags: Vec<InfoTag>,
}

/// A goal-scoped sub-task. When both `start` and `end` are set it is also a
/// goal event and shows up on the calendar.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Deliverable {
    pub id: Uuid,
    pub goal_id: Uuid,
    pub title: String,
    pub completed: bool,
    pub minutes_estimate: Option<i32>,
    pub order: i32,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Deliverable {
    /// Whether the deliverable has a concrete time slot.
    pub fn is_scheduled(&self) -> bool {
        self.start.is_some() && self.end.is_some()
    }
}

/// A scheduled deliverable joined with its goal title.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalEvent {
    pub id: Uuid,
    pub goal_id: Uuid,
    pub goal_title: String,
    pub title: String,
    pub completed: bool,
    pub minutes_estimate: Option<i32>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

// =============================================================================
// INFO TAG TYPES
// =============================================================================

/// Free-text annotation. `goal_id == None` means the tag belongs to the user.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InfoTag {
    pub id: Uuid,
    pub user_id: String,
    pub goal_id: Option<Uuid>,
    pub title: String,
    pub info: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// CALENDAR TYPES
// =============================================================================

/// A stand-alone calendar entry.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    pub id: Uuid,
    pub user_id: String,
    pub title: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub kind: Option<String>,
    /// Free-form JSON object.
    #[schema(value_type = Option<Object>)]
    pub metadata: Option<JsonValue>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Kind reported for deliverables rendered on the calendar.
pub const GOAL_EVENT_KIND: &str = "goal-event";

/// Calendar widget shape shared by calendar events and goal events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEntry {
    pub id: Uuid,
    pub title: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[schema(value_type = Object)]
    pub extended_props: JsonValue,
}

impl From<CalendarEvent> for CalendarEntry {
    fn from(event: CalendarEvent) -> Self {
        let mut props = match event.metadata {
            Some(JsonValue::Object(map)) => map,
            _ => serde_json::Map::new(),
        };
        if let Some(kind) = event.kind {
            props.insert("kind".to_string(), JsonValue::String(kind));
        }
        Self {
            id: event.id,
            title: event.title,
            start: event.start,
            end: event.end,
            extended_props: JsonValue::Object(props),
        }
    }
}

impl From<GoalEvent> for CalendarEntry {
    fn from(event: GoalEvent) -> Self {
        Self {
            id: event.id,
            title: event.title,
            start: event.start,
            end: event.end,
            extended_props: serde_json::json!({
                "goalId": event.goal_id,
                "goalTitle": event.goal_title,
                "completed": event.completed,
                "minutesEstimate": event.minutes_estimate,
                "kind": GOAL_EVENT_KIND,
            }),
        }
    }
}

// =============================================================================
// AI PROVIDER TYPES
// =============================================================================

/// Third-party LLM providers a user can store a key for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum AiProvider {
    Anthropic,
    Openai,
    Google,
    Mistral,
    Cohere,
}

impl AiProvider {
    /// All providers in display order.
    pub const ALL: [AiProvider; 5] = [
        AiProvider::Anthropic,
        AiProvider::Openai,
        AiProvider::Google,
        AiProvider::Mistral,
        AiProvider::Cohere,
    ];

    /// Upper-case wire and storage form.
    pub fn as_str(&self) -> &'static str {
        match self {
            AiProvider::Anthropic => "ANTHROPIC",
            AiProvider::Openai => "OPENAI",
            AiProvider::Google => "GOOGLE",
            AiProvider::Mistral => "MISTRAL",
            AiProvider::Cohere => "COHERE",
        }
    }

    /// Environment variable the seed tool reads a key from.
    pub fn env_key_var(&self) -> &'static str {
        match self {
            AiProvider::Anthropic => "ANTHROPIC_API_KEY",
            AiProvider::Openai => "OPENAI_API_KEY",
            AiProvider::Google => "GOOGLE_API_KEY",
            AiProvider::Mistral => "MISTRAL_API_KEY",
            AiProvider::Cohere => "COHERE_API_KEY",
        }
    }

    /// Message returned for unknown provider names.
    pub fn invalid_provider_message() -> String {
        let names: Vec<&str> = Self::ALL.iter().map(|p| p.as_str()).collect();
        format!("Invalid provider. Must be one of: {}", names.join(", "))
    }
}

impl fmt::Display for AiProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AiProvider {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::InvalidInput(Self::invalid_provider_message()))
    }
}

/// A stored provider credential. The secret itself never leaves the database
/// layer in this type; only a masked preview does.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AiAgentApiKey {
    pub id: Uuid,
    pub user_id: String,
    pub provider: AiProvider,
    pub name: Option<String>,
    pub key_preview: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// CHAT TYPES
// =============================================================================

/// Speaker of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// One part of a UI-style message. Only text parts carry content.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChatPart {
    #[serde(rename = "type")]
    pub part_type: String,
    #[serde(default)]
    pub text: Option<String>,
}

/// A chat message as posted by clients: either plain `content` or `parts`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChatMessage {
    pub role: ChatRole,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub parts: Option<Vec<ChatPart>>,
}

impl ChatMessage {
    /// Plain-text message.
    pub fn text(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: Some(content.into()),
            parts: None,
        }
    }

    /// Flatten to text: `content` wins, otherwise text parts joined in order.
    pub fn text_content(&self) -> String {
        if let Some(content) = &self.content {
            return content.clone();
        }
        self.parts
            .iter()
            .flatten()
            .filter(|p| p.part_type == "text")
            .filter_map(|p| p.text.as_deref())
            .collect::<Vec<_>>()
            .join("")
    }
}

/// Provider-neutral streaming chat request.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub model: String,
    pub system: Option<String>,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
}
