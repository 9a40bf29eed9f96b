//! HTTP handlers, one module per resource.

pub mod ai_keys;
pub mod auth;
pub mod chat;
pub mod deliverables;
pub mod events;
pub mod goals;
pub mod health;
pub mod info_tags;

use serde::Serialize;
use utoipa::ToSchema;

/// Body of simple acknowledgement responses.
#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Body of every error response.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}
